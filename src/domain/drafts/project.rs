use folio_api_types::{EntityKind, MediaItem, Project, ProjectPayload};

use super::{
    Draft, DraftStep, FieldErrors, clean_list, filled, nothing_required, optional_text, require,
    run_step, step_label,
};
use crate::domain::error::DomainError;
use crate::domain::slug::{DerivedSlug, FALLBACK_SLUG};

const STEPS: &[DraftStep<ProjectDraft>] = &[
    DraftStep {
        label: "Basic info",
        validate: validate_basic_info,
    },
    DraftStep {
        label: "Technologies & features",
        validate: nothing_required,
    },
    DraftStep {
        label: "Media",
        validate: nothing_required,
    },
    DraftStep {
        label: "Settings",
        validate: nothing_required,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDraft {
    pub title: String,
    pub slug: DerivedSlug,
    pub short_description: String,
    pub long_description: String,
    pub category: String,
    pub project_type: String,
    pub technologies: Vec<String>,
    pub features: Vec<String>,
    pub images: Vec<MediaItem>,
    pub github_url: String,
    pub live_url: String,
    pub featured: bool,
    pub status: String,
}

impl Default for ProjectDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: DerivedSlug::following(FALLBACK_SLUG),
            short_description: String::new(),
            long_description: String::new(),
            category: String::new(),
            project_type: String::new(),
            technologies: Vec::new(),
            features: Vec::new(),
            images: Vec::new(),
            github_url: String::new(),
            live_url: String::new(),
            featured: false,
            status: String::new(),
        }
    }
}

impl From<&Project> for ProjectDraft {
    fn from(project: &Project) -> Self {
        Self {
            title: project.title.clone(),
            slug: DerivedSlug::pinned(project.slug.clone(), FALLBACK_SLUG),
            short_description: project.short_description.clone(),
            long_description: project.long_description.clone(),
            category: project.category.clone(),
            project_type: project.project_type.clone(),
            technologies: project.technologies.clone(),
            features: project.features.clone(),
            images: project.images.clone(),
            github_url: project.github_url.clone().unwrap_or_default(),
            live_url: project.live_url.clone().unwrap_or_default(),
            featured: project.featured,
            status: project.status.clone().unwrap_or_default(),
        }
    }
}

impl ProjectDraft {
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.slug.title_changed(title);
    }

    pub fn to_payload(&self) -> ProjectPayload {
        ProjectPayload {
            title: self.title.trim().to_string(),
            slug: self.slug.resolve(&self.title),
            short_description: self.short_description.trim().to_string(),
            long_description: self.long_description.trim().to_string(),
            category: self.category.trim().to_string(),
            project_type: self.project_type.trim().to_string(),
            technologies: self.technologies.clone(),
            features: self.features.clone(),
            images: self.images.clone(),
            github_url: optional_text(&self.github_url),
            live_url: optional_text(&self.live_url),
            featured: self.featured,
            status: optional_text(&self.status),
        }
    }
}

fn validate_basic_info(draft: &ProjectDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, "title", "Title", &draft.title);
    require(
        &mut errors,
        "shortDescription",
        "Short description",
        &draft.short_description,
    );
    require(
        &mut errors,
        "longDescription",
        "Long description",
        &draft.long_description,
    );
    require(&mut errors, "category", "Category", &draft.category);
    require(&mut errors, "projectType", "Project type", &draft.project_type);
    errors
}

impl Draft for ProjectDraft {
    fn kind(&self) -> EntityKind {
        EntityKind::Project
    }

    fn step_count(&self) -> usize {
        STEPS.len()
    }

    fn step_label(&self, step: usize) -> Option<&'static str> {
        step_label(STEPS, step)
    }

    fn validate_step(&self, step: usize) -> FieldErrors {
        run_step(STEPS, self, step)
    }

    fn is_filled(&self, field: &str) -> bool {
        match field {
            "title" => filled(&self.title),
            "slug" => filled(self.slug.as_str()),
            "shortDescription" => filled(&self.short_description),
            "longDescription" => filled(&self.long_description),
            "category" => filled(&self.category),
            "projectType" => filled(&self.project_type),
            "githubUrl" => filled(&self.github_url),
            "liveUrl" => filled(&self.live_url),
            "status" => filled(&self.status),
            "technologies" => !self.technologies.is_empty(),
            "features" => !self.features.is_empty(),
            "images" => !self.images.is_empty(),
            "featured" => true,
            _ => false,
        }
    }

    fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError> {
        match field {
            "title" => self.set_title(value),
            "slug" => self.slug.set_manual(value),
            "shortDescription" => self.short_description = value.to_string(),
            "longDescription" => self.long_description = value.to_string(),
            "category" => self.category = value.to_string(),
            "projectType" => self.project_type = value.to_string(),
            "githubUrl" => self.github_url = value.to_string(),
            "liveUrl" => self.live_url = value.to_string(),
            "status" => self.status = value.to_string(),
            other => return Err(DomainError::unknown_field(EntityKind::Project, other)),
        }
        Ok(())
    }

    fn set_list(&mut self, field: &str, values: Vec<String>) -> Result<(), DomainError> {
        match field {
            "technologies" => self.technologies = clean_list(values),
            "features" => self.features = clean_list(values),
            other => return Err(DomainError::unknown_field(EntityKind::Project, other)),
        }
        Ok(())
    }

    fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError> {
        match field {
            "featured" => self.featured = value,
            other => return Err(DomainError::unknown_field(EntityKind::Project, other)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_basic_info_has_required_fields() {
        let draft = ProjectDraft::default();
        let errors = draft.validate_step(1);
        assert_eq!(
            errors.keys().copied().collect::<Vec<_>>(),
            vec![
                "category",
                "longDescription",
                "projectType",
                "shortDescription",
                "title"
            ]
        );
        for step in 2..=4 {
            assert!(draft.validate_step(step).is_empty(), "step {step}");
        }
    }

    #[test]
    fn whitespace_only_values_do_not_count() {
        let mut draft = ProjectDraft::default();
        draft.set_text("title", "   ").expect("title");
        assert!(draft.validate_step(1).contains_key("title"));
        assert!(!draft.is_filled("title"));
    }

    #[test]
    fn payload_resolves_slug_and_optional_links() {
        let mut draft = ProjectDraft::default();
        draft.set_text("title", "Folio Site").expect("title");
        draft.set_text("githubUrl", "  ").expect("github");
        draft
            .set_list("technologies", vec!["rust".into(), " ".into(), " tokio ".into()])
            .expect("technologies");

        let payload = draft.to_payload();
        assert_eq!(payload.slug, "folio-site");
        assert_eq!(payload.github_url, None);
        assert_eq!(payload.technologies, vec!["rust", "tokio"]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let mut draft = ProjectDraft::default();
        let err = draft.set_text("author", "x").expect_err("unknown field");
        assert_eq!(err, DomainError::unknown_field(EntityKind::Project, "author"));
    }
}
