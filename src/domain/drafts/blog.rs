use folio_api_types::{BlogPayload, BlogPost, EntityKind, MediaItem};
use time::OffsetDateTime;

use super::{
    Draft, DraftStep, FieldErrors, clean_list, filled, nothing_required, optional_text, parse_date,
    require, run_step, step_label,
};
use crate::domain::error::DomainError;
use crate::domain::slug::{DerivedSlug, FALLBACK_POST_SLUG};

const STEPS: &[DraftStep<BlogDraft>] = &[
    DraftStep {
        label: "Content",
        validate: validate_content,
    },
    DraftStep {
        label: "Cover image",
        validate: nothing_required,
    },
    DraftStep {
        label: "SEO & publishing",
        validate: nothing_required,
    },
];

#[derive(Debug, Clone, PartialEq)]
pub struct BlogDraft {
    pub title: String,
    pub slug: DerivedSlug,
    pub excerpt: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub keywords: Vec<String>,
    pub cover_image: Option<MediaItem>,
    pub published: bool,
    pub published_at: Option<OffsetDateTime>,
}

impl Default for BlogDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            slug: DerivedSlug::following(FALLBACK_POST_SLUG),
            excerpt: String::new(),
            content: String::new(),
            category: String::new(),
            tags: Vec::new(),
            keywords: Vec::new(),
            cover_image: None,
            published: false,
            published_at: None,
        }
    }
}

impl From<&BlogPost> for BlogDraft {
    fn from(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            slug: DerivedSlug::pinned(post.slug.clone(), FALLBACK_POST_SLUG),
            excerpt: post.excerpt.clone(),
            content: post.content.clone(),
            category: post.category.clone().unwrap_or_default(),
            tags: post.tags.clone(),
            keywords: post.keywords.clone(),
            cover_image: post.cover_image.clone(),
            published: post.published,
            published_at: post.published_at,
        }
    }
}

impl BlogDraft {
    pub fn set_title(&mut self, title: &str) {
        self.title = title.to_string();
        self.slug.title_changed(title);
    }

    /// Publishing without an explicit date stamps the current time.
    pub fn to_payload(&self) -> BlogPayload {
        let published_at = match (self.published, self.published_at) {
            (true, None) => Some(OffsetDateTime::now_utc()),
            (_, at) => at,
        };

        BlogPayload {
            title: self.title.trim().to_string(),
            slug: self.slug.resolve(&self.title),
            excerpt: self.excerpt.trim().to_string(),
            content: self.content.clone(),
            category: optional_text(&self.category),
            tags: self.tags.clone(),
            keywords: self.keywords.clone(),
            cover_image: self.cover_image.clone(),
            published: self.published,
            published_at,
        }
    }
}

fn validate_content(draft: &BlogDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, "title", "Title", &draft.title);
    require(&mut errors, "excerpt", "Excerpt", &draft.excerpt);
    require(&mut errors, "content", "Content", &draft.content);
    errors
}

impl Draft for BlogDraft {
    fn kind(&self) -> EntityKind {
        EntityKind::Blog
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
            "excerpt" => filled(&self.excerpt),
            "content" => filled(&self.content),
            "category" => filled(&self.category),
            "tags" => !self.tags.is_empty(),
            "keywords" => !self.keywords.is_empty(),
            "coverImage" => self.cover_image.is_some(),
            "publishedAt" => self.published_at.is_some(),
            "published" => true,
            _ => false,
        }
    }

    fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError> {
        match field {
            "title" => self.set_title(value),
            "slug" => self.slug.set_manual(value),
            "excerpt" => self.excerpt = value.to_string(),
            "content" => self.content = value.to_string(),
            "category" => self.category = value.to_string(),
            "publishedAt" => self.published_at = parse_date(field, value)?,
            other => return Err(DomainError::unknown_field(EntityKind::Blog, other)),
        }
        Ok(())
    }

    fn set_list(&mut self, field: &str, values: Vec<String>) -> Result<(), DomainError> {
        match field {
            "tags" => self.tags = clean_list(values),
            "keywords" => self.keywords = clean_list(values),
            other => return Err(DomainError::unknown_field(EntityKind::Blog, other)),
        }
        Ok(())
    }

    fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError> {
        match field {
            "published" => self.published = value,
            other => return Err(DomainError::unknown_field(EntityKind::Blog, other)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_title_falls_back_to_post_slug() {
        let draft = BlogDraft::default();
        assert_eq!(draft.to_payload().slug, FALLBACK_POST_SLUG);
    }

    #[test]
    fn publishing_without_date_stamps_now() {
        let mut draft = BlogDraft::default();
        draft.set_flag("published", true).expect("flag");
        let payload = draft.to_payload();
        assert!(payload.published);
        assert!(payload.published_at.is_some());
    }

    #[test]
    fn content_step_requires_three_fields() {
        let mut draft = BlogDraft::default();
        draft.set_text("title", "Hello").expect("title");
        let errors = draft.validate_step(1);
        assert!(!errors.contains_key("title"));
        assert!(errors.contains_key("excerpt"));
        assert!(errors.contains_key("content"));
        assert!(draft.validate_step(3).is_empty());
    }
}
