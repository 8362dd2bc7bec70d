//! Editable, partially-filled representations of content entities.
//!
//! Each draft kind owns its step table: an ordered list of labelled steps,
//! each with the validator that gates leaving it forwards. [`EntityDraft`]
//! is the tagged union the editor and dashboard pass around; adding a kind
//! means adding a variant and its module.

mod blog;
mod experience;
mod project;
mod quote;

use std::collections::BTreeMap;
use std::fmt;

use folio_api_types::{EntityKind, MediaItem, UploadedMedia};
use time::{Date, OffsetDateTime, format_description::FormatItem, macros::format_description};

use super::error::DomainError;

pub use blog::BlogDraft;
pub use experience::ExperienceDraft;
pub use project::ProjectDraft;
pub use quote::QuoteDraft;

const DAY_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

/// Validation messages keyed by field name.
pub type FieldErrors = BTreeMap<&'static str, String>;

/// One wizard step of a draft kind.
pub struct DraftStep<D> {
    pub label: &'static str,
    pub validate: fn(&D) -> FieldErrors,
}

/// Behaviour shared by every draft kind.
pub trait Draft: Clone + fmt::Debug + Send + Sync {
    fn kind(&self) -> EntityKind;

    fn step_count(&self) -> usize;

    /// Label of the 1-based `step`, if it exists.
    fn step_label(&self, step: usize) -> Option<&'static str>;

    /// Errors that block leaving the 1-based `step` forwards.
    fn validate_step(&self, step: usize) -> FieldErrors;

    /// Whether `field` currently holds a non-empty value.
    fn is_filled(&self, field: &str) -> bool;

    fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError>;

    fn set_list(&mut self, field: &str, values: Vec<String>) -> Result<(), DomainError>;

    fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError>;
}

pub(crate) fn run_step<D>(steps: &[DraftStep<D>], draft: &D, step: usize) -> FieldErrors {
    step.checked_sub(1)
        .and_then(|index| steps.get(index))
        .map(|entry| (entry.validate)(draft))
        .unwrap_or_default()
}

pub(crate) fn step_label<D>(steps: &[DraftStep<D>], step: usize) -> Option<&'static str> {
    step.checked_sub(1)
        .and_then(|index| steps.get(index))
        .map(|entry| entry.label)
}

pub(crate) fn nothing_required<D>(_: &D) -> FieldErrors {
    FieldErrors::new()
}

pub(crate) fn require(errors: &mut FieldErrors, field: &'static str, label: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field, format!("{label} is required"));
    }
}

pub(crate) fn filled(value: &str) -> bool {
    !value.trim().is_empty()
}

pub(crate) fn optional_text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub(crate) fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect()
}

/// Parse a date field given as `YYYY-MM`, `YYYY-MM-DD`, or RFC 3339.
/// Blank input clears the field.
pub(crate) fn parse_date(field: &str, value: &str) -> Result<Option<OffsetDateTime>, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    if let Ok(parsed) =
        OffsetDateTime::parse(trimmed, &time::format_description::well_known::Rfc3339)
    {
        return Ok(Some(parsed));
    }

    let day = if trimmed.len() == 7 {
        format!("{trimmed}-01")
    } else {
        trimmed.to_string()
    };

    Date::parse(&day, DAY_FORMAT)
        .map(|date| Some(date.midnight().assume_utc()))
        .map_err(|err| DomainError::invalid_value(field, format!("expected YYYY-MM or YYYY-MM-DD ({err})")))
}

/// Tagged union of the draft kinds the editor can open.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityDraft {
    Project(ProjectDraft),
    Blog(BlogDraft),
    Experience(ExperienceDraft),
    Quote(QuoteDraft),
}

macro_rules! each_draft {
    ($value:expr, $draft:ident => $body:expr) => {
        match $value {
            EntityDraft::Project($draft) => $body,
            EntityDraft::Blog($draft) => $body,
            EntityDraft::Experience($draft) => $body,
            EntityDraft::Quote($draft) => $body,
        }
    };
}

impl EntityDraft {
    /// Empty draft for `kind`; `None` for kinds without an editor.
    pub fn empty(kind: EntityKind) -> Option<Self> {
        match kind {
            EntityKind::Project => Some(Self::Project(ProjectDraft::default())),
            EntityKind::Blog => Some(Self::Blog(BlogDraft::default())),
            EntityKind::Experience => Some(Self::Experience(ExperienceDraft::default())),
            EntityKind::Quote => Some(Self::Quote(QuoteDraft::default())),
            EntityKind::Skill | EntityKind::Resume => None,
        }
    }

    /// Slug that will be submitted, for kinds that carry one.
    pub fn slug(&self) -> Option<String> {
        match self {
            EntityDraft::Project(draft) => Some(draft.slug.resolve(&draft.title)),
            EntityDraft::Blog(draft) => Some(draft.slug.resolve(&draft.title)),
            EntityDraft::Experience(_) | EntityDraft::Quote(_) => None,
        }
    }

    pub fn accepts_media(&self) -> bool {
        matches!(self, EntityDraft::Project(_) | EntityDraft::Blog(_))
    }

    /// Attach uploaded media. Projects append to their gallery (the first
    /// image becomes primary when none is); blogs use the first item as cover.
    pub fn attach_media(&mut self, media: &[UploadedMedia]) {
        match self {
            EntityDraft::Project(draft) => {
                let has_primary = draft.images.iter().any(|item| item.is_primary);
                for (index, uploaded) in media.iter().enumerate() {
                    draft
                        .images
                        .push(MediaItem::from_upload(uploaded, !has_primary && index == 0));
                }
            }
            EntityDraft::Blog(draft) => {
                if let Some(first) = media.first() {
                    draft.cover_image = Some(MediaItem::from_upload(first, true));
                }
            }
            EntityDraft::Experience(_) | EntityDraft::Quote(_) => {}
        }
    }

    /// JSON body for create/update requests.
    pub fn to_payload(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            EntityDraft::Project(draft) => serde_json::to_value(draft.to_payload()),
            EntityDraft::Blog(draft) => serde_json::to_value(draft.to_payload()),
            EntityDraft::Experience(draft) => serde_json::to_value(draft.to_payload()),
            EntityDraft::Quote(draft) => serde_json::to_value(draft.to_payload()),
        }
    }
}

impl Draft for EntityDraft {
    fn kind(&self) -> EntityKind {
        each_draft!(self, draft => draft.kind())
    }

    fn step_count(&self) -> usize {
        each_draft!(self, draft => draft.step_count())
    }

    fn step_label(&self, step: usize) -> Option<&'static str> {
        each_draft!(self, draft => draft.step_label(step))
    }

    fn validate_step(&self, step: usize) -> FieldErrors {
        each_draft!(self, draft => draft.validate_step(step))
    }

    fn is_filled(&self, field: &str) -> bool {
        each_draft!(self, draft => draft.is_filled(field))
    }

    fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError> {
        each_draft!(self, draft => draft.set_text(field, value))
    }

    fn set_list(&mut self, field: &str, values: Vec<String>) -> Result<(), DomainError> {
        each_draft!(self, draft => draft.set_list(field, values))
    }

    fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError> {
        each_draft!(self, draft => draft.set_flag(field, value))
    }
}

impl From<ProjectDraft> for EntityDraft {
    fn from(draft: ProjectDraft) -> Self {
        Self::Project(draft)
    }
}

impl From<BlogDraft> for EntityDraft {
    fn from(draft: BlogDraft) -> Self {
        Self::Blog(draft)
    }
}

impl From<ExperienceDraft> for EntityDraft {
    fn from(draft: ExperienceDraft) -> Self {
        Self::Experience(draft)
    }
}

impl From<QuoteDraft> for EntityDraft {
    fn from(draft: QuoteDraft) -> Self {
        Self::Quote(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn parse_date_accepts_month_day_and_rfc3339() {
        assert_eq!(
            parse_date("startDate", "2023-06").expect("month"),
            Some(datetime!(2023-06-01 0:00 UTC))
        );
        assert_eq!(
            parse_date("startDate", "2023-06-15").expect("day"),
            Some(datetime!(2023-06-15 0:00 UTC))
        );
        assert_eq!(
            parse_date("startDate", "2023-06-15T08:30:00Z").expect("rfc3339"),
            Some(datetime!(2023-06-15 8:30 UTC))
        );
        assert_eq!(parse_date("startDate", "  ").expect("blank"), None);
        assert!(parse_date("startDate", "June 2023").is_err());
    }

    #[test]
    fn empty_draft_exists_only_for_edited_kinds() {
        assert!(EntityDraft::empty(EntityKind::Project).is_some());
        assert!(EntityDraft::empty(EntityKind::Quote).is_some());
        assert!(EntityDraft::empty(EntityKind::Skill).is_none());
    }

    #[test]
    fn attach_media_marks_first_project_image_primary() {
        let mut draft = EntityDraft::Project(ProjectDraft::default());
        let media = [
            UploadedMedia {
                url: "https://cdn.test/a.png".into(),
                media_id: "a".into(),
                width: Some(10),
                height: Some(10),
                format: Some("png".into()),
                byte_size: 100,
            },
            UploadedMedia {
                url: "https://cdn.test/b.png".into(),
                media_id: "b".into(),
                width: None,
                height: None,
                format: None,
                byte_size: 200,
            },
        ];
        draft.attach_media(&media);

        let EntityDraft::Project(project) = draft else {
            panic!("project draft expected");
        };
        assert_eq!(project.images.len(), 2);
        assert!(project.images[0].is_primary);
        assert!(!project.images[1].is_primary);
    }

    #[test]
    fn enum_delegates_to_variant_steps() {
        let draft = EntityDraft::Quote(QuoteDraft::default());
        assert_eq!(draft.step_count(), 1);
        assert!(draft.validate_step(1).contains_key("text"));
        assert_eq!(draft.step_label(2), None);
    }
}
