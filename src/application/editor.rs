//! Editor session: a wizard plus what the dashboard needs to persist it.

use folio_api_types::EntityKind;

use super::error::AdminError;
use super::wizard::Wizard;
use crate::domain::drafts::{Draft, EntityDraft};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorMode {
    Create,
    Edit { id: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorStatus {
    Open,
    Submitting,
    Closed,
}

/// An open create or edit form.
///
/// While a submit is in flight the editor is busy and refuses another one.
/// A failed submit reopens the editor with the draft intact and the error in
/// [`EntityEditor::form_error`].
#[derive(Debug, Clone)]
pub struct EntityEditor {
    wizard: Wizard<EntityDraft>,
    mode: EditorMode,
    status: EditorStatus,
    form_error: Option<AdminError>,
}

impl EntityEditor {
    pub fn create(draft: EntityDraft) -> Self {
        Self::with_mode(draft, EditorMode::Create)
    }

    pub fn edit(draft: EntityDraft, id: impl Into<String>) -> Self {
        Self::with_mode(draft, EditorMode::Edit { id: id.into() })
    }

    fn with_mode(draft: EntityDraft, mode: EditorMode) -> Self {
        Self {
            wizard: Wizard::new(draft),
            mode,
            status: EditorStatus::Open,
            form_error: None,
        }
    }

    pub fn kind(&self) -> EntityKind {
        self.wizard.draft().kind()
    }

    pub fn mode(&self) -> &EditorMode {
        &self.mode
    }

    /// Identifier of the entity being edited, if any.
    pub fn editing_id(&self) -> Option<&str> {
        match &self.mode {
            EditorMode::Create => None,
            EditorMode::Edit { id } => Some(id),
        }
    }

    pub fn status(&self) -> EditorStatus {
        self.status
    }

    pub fn is_busy(&self) -> bool {
        self.status == EditorStatus::Submitting
    }

    pub fn is_open(&self) -> bool {
        self.status != EditorStatus::Closed
    }

    pub fn form_error(&self) -> Option<&AdminError> {
        self.form_error.as_ref()
    }

    pub fn wizard(&self) -> &Wizard<EntityDraft> {
        &self.wizard
    }

    pub fn wizard_mut(&mut self) -> &mut Wizard<EntityDraft> {
        &mut self.wizard
    }

    /// Validate and freeze the draft for persisting.
    pub(crate) fn begin_submit(&mut self) -> Result<EntityDraft, AdminError> {
        match self.status {
            EditorStatus::Submitting => return Err(AdminError::Busy),
            EditorStatus::Closed => return Err(AdminError::NotEditable(self.kind())),
            EditorStatus::Open => {}
        }
        self.form_error = None;
        let draft = self.wizard.submit_all().map_err(|err| {
            let errors = self.wizard.step_errors().clone();
            if errors.is_empty() {
                AdminError::from(err)
            } else {
                AdminError::Validation(errors)
            }
        })?;
        self.status = EditorStatus::Submitting;
        Ok(draft)
    }

    /// Keep the editor open with the draft intact and record `err`.
    pub(crate) fn fail(&mut self, err: AdminError) -> AdminError {
        self.status = EditorStatus::Open;
        self.form_error = Some(err.clone());
        err
    }

    pub(crate) fn complete(&mut self) {
        self.status = EditorStatus::Closed;
        self.form_error = None;
    }

    /// Discard the editor without submitting.
    pub fn close(&mut self) {
        self.status = EditorStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drafts::QuoteDraft;

    fn quote_editor() -> EntityEditor {
        EntityEditor::create(EntityDraft::Quote(QuoteDraft::default()))
    }

    #[test]
    fn invalid_draft_stays_open_with_field_errors() {
        let mut editor = quote_editor();
        let err = editor.begin_submit().expect_err("blank quote");
        assert!(matches!(err, AdminError::Validation(ref fields) if fields.contains_key("text")));
        assert_eq!(editor.status(), EditorStatus::Open);
    }

    #[test]
    fn busy_editor_refuses_second_submit() {
        let mut editor = quote_editor();
        editor.wizard_mut().set_text("text", "Less is more").expect("text");
        editor.wizard_mut().set_text("author", "Mies").expect("author");

        editor.begin_submit().expect("first submit");
        assert!(editor.is_busy());
        assert_eq!(editor.begin_submit().expect_err("busy"), AdminError::Busy);
    }

    #[test]
    fn failure_keeps_draft_and_records_error() {
        let mut editor = quote_editor();
        editor.wizard_mut().set_text("text", "Less is more").expect("text");
        editor.wizard_mut().set_text("author", "Mies").expect("author");
        editor.begin_submit().expect("submit");

        editor.fail(AdminError::Busy);
        assert_eq!(editor.status(), EditorStatus::Open);
        assert_eq!(editor.form_error(), Some(&AdminError::Busy));
        assert!(editor.wizard().draft().is_filled("text"));

        editor.begin_submit().expect("retry");
        assert!(editor.form_error().is_none());
        editor.complete();
        assert!(!editor.is_open());
    }

    #[test]
    fn edit_mode_exposes_target_id() {
        let editor = EntityEditor::edit(EntityDraft::Quote(QuoteDraft::default()), "q1");
        assert_eq!(editor.editing_id(), Some("q1"));
        assert_eq!(editor.kind(), EntityKind::Quote);
    }
}
