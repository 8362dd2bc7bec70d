//! Multi-step editing state machine.
//!
//! A [`Wizard`] owns a draft and the current step. Moving forwards is gated by
//! the current step's validator; moving backwards never is.

use thiserror::Error;
use tracing::debug;

use crate::domain::{
    drafts::{Draft, FieldErrors},
    error::DomainError,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WizardError {
    #[error("step {step} has fields that need attention")]
    Blocked { step: usize },
    #[error("already at the first step")]
    AtFirstStep,
    #[error("already at the last step")]
    AtLastStep,
    #[error("step {step} is out of range (1..={total})")]
    OutOfRange { step: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wizard<D: Draft> {
    current_step: usize,
    draft: D,
    step_errors: FieldErrors,
}

impl<D: Draft> Wizard<D> {
    /// Start at step 1 with an empty or pre-filled draft.
    pub fn new(draft: D) -> Self {
        Self {
            current_step: 1,
            draft,
            step_errors: FieldErrors::new(),
        }
    }

    pub fn current_step(&self) -> usize {
        self.current_step
    }

    pub fn total_steps(&self) -> usize {
        self.draft.step_count()
    }

    pub fn current_label(&self) -> Option<&'static str> {
        self.draft.step_label(self.current_step)
    }

    pub fn is_last_step(&self) -> bool {
        self.current_step >= self.total_steps()
    }

    pub fn draft(&self) -> &D {
        &self.draft
    }

    pub fn step_errors(&self) -> &FieldErrors {
        &self.step_errors
    }

    pub fn into_draft(self) -> D {
        self.draft
    }

    /// Run the current step's validator, recording its errors.
    fn gate(&mut self) -> Result<(), WizardError> {
        let errors = self.draft.validate_step(self.current_step);
        if errors.is_empty() {
            self.step_errors.clear();
            Ok(())
        } else {
            debug!(
                kind = %self.draft.kind(),
                step = self.current_step,
                fields = errors.len(),
                "wizard step blocked"
            );
            self.step_errors = errors;
            Err(WizardError::Blocked {
                step: self.current_step,
            })
        }
    }

    pub fn go_next(&mut self) -> Result<usize, WizardError> {
        self.gate()?;
        if self.is_last_step() {
            return Err(WizardError::AtLastStep);
        }
        self.current_step += 1;
        Ok(self.current_step)
    }

    pub fn go_previous(&mut self) -> Result<usize, WizardError> {
        if self.current_step <= 1 {
            return Err(WizardError::AtFirstStep);
        }
        self.current_step -= 1;
        self.step_errors.clear();
        Ok(self.current_step)
    }

    /// Jump to the 1-based `step`. Backward jumps skip validation.
    pub fn jump_to_step(&mut self, step: usize) -> Result<usize, WizardError> {
        let total = self.total_steps();
        if step == 0 || step > total {
            return Err(WizardError::OutOfRange { step, total });
        }
        if step > self.current_step {
            self.gate()?;
        } else {
            self.step_errors.clear();
        }
        self.current_step = step;
        Ok(step)
    }

    pub fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError> {
        self.draft.set_text(field, value)?;
        self.clear_if_filled(field);
        Ok(())
    }

    pub fn set_list(&mut self, field: &str, values: Vec<String>) -> Result<(), DomainError> {
        self.draft.set_list(field, values)?;
        self.clear_if_filled(field);
        Ok(())
    }

    pub fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError> {
        self.draft.set_flag(field, value)?;
        self.clear_if_filled(field);
        Ok(())
    }

    /// Direct access for edits that have no field name (e.g. slug overrides).
    pub fn draft_mut(&mut self) -> &mut D {
        &mut self.draft
    }

    fn clear_if_filled(&mut self, field: &str) {
        if self.draft.is_filled(field) {
            self.step_errors.remove(field);
        }
    }

    /// Re-validate the current step and hand back the finished draft.
    pub fn submit(&mut self) -> Result<D, WizardError> {
        self.gate()?;
        Ok(self.draft.clone())
    }

    /// Re-validate every step up to the current one, jumping back to the
    /// first that fails. Used before persisting a draft opened mid-way.
    pub fn submit_all(&mut self) -> Result<D, WizardError> {
        let reached = self.current_step;
        for step in 1..=reached {
            self.current_step = step;
            self.gate()?;
        }
        self.current_step = reached;
        Ok(self.draft.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::drafts::{EntityDraft, ProjectDraft, QuoteDraft};

    fn project_wizard() -> Wizard<ProjectDraft> {
        Wizard::new(ProjectDraft::default())
    }

    fn fill_basic_info(wizard: &mut Wizard<ProjectDraft>) {
        wizard.set_text("title", "X").expect("title");
        wizard.set_text("shortDescription", "Y").expect("short");
        wizard.set_text("longDescription", "Z").expect("long");
        wizard.set_text("category", "A").expect("category");
        wizard.set_text("projectType", "B").expect("type");
    }

    #[test]
    fn empty_title_blocks_first_step() {
        let mut wizard = project_wizard();
        assert_eq!(wizard.go_next(), Err(WizardError::Blocked { step: 1 }));
        assert_eq!(wizard.current_step(), 1);
        assert!(wizard.step_errors().contains_key("title"));
    }

    #[test]
    fn filled_basic_info_advances() {
        let mut wizard = project_wizard();
        fill_basic_info(&mut wizard);
        assert_eq!(wizard.go_next(), Ok(2));
        assert!(wizard.step_errors().is_empty());
    }

    #[test]
    fn later_steps_never_block() {
        let mut wizard = project_wizard();
        fill_basic_info(&mut wizard);
        wizard.go_next().expect("step 2");
        wizard.go_next().expect("step 3");
        wizard.go_next().expect("step 4");
        assert_eq!(wizard.go_next(), Err(WizardError::AtLastStep));
        assert_eq!(wizard.current_step(), 4);
    }

    #[test]
    fn jump_back_from_step_three_skips_validation() {
        let mut wizard = project_wizard();
        fill_basic_info(&mut wizard);
        wizard.jump_to_step(3).expect("forward jump");
        wizard.set_text("title", "").expect("clear title");
        assert_eq!(wizard.jump_to_step(1), Ok(1));
        assert_eq!(wizard.current_step(), 1);
    }

    #[test]
    fn forward_jump_is_gated_by_current_step() {
        let mut wizard = project_wizard();
        assert_eq!(
            wizard.jump_to_step(3),
            Err(WizardError::Blocked { step: 1 })
        );
        assert_eq!(
            wizard.jump_to_step(9),
            Err(WizardError::OutOfRange { step: 9, total: 4 })
        );
    }

    #[test]
    fn previous_is_refused_only_at_first_step() {
        let mut wizard = project_wizard();
        assert_eq!(wizard.go_previous(), Err(WizardError::AtFirstStep));
        fill_basic_info(&mut wizard);
        wizard.go_next().expect("step 2");
        assert_eq!(wizard.go_previous(), Ok(1));
    }

    #[test]
    fn editing_a_field_clears_its_error() {
        let mut wizard = project_wizard();
        let _ = wizard.go_next();
        assert!(wizard.step_errors().contains_key("title"));
        assert!(wizard.step_errors().contains_key("category"));

        wizard.set_text("title", "   ").expect("blank title");
        assert!(wizard.step_errors().contains_key("title"));

        wizard.set_text("title", "Folio").expect("title");
        assert!(!wizard.step_errors().contains_key("title"));
        assert!(wizard.step_errors().contains_key("category"));
    }

    #[test]
    fn submit_revalidates_current_step() {
        let mut wizard = Wizard::new(EntityDraft::Quote(QuoteDraft::default()));
        assert_eq!(wizard.submit(), Err(WizardError::Blocked { step: 1 }));

        wizard.set_text("text", "Simplicity is prerequisite").expect("text");
        wizard.set_text("author", "Dijkstra").expect("author");
        let draft = wizard.submit().expect("submit");
        assert!(matches!(draft, EntityDraft::Quote(_)));
    }

    #[test]
    fn submit_all_returns_to_first_failing_step() {
        let mut wizard = project_wizard();
        fill_basic_info(&mut wizard);
        wizard.jump_to_step(4).expect("last step");
        wizard.set_text("category", "").expect("clear category");

        assert_eq!(wizard.submit_all(), Err(WizardError::Blocked { step: 1 }));
        assert_eq!(wizard.current_step(), 1);
        assert!(wizard.step_errors().contains_key("category"));
    }
}
