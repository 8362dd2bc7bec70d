use folio_api_types::{EntityKind, Experience, ExperiencePayload};
use time::OffsetDateTime;

use super::{
    Draft, DraftStep, FieldErrors, clean_list, filled, nothing_required, optional_text, parse_date,
    require, run_step, step_label,
};
use crate::domain::error::DomainError;

const STEPS: &[DraftStep<ExperienceDraft>] = &[
    DraftStep {
        label: "Role",
        validate: validate_role,
    },
    DraftStep {
        label: "Details",
        validate: nothing_required,
    },
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperienceDraft {
    pub company: String,
    pub position: String,
    pub location: String,
    pub start_date: Option<OffsetDateTime>,
    pub end_date: Option<OffsetDateTime>,
    pub current: bool,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub technologies: Vec<String>,
    pub order: i32,
}

impl From<&Experience> for ExperienceDraft {
    fn from(exp: &Experience) -> Self {
        Self {
            company: exp.company.clone(),
            position: exp.position.clone(),
            location: exp.location.clone().unwrap_or_default(),
            start_date: exp.start_date,
            end_date: exp.end_date,
            current: exp.current,
            description: exp.description.clone(),
            responsibilities: exp.responsibilities.clone(),
            technologies: exp.technologies.clone(),
            order: exp.order,
        }
    }
}

impl ExperienceDraft {
    /// A current role never carries an end date.
    pub fn to_payload(&self) -> ExperiencePayload {
        ExperiencePayload {
            company: self.company.trim().to_string(),
            position: self.position.trim().to_string(),
            location: optional_text(&self.location),
            start_date: self.start_date,
            end_date: if self.current { None } else { self.end_date },
            current: self.current,
            description: self.description.trim().to_string(),
            responsibilities: self.responsibilities.clone(),
            technologies: self.technologies.clone(),
            order: self.order,
        }
    }
}

fn validate_role(draft: &ExperienceDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, "company", "Company", &draft.company);
    require(&mut errors, "position", "Position", &draft.position);
    if draft.start_date.is_none() {
        errors.insert("startDate", "Start date is required".to_string());
    }
    if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
        if !draft.current && end < start {
            errors.insert("endDate", "End date must not precede the start date".to_string());
        }
    }
    errors
}

impl Draft for ExperienceDraft {
    fn kind(&self) -> EntityKind {
        EntityKind::Experience
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
            "company" => filled(&self.company),
            "position" => filled(&self.position),
            "location" => filled(&self.location),
            "startDate" => self.start_date.is_some(),
            "endDate" => self.end_date.is_some(),
            "description" => filled(&self.description),
            "responsibilities" => !self.responsibilities.is_empty(),
            "technologies" => !self.technologies.is_empty(),
            "current" | "order" => true,
            _ => false,
        }
    }

    fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError> {
        match field {
            "company" => self.company = value.to_string(),
            "position" => self.position = value.to_string(),
            "location" => self.location = value.to_string(),
            "description" => self.description = value.to_string(),
            "startDate" => self.start_date = parse_date(field, value)?,
            "endDate" => self.end_date = parse_date(field, value)?,
            "order" => {
                let trimmed = value.trim();
                self.order = if trimmed.is_empty() {
                    0
                } else {
                    trimmed
                        .parse()
                        .map_err(|_| DomainError::invalid_value(field, "expected a whole number"))?
                };
            }
            other => return Err(DomainError::unknown_field(EntityKind::Experience, other)),
        }
        Ok(())
    }

    fn set_list(&mut self, field: &str, values: Vec<String>) -> Result<(), DomainError> {
        match field {
            "responsibilities" => self.responsibilities = clean_list(values),
            "technologies" => self.technologies = clean_list(values),
            other => return Err(DomainError::unknown_field(EntityKind::Experience, other)),
        }
        Ok(())
    }

    fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError> {
        match field {
            "current" => self.current = value,
            other => return Err(DomainError::unknown_field(EntityKind::Experience, other)),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn role_step_requires_start_date() {
        let mut draft = ExperienceDraft::default();
        draft.set_text("company", "Acme").expect("company");
        draft.set_text("position", "Engineer").expect("position");
        assert!(draft.validate_step(1).contains_key("startDate"));

        draft.set_text("startDate", "2023-01").expect("start");
        assert!(draft.validate_step(1).is_empty());
        assert_eq!(draft.start_date, Some(datetime!(2023-01-01 0:00 UTC)));
    }

    #[test]
    fn end_before_start_is_rejected_unless_current() {
        let mut draft = ExperienceDraft {
            company: "Acme".into(),
            position: "Engineer".into(),
            ..Default::default()
        };
        draft.set_text("startDate", "2024-06").expect("start");
        draft.set_text("endDate", "2023-06").expect("end");
        assert!(draft.validate_step(1).contains_key("endDate"));

        draft.set_flag("current", true).expect("current");
        assert!(draft.validate_step(1).is_empty());
        assert_eq!(draft.to_payload().end_date, None);
    }

    #[test]
    fn order_must_be_numeric() {
        let mut draft = ExperienceDraft::default();
        assert!(draft.set_text("order", "two").is_err());
        draft.set_text("order", " 2 ").expect("order");
        assert_eq!(draft.order, 2);
    }
}
