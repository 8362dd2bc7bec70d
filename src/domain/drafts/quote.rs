use folio_api_types::{EntityKind, Quote, QuotePayload};

use super::{Draft, DraftStep, FieldErrors, filled, optional_text, require, run_step, step_label};
use crate::domain::error::DomainError;

const STEPS: &[DraftStep<QuoteDraft>] = &[DraftStep {
    label: "Quote",
    validate: validate_quote,
}];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteDraft {
    pub text: String,
    pub author: String,
    pub source: String,
    pub category: String,
    pub featured: bool,
}

impl From<&Quote> for QuoteDraft {
    fn from(quote: &Quote) -> Self {
        Self {
            text: quote.text.clone(),
            author: quote.author.clone(),
            source: quote.source.clone().unwrap_or_default(),
            category: quote.category.clone().unwrap_or_default(),
            featured: quote.featured,
        }
    }
}

impl QuoteDraft {
    pub fn to_payload(&self) -> QuotePayload {
        QuotePayload {
            text: self.text.trim().to_string(),
            author: self.author.trim().to_string(),
            source: optional_text(&self.source),
            category: optional_text(&self.category),
            featured: self.featured,
        }
    }
}

fn validate_quote(draft: &QuoteDraft) -> FieldErrors {
    let mut errors = FieldErrors::new();
    require(&mut errors, "text", "Quote text", &draft.text);
    require(&mut errors, "author", "Author", &draft.author);
    errors
}

impl Draft for QuoteDraft {
    fn kind(&self) -> EntityKind {
        EntityKind::Quote
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
            "text" => filled(&self.text),
            "author" => filled(&self.author),
            "source" => filled(&self.source),
            "category" => filled(&self.category),
            "featured" => true,
            _ => false,
        }
    }

    fn set_text(&mut self, field: &str, value: &str) -> Result<(), DomainError> {
        match field {
            "text" => self.text = value.to_string(),
            "author" => self.author = value.to_string(),
            "source" => self.source = value.to_string(),
            "category" => self.category = value.to_string(),
            other => return Err(DomainError::unknown_field(EntityKind::Quote, other)),
        }
        Ok(())
    }

    fn set_list(&mut self, field: &str, _values: Vec<String>) -> Result<(), DomainError> {
        Err(DomainError::unknown_field(EntityKind::Quote, field))
    }

    fn set_flag(&mut self, field: &str, value: bool) -> Result<(), DomainError> {
        match field {
            "featured" => self.featured = value,
            other => return Err(DomainError::unknown_field(EntityKind::Quote, other)),
        }
        Ok(())
    }
}
