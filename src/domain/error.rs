use folio_api_types::EntityKind;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("{kind} drafts have no field `{field}`")]
    UnknownField { kind: EntityKind, field: String },
    #[error("invalid value for `{field}`: {message}")]
    InvalidValue { field: String, message: String },
}

impl DomainError {
    pub fn unknown_field(kind: EntityKind, field: impl Into<String>) -> Self {
        Self::UnknownField {
            kind,
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}
