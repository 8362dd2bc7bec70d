use folio_api_types::EntityKind;
use serde_json::Value;
use thiserror::Error;

use crate::application::wizard::WizardError;
use crate::domain::{
    drafts::FieldErrors, error::DomainError, slug::SlugConflict, uploads::UploadValidationError,
};

const MAX_DETAIL_LEN: usize = 240;

/// Failure of a single content API call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("rate limited by the content API")]
    RateLimited,
    #[error("credentials were rejected")]
    Unauthorized,
    #[error("conflict: {message}")]
    Conflict { message: String },
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("resource not found")]
    NotFound,
    #[error("request rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("network unreachable: {0}")]
    Network(String),
    #[error("request timed out")]
    Timeout,
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Classify a non-success HTTP status and its body.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = extract_message(body);
        match status {
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound,
            409 => ApiError::Conflict { message },
            413 => ApiError::PayloadTooLarge,
            429 => ApiError::RateLimited,
            400..=499 => ApiError::Rejected { status, message },
            _ => ApiError::Server { status, message },
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ApiError::RateLimited)
    }

    pub fn presentation_message(&self) -> String {
        match self {
            ApiError::RateLimited => "Too many requests, try again in a moment".to_string(),
            ApiError::Unauthorized => "Your session has expired; sign in again".to_string(),
            ApiError::Conflict { .. } => {
                "An entry with this slug already exists; use a different title or slug".to_string()
            }
            ApiError::PayloadTooLarge => {
                "The request is too large; try smaller or fewer images".to_string()
            }
            ApiError::NotFound => "The item no longer exists; refresh and try again".to_string(),
            ApiError::Rejected { message, .. } => {
                format!("The server rejected the request: {message}")
            }
            ApiError::Server { .. } => {
                "The server hit an unexpected error; try again later".to_string()
            }
            ApiError::Network(_) => "Cannot reach the server; check your connection".to_string(),
            ApiError::Timeout => "The server took too long to respond; try again".to_string(),
            ApiError::Decode(_) => "The server sent a response that could not be read".to_string(),
        }
    }
}

fn extract_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        let candidate = value
            .get("message")
            .or_else(|| value.get("error"))
            .and_then(|field| match field {
                Value::String(text) => Some(text.clone()),
                Value::Object(inner) => inner
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                _ => None,
            });
        if let Some(message) = candidate {
            return message;
        }
    }

    let mut detail: String = trimmed.chars().take(MAX_DETAIL_LEN).collect();
    if detail.is_empty() {
        detail.push_str("no details");
    }
    detail
}

/// Failure of an orchestrated admin action.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AdminError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("{} field(s) need attention", .0.len())]
    Validation(FieldErrors),
    #[error(transparent)]
    Slug(#[from] SlugConflict),
    #[error(transparent)]
    Draft(#[from] DomainError),
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("invalid media: {}", join_messages(.0))]
    InvalidMedia(Vec<UploadValidationError>),
    #[error("{kind} `{id}` is not loaded")]
    NotLoaded { kind: EntityKind, id: String },
    #[error("{0} entries have no editor")]
    NotEditable(EntityKind),
    #[error("editor is busy with a previous submit")]
    Busy,
    #[error("failed to encode payload: {0}")]
    Encode(String),
}

fn join_messages(errors: &[UploadValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl AdminError {
    pub fn not_loaded(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::NotLoaded {
            kind,
            id: id.into(),
        }
    }

    pub fn presentation_message(&self) -> String {
        match self {
            AdminError::Api(err) => err.presentation_message(),
            AdminError::Validation(_) => "Please fill in the highlighted fields".to_string(),
            AdminError::Slug(conflict) => conflict.to_string(),
            AdminError::Draft(err) => err.to_string(),
            AdminError::Wizard(err) => err.to_string(),
            AdminError::InvalidMedia(errors) => join_messages(errors),
            AdminError::NotLoaded { .. } => {
                "That item is no longer in the list; refresh and try again".to_string()
            }
            AdminError::NotEditable(kind) => format!("{kind} entries cannot be edited here"),
            AdminError::Busy => "Still saving, please wait".to_string(),
            AdminError::Encode(_) => "The form could not be prepared for saving".to_string(),
        }
    }
}
