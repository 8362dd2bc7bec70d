//! Content API seam and response decoding.

use async_trait::async_trait;
use folio_api_types::EntityKind;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::error::ApiError;

/// Remote content store, one collection per [`EntityKind`].
///
/// Bodies are raw JSON; the server wraps payloads inconsistently, so
/// decoding into entities happens on this side with [`decode_list`] and
/// [`decode_entity`].
#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn list(&self, kind: EntityKind) -> Result<Value, ApiError>;

    async fn analytics(&self) -> Result<Value, ApiError>;

    /// `None` when the response carried no body.
    async fn create(&self, kind: EntityKind, payload: &Value) -> Result<Option<Value>, ApiError>;

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        payload: &Value,
    ) -> Result<Option<Value>, ApiError>;

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError>;
}

/// Decode a list body: a bare array, `{"data": [...]}`, or an object whose
/// only array field holds the items.
pub fn decode_list<T: DeserializeOwned>(body: Value) -> Result<Vec<T>, ApiError> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => items,
            _ => {
                let mut arrays = map.into_iter().filter_map(|(_, value)| match value {
                    Value::Array(items) => Some(items),
                    _ => None,
                });
                match (arrays.next(), arrays.next()) {
                    (Some(items), None) => items,
                    _ => return Err(ApiError::decode("list response has no item array")),
                }
            }
        },
        Value::Null => Vec::new(),
        other => {
            return Err(ApiError::decode(format!(
                "expected a list response, got {}",
                json_kind(&other)
            )));
        }
    };

    serde_json::from_value(Value::Array(items)).map_err(|err| ApiError::decode(err.to_string()))
}

/// Decode an entity body, either bare or under `data`. Anything that does
/// not decode is treated as ambiguous and yields `None`.
pub fn decode_entity<T: DeserializeOwned>(body: Option<Value>) -> Option<T> {
    let body = body?;
    if let Value::Object(map) = &body {
        if let Some(inner @ Value::Object(_)) = map.get("data") {
            if let Ok(entity) = serde_json::from_value(inner.clone()) {
                return Some(entity);
            }
        }
    }
    serde_json::from_value(body).ok()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
