//! reqwest implementation of the content API.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use folio_api_types::EntityKind;
use metrics::{counter, histogram};
use reqwest::{Client, Method, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use super::build_client;
use crate::application::api::ContentApi;
use crate::application::error::ApiError;
use crate::infra::error::InfraError;
use crate::infra::session::Session;

const ANALYTICS_PATH: &str = "analytics";

#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base: Url,
    session: Arc<Session>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<Session>) -> Result<Self, InfraError> {
        let mut base = Url::parse(base_url).map_err(|err| {
            InfraError::configuration(format!("invalid content API URL `{base_url}`: {err}"))
        })?;
        if base.cannot_be_a_base() {
            return Err(InfraError::configuration(format!(
                "content API URL `{base_url}` cannot carry a path"
            )));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        Ok(Self {
            client: build_client(timeout)?,
            base,
            session,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::Network(format!("`{}` cannot carry a path", self.base)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Bytes, ApiError> {
        let started = Instant::now();
        debug!(%method, %url, "content API request");

        let mut request = self.client.request(method.clone(), url);
        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            // The status line is enough to classify a failure.
            Err(err) if !status.is_success() => {
                debug!(error = %err, %status, "error body unreadable");
                Bytes::new()
            }
            Err(err) => return Err(classify_body_read(err)),
        };

        histogram!("folio_api_request_ms").record(started.elapsed().as_secs_f64() * 1000.0);
        counter!(
            "folio_api_requests_total",
            "method" => method.to_string(),
            "status" => status_class(status)
        )
        .increment(1);

        if status == StatusCode::UNAUTHORIZED {
            warn!("content API rejected the credentials; clearing session");
            if let Err(err) = self.session.clear().await {
                warn!(error = %err, "failed to clear session");
            }
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let text = String::from_utf8_lossy(&bytes);
            return Err(ApiError::from_status(status.as_u16(), &text));
        }

        Ok(bytes)
    }

    async fn read(&self, url: Url) -> Result<Value, ApiError> {
        let bytes = self.send(Method::GET, url, None).await?;
        Ok(parse_body(&bytes)?.unwrap_or(Value::Null))
    }

    /// A write the server accepted stays accepted even when its reply is
    /// unreadable; `None` asks the caller to reload instead of guessing.
    async fn write(
        &self,
        method: Method,
        url: Url,
        payload: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let bytes = match self.send(method.clone(), url, Some(payload)).await {
            Ok(bytes) => bytes,
            Err(ApiError::Decode(reason)) => {
                warn!(%method, %reason, "write accepted but its response was cut short");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };
        match parse_body(&bytes) {
            Ok(body) => Ok(body),
            Err(err) => {
                warn!(%method, error = %err, "write accepted with a non-JSON response");
                Ok(None)
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

fn classify_transport(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::Network(err.to_string())
    }
}

/// A response arrived, so a broken body is never "unreachable".
fn classify_body_read(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Timeout
    } else {
        ApiError::decode(format!("failed to read body: {err}"))
    }
}

fn parse_body(bytes: &[u8]) -> Result<Option<Value>, ApiError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|err| ApiError::decode(format!("failed to parse body: {err}")))
}

fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

#[async_trait]
impl ContentApi for ApiClient {
    async fn list(&self, kind: EntityKind) -> Result<Value, ApiError> {
        let url = self.url(&[kind.collection_path()])?;
        self.read(url).await
    }

    async fn analytics(&self) -> Result<Value, ApiError> {
        let url = self.url(&[ANALYTICS_PATH])?;
        self.read(url).await
    }

    async fn create(&self, kind: EntityKind, payload: &Value) -> Result<Option<Value>, ApiError> {
        let url = self.url(&[kind.collection_path()])?;
        self.write(Method::POST, url, payload).await
    }

    async fn update(
        &self,
        kind: EntityKind,
        id: &str,
        payload: &Value,
    ) -> Result<Option<Value>, ApiError> {
        let url = self.url(&[kind.collection_path(), id])?;
        self.write(Method::PUT, url, payload).await
    }

    async fn delete(&self, kind: EntityKind, id: &str) -> Result<(), ApiError> {
        let url = self.url(&[kind.collection_path(), id])?;
        match self.send(Method::DELETE, url, None).await {
            // The status line already confirmed the delete.
            Ok(_) | Err(ApiError::Decode(_)) => Ok(()),
            Err(err) => Err(err),
        }
    }
}
