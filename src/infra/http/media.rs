//! Multipart uploads to the external media host.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use folio_api_types::UploadedMedia;
use futures::stream::{self, StreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use super::build_client;
use crate::application::uploads::{MediaHost, ProgressSink, UploadError, UploadFile, UploadOptions};
use crate::infra::error::InfraError;

const CHUNK_SIZE: usize = 64 * 1024;
const CONFIGURATION_HINTS: &[&str] = &["preset", "api key", "api_key", "cloud name", "cloud_name"];

#[derive(Debug, Deserialize)]
struct HostedMedia {
    secure_url: Option<String>,
    url: Option<String>,
    public_id: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    format: Option<String>,
    #[serde(default)]
    bytes: u64,
}

#[derive(Debug, Deserialize)]
struct HostError {
    error: HostErrorBody,
}

#[derive(Debug, Deserialize)]
struct HostErrorBody {
    message: String,
}

/// Media host reached over HTTP with an unsigned upload preset.
#[derive(Clone)]
pub struct MediaHostClient {
    client: Client,
    endpoint: Url,
    upload_preset: String,
}

impl MediaHostClient {
    pub fn new(
        endpoint: &str,
        upload_preset: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, InfraError> {
        let endpoint = Url::parse(endpoint).map_err(|err| {
            InfraError::configuration(format!("invalid media upload URL `{endpoint}`: {err}"))
        })?;
        let upload_preset = upload_preset.into();
        if upload_preset.trim().is_empty() {
            return Err(InfraError::configuration("media upload preset is empty"));
        }
        Ok(Self {
            client: build_client(timeout)?,
            endpoint,
            upload_preset,
        })
    }

    fn form(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
        progress: &ProgressSink,
    ) -> Result<Form, UploadError> {
        let total = file.size();
        let body = Body::wrap_stream(progress_stream(file.bytes.clone(), progress.clone()));
        let part = Part::stream_with_length(body, total)
            .file_name(file.filename.clone())
            .mime_str(&file.media_type)
            .map_err(|err| UploadError::transfer(format!("invalid media type: {err}")))?;

        let mut form = Form::new()
            .part("file", part)
            .text("upload_preset", self.upload_preset.clone());
        if let Some(folder) = &options.folder {
            form = form.text("folder", folder.clone());
        }
        if !options.tags.is_empty() {
            form = form.text("tags", options.tags.join(","));
        }
        Ok(form)
    }
}

impl std::fmt::Debug for MediaHostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaHostClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("upload_preset", &self.upload_preset)
            .finish_non_exhaustive()
    }
}

/// Split `bytes` into chunks, reporting progress as each one is pulled.
/// Stops at 99 so completion is only signalled once the host answers.
fn progress_stream(
    bytes: Bytes,
    progress: ProgressSink,
) -> impl futures::Stream<Item = Result<Bytes, std::io::Error>> + Send + Sync + 'static {
    let total = bytes.len().max(1);
    let chunks: Vec<Bytes> = (0..bytes.len())
        .step_by(CHUNK_SIZE)
        .map(|start| bytes.slice(start..(start + CHUNK_SIZE).min(bytes.len())))
        .collect();

    let mut sent = 0usize;
    stream::iter(chunks).map(move |chunk| {
        sent += chunk.len();
        let percent = (sent * 100 / total).min(99);
        progress.report(u8::try_from(percent).unwrap_or(99));
        Ok(chunk)
    })
}

fn classify_failure(status: StatusCode, body: &[u8]) -> UploadError {
    let message = serde_json::from_slice::<HostError>(body)
        .map(|err| err.error.message)
        .unwrap_or_else(|_| String::from_utf8_lossy(body).chars().take(240).collect());
    let lowered = message.to_ascii_lowercase();
    let configuration = matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND
    ) || CONFIGURATION_HINTS.iter().any(|hint| lowered.contains(hint));

    if configuration {
        UploadError::configuration(message)
    } else {
        UploadError::transfer(format!("status {status}: {message}"))
    }
}

fn into_uploaded(hosted: HostedMedia, filename: &str) -> Result<UploadedMedia, UploadError> {
    let url = hosted
        .secure_url
        .or(hosted.url)
        .ok_or_else(|| UploadError::transfer(format!("no URL returned for `{filename}`")))?;
    Ok(UploadedMedia {
        media_id: hosted.public_id.unwrap_or_else(|| url.clone()),
        url,
        width: hosted.width,
        height: hosted.height,
        format: hosted.format,
        byte_size: hosted.bytes,
    })
}

#[async_trait]
impl MediaHost for MediaHostClient {
    async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
        progress: &ProgressSink,
    ) -> Result<UploadedMedia, UploadError> {
        let form = self.form(file, options, progress)?;
        debug!(filename = %file.filename, bytes = file.size(), "sending media");

        let response = self
            .client
            .post(self.endpoint.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    UploadError::transfer("the media host did not answer in time")
                } else {
                    UploadError::transfer(err.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|err| UploadError::transfer(err.to_string()))?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        let hosted: HostedMedia = serde_json::from_slice(&body)
            .map_err(|err| UploadError::transfer(format!("unreadable host response: {err}")))?;
        into_uploaded(hosted, &file.filename)
    }
}

/// Stand-in used when no media host is configured. Every upload fails with a
/// configuration error so callers can continue without images.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredMediaHost;

#[async_trait]
impl MediaHost for UnconfiguredMediaHost {
    async fn upload(
        &self,
        _file: &UploadFile,
        _options: &UploadOptions,
        _progress: &ProgressSink,
    ) -> Result<UploadedMedia, UploadError> {
        Err(UploadError::configuration(
            "no media host configured (set media.upload_url and media.upload_preset)",
        ))
    }
}
