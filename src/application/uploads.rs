//! Concurrent media uploads with per-file progress and partial failure.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use folio_api_types::UploadedMedia;
use futures::future::join_all;
use metrics::counter;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::uploads::{UploadKind, UploadLimits, UploadValidationError, validate_upload};

/// A file held in memory, ready to validate and send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub filename: String,
    pub media_type: String,
    pub bytes: Bytes,
}

impl UploadFile {
    pub fn new(
        filename: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Bytes>,
    ) -> Self {
        Self {
            filename: filename.into(),
            media_type: media_type.into(),
            bytes: bytes.into(),
        }
    }

    /// Read `path`, guessing the media type from its extension.
    pub async fn read(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let media_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(filename, media_type, bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// `data:` URI for showing the file before it is uploaded.
    pub fn preview_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.media_type,
            STANDARD.encode(&self.bytes)
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOptions {
    pub kind: UploadKind,
    pub folder: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UploadError {
    #[error(transparent)]
    Validation(#[from] UploadValidationError),
    /// The media host is missing or misconfigured; retrying will not help.
    #[error("media host configuration error: {0}")]
    Configuration(String),
    #[error("upload failed: {0}")]
    Transfer(String),
}

impl UploadError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self::Transfer(message.into())
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, UploadError::Configuration(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadStatus {
    Pending,
    Uploading,
    Done,
    Failed,
}

impl UploadStatus {
    fn as_str(self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Done => "done",
            UploadStatus::Failed => "failed",
        }
    }
}

/// State of one file in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    pub filename: String,
    pub size_bytes: u64,
    pub status: UploadStatus,
    pub progress_percent: u8,
    pub result: Option<UploadedMedia>,
    pub error: Option<UploadError>,
}

impl UploadTask {
    fn pending(file: &UploadFile) -> Self {
        Self {
            filename: file.filename.clone(),
            size_bytes: file.size(),
            status: UploadStatus::Pending,
            progress_percent: 0,
            result: None,
            error: None,
        }
    }

    fn settle(&mut self, outcome: Result<UploadedMedia, UploadError>, progress: u8) {
        match outcome {
            Ok(media) => {
                self.status = UploadStatus::Done;
                self.progress_percent = 100;
                self.result = Some(media);
            }
            Err(err) => {
                self.status = UploadStatus::Failed;
                self.progress_percent = progress;
                self.error = Some(err);
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == UploadStatus::Done
    }

    pub fn into_result(self) -> Result<UploadedMedia, UploadError> {
        match (self.result, self.error) {
            (Some(media), _) => Ok(media),
            (None, Some(err)) => Err(err),
            (None, None) => Err(UploadError::transfer(format!(
                "`{}` never finished",
                self.filename
            ))),
        }
    }
}

/// Progress notification for one task of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadProgress {
    pub index: usize,
    pub status: UploadStatus,
    pub percent: u8,
}

pub type ProgressCallback = Arc<dyn Fn(UploadProgress) + Send + Sync>;

/// Handed to a [`MediaHost`] so a transfer can report its own progress.
#[derive(Clone)]
pub struct ProgressSink {
    index: usize,
    percent: Arc<AtomicU8>,
    callback: Option<ProgressCallback>,
}

impl ProgressSink {
    fn new(index: usize, callback: Option<ProgressCallback>) -> Self {
        Self {
            index,
            percent: Arc::new(AtomicU8::new(0)),
            callback,
        }
    }

    /// A sink nobody listens to.
    pub fn detached() -> Self {
        Self::new(0, None)
    }

    /// Record transfer progress. Values only move forwards and cap at 100.
    pub fn report(&self, percent: u8) {
        let percent = percent.min(100);
        let previous = self.percent.fetch_max(percent, Ordering::SeqCst);
        if percent > previous {
            self.emit(UploadStatus::Uploading, percent);
        }
    }

    pub fn percent(&self) -> u8 {
        self.percent.load(Ordering::SeqCst)
    }

    fn emit(&self, status: UploadStatus, percent: u8) {
        if let Some(callback) = &self.callback {
            callback(UploadProgress {
                index: self.index,
                status,
                percent,
            });
        }
    }
}

impl std::fmt::Debug for ProgressSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSink")
            .field("index", &self.index)
            .field("percent", &self.percent())
            .finish_non_exhaustive()
    }
}

/// External host that stores uploaded media.
#[async_trait]
pub trait MediaHost: Send + Sync {
    async fn upload(
        &self,
        file: &UploadFile,
        options: &UploadOptions,
        progress: &ProgressSink,
    ) -> Result<UploadedMedia, UploadError>;
}

#[derive(Clone)]
pub struct UploadOrchestrator {
    host: Arc<dyn MediaHost>,
    limits: UploadLimits,
}

impl UploadOrchestrator {
    pub fn new(host: Arc<dyn MediaHost>, limits: UploadLimits) -> Self {
        Self { host, limits }
    }

    pub fn limits(&self) -> &UploadLimits {
        &self.limits
    }

    /// Validate every file, then upload the valid ones concurrently.
    ///
    /// Returns one task per input file, in input order. Invalid files fail
    /// without touching the network; a failed transfer never affects the
    /// other tasks.
    pub async fn upload_batch(
        &self,
        files: Vec<UploadFile>,
        options: &UploadOptions,
        on_progress: Option<ProgressCallback>,
    ) -> Vec<UploadTask> {
        let mut tasks: Vec<UploadTask> = files.iter().map(UploadTask::pending).collect();
        let mut accepted = Vec::with_capacity(files.len());

        for (index, file) in files.into_iter().enumerate() {
            let sink = ProgressSink::new(index, on_progress.clone());
            match validate_upload(
                &file.filename,
                &file.media_type,
                file.size(),
                options.kind,
                &self.limits,
            ) {
                Ok(()) => accepted.push((index, file, sink)),
                Err(err) => {
                    debug!(filename = %file.filename, error = %err, "upload rejected before transfer");
                    counter!("folio_uploads_total", "outcome" => "rejected").increment(1);
                    sink.emit(UploadStatus::Failed, 0);
                    tasks[index].settle(Err(err.into()), 0);
                }
            }
        }

        if accepted.is_empty() {
            return tasks;
        }

        info!(
            files = accepted.len(),
            kind = ?options.kind,
            folder = options.folder.as_deref().unwrap_or(""),
            "uploading media batch"
        );

        for (index, _, sink) in &accepted {
            tasks[*index].status = UploadStatus::Uploading;
            sink.emit(UploadStatus::Uploading, 0);
        }

        let transfers = accepted.iter().map(|(index, file, sink)| {
            let host = Arc::clone(&self.host);
            async move {
                let outcome = host.upload(file, options, sink).await;
                let status = if outcome.is_ok() {
                    UploadStatus::Done
                } else {
                    UploadStatus::Failed
                };
                let percent = if outcome.is_ok() { 100 } else { sink.percent() };
                sink.emit(status, percent);
                (*index, outcome, sink.percent())
            }
        });

        for (index, outcome, progress) in join_all(transfers).await {
            if let Err(err) = &outcome {
                warn!(filename = %tasks[index].filename, error = %err, "media upload failed");
            }
            let status = if outcome.is_ok() {
                UploadStatus::Done
            } else {
                UploadStatus::Failed
            };
            counter!("folio_uploads_total", "outcome" => status.as_str()).increment(1);
            tasks[index].settle(outcome, progress);
        }

        tasks
    }
}

impl std::fmt::Debug for UploadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadOrchestrator")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
