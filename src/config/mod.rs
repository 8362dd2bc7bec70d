//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{path::PathBuf, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::retry::{
    DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_BASE_DELAY, DEFAULT_MAX_ATTEMPTS, RetryPolicy,
};
use crate::domain::uploads::{DEFAULT_DOCUMENT_MAX_BYTES, DEFAULT_GALLERY_MAX_BYTES, UploadLimits};
use crate::infra::http::DEFAULT_TIMEOUT;

pub use cli::{
    CliArgs, Command, CreateArgs, DeleteArgs, EditArgs, GlobalOverrides, KindArg, LoginArgs,
    OverviewArgs, UploadArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "folio";
const DEFAULT_API_URL: &str = "http://127.0.0.1:5000/api";
const DEFAULT_SESSION_FILE: &str = ".folio/session.json";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api: ApiSettings,
    pub session: SessionSettings,
    pub logging: LoggingSettings,
    pub retry: RetryPolicy,
    pub media: MediaSettings,
}

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// `None` keeps credentials in memory only.
    pub file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct MediaSettings {
    /// Both are required for uploads; without them the media host is
    /// treated as unconfigured.
    pub upload_url: Option<String>,
    pub upload_preset: Option<String>,
    pub timeout: Duration,
    pub limits: UploadLimits,
}

impl MediaSettings {
    pub fn is_configured(&self) -> bool {
        self.upload_url.is_some() && self.upload_preset.is_some()
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("FOLIO").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    api: RawApiSettings,
    session: RawSessionSettings,
    logging: RawLoggingSettings,
    retry: RawRetrySettings,
    media: RawMediaSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(url) = overrides.api_url.as_ref() {
            self.api.base_url = Some(url.clone());
        }
        if let Some(seconds) = overrides.timeout_seconds {
            self.api.timeout_seconds = Some(seconds);
        }
        if let Some(path) = overrides.session_file.as_ref() {
            self.session.file = Some(path.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            api,
            session,
            logging,
            retry,
            media,
        } = raw;

        let api = build_api_settings(api)?;
        let session = build_session_settings(session);
        let logging = build_logging_settings(logging)?;
        let retry = build_retry_policy(retry)?;
        let media = build_media_settings(media, api.timeout)?;

        Ok(Self {
            api,
            session,
            logging,
            retry,
            media,
        })
    }
}

fn build_api_settings(api: RawApiSettings) -> Result<ApiSettings, LoadError> {
    let base_url = non_blank(api.base_url).unwrap_or_else(|| DEFAULT_API_URL.to_string());
    url::Url::parse(&base_url)
        .map_err(|err| LoadError::invalid("api.base_url", format!("failed to parse: {err}")))?;

    let timeout = positive_secs(
        api.timeout_seconds.unwrap_or(DEFAULT_TIMEOUT.as_secs()),
        "api.timeout_seconds",
    )?;

    Ok(ApiSettings { base_url, timeout })
}

fn build_session_settings(session: RawSessionSettings) -> SessionSettings {
    let file = if session.in_memory.unwrap_or(false) {
        None
    } else {
        Some(
            session
                .file
                .filter(|path| !path.as_os_str().is_empty())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_FILE)),
        )
    };
    SessionSettings { file }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_retry_policy(retry: RawRetrySettings) -> Result<RetryPolicy, LoadError> {
    let max_attempts = retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
    let base_delay = retry
        .base_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_BASE_DELAY);
    let multiplier = retry
        .backoff_multiplier
        .unwrap_or(DEFAULT_BACKOFF_MULTIPLIER);

    RetryPolicy::new(max_attempts, base_delay, multiplier)
        .map_err(|err| LoadError::invalid("retry", err.to_string()))
}

fn build_media_settings(
    media: RawMediaSettings,
    default_timeout: Duration,
) -> Result<MediaSettings, LoadError> {
    let upload_url = non_blank(media.upload_url);
    if let Some(url) = upload_url.as_deref() {
        url::Url::parse(url).map_err(|err| {
            LoadError::invalid("media.upload_url", format!("failed to parse: {err}"))
        })?;
    }

    let timeout = match media.timeout_seconds {
        Some(seconds) => positive_secs(seconds, "media.timeout_seconds")?,
        None => default_timeout,
    };

    let gallery_max_bytes = media
        .gallery_max_bytes
        .unwrap_or(DEFAULT_GALLERY_MAX_BYTES);
    if gallery_max_bytes == 0 {
        return Err(LoadError::invalid(
            "media.gallery_max_bytes",
            "must be greater than zero",
        ));
    }
    let document_max_bytes = media
        .document_max_bytes
        .unwrap_or(DEFAULT_DOCUMENT_MAX_BYTES);
    if document_max_bytes == 0 {
        return Err(LoadError::invalid(
            "media.document_max_bytes",
            "must be greater than zero",
        ));
    }

    Ok(MediaSettings {
        upload_url,
        upload_preset: non_blank(media.upload_preset),
        timeout,
        limits: UploadLimits {
            gallery_max_bytes,
            document_max_bytes,
        },
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawApiSettings {
    base_url: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSessionSettings {
    file: Option<PathBuf>,
    in_memory: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRetrySettings {
    max_attempts: Option<u32>,
    base_delay_ms: Option<u64>,
    backoff_multiplier: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawMediaSettings {
    upload_url: Option<String>,
    upload_preset: Option<String>,
    timeout_seconds: Option<u64>,
    gallery_max_bytes: Option<u64>,
    document_max_bytes: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn positive_secs(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
