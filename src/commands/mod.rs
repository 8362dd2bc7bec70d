//! Command handlers behind the `folio` binary.

mod entities;
mod fields;
mod print;
mod session;
mod uploads;

use std::sync::Arc;

use thiserror::Error;

use crate::application::dashboard::{AdminDashboard, DashboardError};
use crate::application::error::AdminError;
use crate::application::retry::RetryExecutor;
use crate::application::uploads::{MediaHost, UploadOrchestrator};
use crate::config::{Command, LoadError, Settings};
use crate::infra::error::InfraError;
use crate::infra::http::{ApiClient, MediaHostClient, UnconfiguredMediaHost};
use crate::infra::session::Session;

pub use fields::{apply_fields, walk_to_last_step};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Dashboard(#[from] DashboardError),
    #[error("{}", .0.presentation_message())]
    Admin(#[from] AdminError),
    #[error("failed to read input file {path}: {source}")]
    InputFile {
        path: String,
        source: std::io::Error,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("step {step} ({label}) is incomplete: {details}")]
    Incomplete {
        step: usize,
        label: &'static str,
        details: String,
    },
    #[error("{failed} of {total} upload(s) failed")]
    Uploads { failed: usize, total: usize },
    #[error("not signed in; run `folio login` first")]
    NotSignedIn,
    #[error("failed to render output: {0}")]
    Output(String),
}

/// Shared handles for one command invocation.
pub struct Ctx {
    pub session: Arc<Session>,
    pub dashboard: AdminDashboard,
}

impl Ctx {
    pub fn from_settings(settings: &Settings) -> Result<Self, CliError> {
        let session = Arc::new(open_session(settings)?);
        let dashboard = build_dashboard(settings, Arc::clone(&session))?;
        Ok(Self { session, dashboard })
    }

    fn require_session(&self) -> Result<(), CliError> {
        if self.session.is_signed_in() {
            Ok(())
        } else {
            Err(CliError::NotSignedIn)
        }
    }
}

pub fn open_session(settings: &Settings) -> Result<Session, InfraError> {
    match settings.session.file.as_ref() {
        Some(path) => Session::load(path),
        None => Ok(Session::anonymous()),
    }
}

/// Wire the content API client, media host, and retry policy from settings.
pub fn build_dashboard(
    settings: &Settings,
    session: Arc<Session>,
) -> Result<AdminDashboard, InfraError> {
    let api = ApiClient::new(&settings.api.base_url, settings.api.timeout, session)?;

    let media = &settings.media;
    let host: Arc<dyn MediaHost> = match (media.upload_url.as_deref(), media.upload_preset.as_deref())
    {
        (Some(url), Some(preset)) => Arc::new(MediaHostClient::new(url, preset, media.timeout)?),
        _ => Arc::new(UnconfiguredMediaHost),
    };

    Ok(AdminDashboard::new(
        Arc::new(api),
        RetryExecutor::tokio(settings.retry),
        UploadOrchestrator::new(host, media.limits),
    ))
}

pub async fn handle(settings: &Settings, command: Command) -> Result<(), CliError> {
    let mut ctx = Ctx::from_settings(settings)?;

    match command {
        Command::Login(args) => session::login(&ctx, args),
        Command::Logout => session::logout(&ctx).await,
        Command::Overview(args) => {
            ctx.require_session()?;
            entities::overview(&mut ctx, args).await
        }
        Command::Create(args) => {
            ctx.require_session()?;
            entities::create(&mut ctx, args).await
        }
        Command::Edit(args) => {
            ctx.require_session()?;
            entities::edit(&mut ctx, args).await
        }
        Command::Delete(args) => {
            ctx.require_session()?;
            entities::delete(&mut ctx, args).await
        }
        Command::Upload(args) => uploads::upload(&ctx, args).await,
    }
}
