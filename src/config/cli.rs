use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint, builder::BoolishValueParser};
use folio_api_types::EntityKind;

/// Command-line arguments for the folio admin binary.
#[derive(Debug, Parser)]
#[command(name = "folio", version, about = "Portfolio content admin")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "FOLIO_CONFIG_FILE", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the content API base URL.
    #[arg(long = "api-url", env = "FOLIO_API_URL", value_name = "URL", global = true)]
    pub api_url: Option<String>,

    /// Override the request timeout in seconds.
    #[arg(long = "timeout-seconds", value_name = "SECONDS", global = true)]
    pub timeout_seconds: Option<u64>,

    /// Override the session file location.
    #[arg(long = "session-file", value_name = "PATH", value_hint = ValueHint::FilePath, global = true)]
    pub session_file: Option<PathBuf>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new(),
        global = true
    )]
    pub log_json: Option<bool>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Store credentials for later commands.
    Login(LoginArgs),
    /// Forget stored credentials.
    Logout,
    /// Load every collection and print a summary.
    Overview(OverviewArgs),
    /// Create an entity from a JSON field file.
    Create(CreateArgs),
    /// Edit a loaded entity with a JSON field file.
    Edit(EditArgs),
    /// Delete an entity after confirmation.
    Delete(DeleteArgs),
    /// Upload media files and print the hosted URLs.
    Upload(UploadArgs),
}

#[derive(Debug, Args, Clone)]
pub struct LoginArgs {
    /// Bearer token issued by the content API.
    #[arg(long, env = "FOLIO_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Email of the signed-in administrator.
    #[arg(long)]
    pub email: Option<String>,

    /// Display name of the signed-in administrator.
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Args, Clone, Default)]
pub struct OverviewArgs {
    /// Print the full dashboard state as JSON.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}

#[derive(Debug, Args, Clone)]
pub struct CreateArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    /// JSON object mapping field names to values.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Images to upload and attach (projects and blog posts).
    #[arg(long = "image", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct EditArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    pub id: String,

    /// JSON object mapping field names to new values.
    #[arg(long, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub input: PathBuf,

    /// Images to upload and attach (projects and blog posts).
    #[arg(long = "image", value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub images: Vec<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    #[arg(value_enum)]
    pub kind: KindArg,

    pub id: String,

    /// Skip the interactive confirmation.
    #[arg(long, short = 'y', action = clap::ArgAction::SetTrue)]
    pub yes: bool,
}

#[derive(Debug, Args, Clone)]
pub struct UploadArgs {
    /// Files to upload.
    #[arg(required = true, value_name = "PATH", value_hint = ValueHint::FilePath)]
    pub files: Vec<PathBuf>,

    /// Treat files as documents (PDF allowed, smaller size limit).
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub document: bool,

    /// Destination folder on the media host.
    #[arg(long)]
    pub folder: Option<String>,

    /// Tags recorded with each upload.
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    Project,
    Blog,
    Experience,
    Quote,
    Skill,
    Resume,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Project => EntityKind::Project,
            KindArg::Blog => EntityKind::Blog,
            KindArg::Experience => EntityKind::Experience,
            KindArg::Quote => EntityKind::Quote,
            KindArg::Skill => EntityKind::Skill,
            KindArg::Resume => EntityKind::Resume,
        }
    }
}
