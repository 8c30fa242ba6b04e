//! # File Committer CLI
//!
//! Command-line interface for committing files to GitHub repositories.
//!
//! This module provides CLI commands for:
//! - Running a commit request document against GitHub
//! - Validating a request document locally
//!
//! The batch report is written to stdout; logs go to stderr.

use clap::{Parser, Subcommand};
use file_committer_core::{
    BatchOrchestrator, BatchReport, ClientConfig, CommitRequest, ConfigError as ClientError,
    GitHubHttp, InMemorySecretResolver, MountedSecretResolver, SecretResolver, Severity,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// ============================================================================
// CLI Structure
// ============================================================================

/// File Committer - commit file content to GitHub repositories
#[derive(Parser, Debug)]
#[command(name = "file-committer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Commit file content to GitHub repositories")]
#[command(
    long_about = "Creates or updates files in GitHub repositories using a personal access token or a GitHub App installation"
)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FILE_COMMITTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Logging level, overriding the configured level
    #[arg(short, long)]
    pub log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Commit every file in a request document
    Run {
        /// Request document (JSON or YAML)
        #[arg(short, long)]
        request: PathBuf,

        /// Output format for the report
        #[arg(short, long, default_value = "json")]
        format: OutputFormat,

        /// Root of mounted secret volumes used to resolve secretRef credentials
        #[arg(long, env = "FILE_COMMITTER_SECRETS_DIR")]
        secrets_dir: Option<PathBuf>,
    },

    /// Check a request document without contacting GitHub
    Validate {
        /// Request document (JSON or YAML)
        #[arg(short, long)]
        request: PathBuf,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

/// How a command finished, mapped to the process exit code by `main`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// Every file committed, or the request is valid.
    Success,
    /// Some files failed.
    PartialFailure,
    /// The batch could not start.
    Fatal,
    /// The request document has problems.
    Invalid,
}

impl CommandStatus {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Fatal => 1,
            Self::PartialFailure => 2,
            Self::Invalid => 4,
        }
    }
}

impl From<Severity> for CommandStatus {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Normal => Self::Success,
            Severity::Warning => Self::PartialFailure,
            Severity::Fatal => Self::Fatal,
        }
    }
}

// ============================================================================
// CLI Error Types
// ============================================================================

/// CLI-specific errors
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("Client configuration error: {0}")]
    Client(#[from] ClientError),

    #[error("Invalid request document {path}: {message}")]
    InvalidRequest { path: PathBuf, message: String },

    #[error("Failed to render report: {message}")]
    Output { message: String },

    #[error("Logging initialization failed: {message}")]
    Logging { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Settings loaded from configuration files and the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CommitterSettings {
    pub github: GitHubSettings,
    pub logging: LoggingSettings,
}

/// GitHub endpoint and client behaviour
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSettings {
    pub api_url: String,
    pub web_url: String,
    pub user_agent: String,
    pub timeout_seconds: u64,
}

impl Default for GitHubSettings {
    fn default() -> Self {
        let defaults = ClientConfig::default();
        Self {
            api_url: defaults.github_api_url,
            web_url: defaults.github_web_url,
            user_agent: defaults.user_agent,
            timeout_seconds: defaults.timeout.as_secs(),
        }
    }
}

impl GitHubSettings {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_github_api_url(&self.api_url)
            .with_github_web_url(&self.web_url)
            .with_user_agent(&self.user_agent)
            .with_timeout(Duration::from_secs(self.timeout_seconds))
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Prefix of environment variables overriding settings, e.g.
/// `FILE_COMMITTER__GITHUB__API_URL`.
pub const ENV_PREFIX: &str = "FILE_COMMITTER";

/// Load settings.
///
/// Sources, later overriding earlier:
/// 1. `/etc/file-committer/config.{toml,yaml,json}` (optional)
/// 2. `config/file-committer.{toml,yaml,json}` (optional)
/// 3. `explicit`, when given (required)
/// 4. Environment variables prefixed `FILE_COMMITTER__`, `__` separated
pub fn load_settings(explicit: Option<&Path>) -> Result<CommitterSettings, CliError> {
    let mut builder = config::Config::builder()
        .add_source(config::File::with_name("/etc/file-committer/config").required(false))
        .add_source(config::File::with_name("config/file-committer").required(false));

    if let Some(path) = explicit {
        builder = builder.add_source(config::File::from(path).required(true));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    Ok(settings)
}

/// Install the global tracing subscriber, writing to stderr.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_tracing(level: &str, json: bool) -> Result<(), CliError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(level).map_err(|e| CliError::Logging {
            message: e.to_string(),
        })?,
    };

    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })
}

// ============================================================================
// Request documents
// ============================================================================

/// Parse a request document. Files ending in `.json` are read as JSON,
/// anything else as YAML.
pub fn parse_request(path: &Path, text: &str) -> Result<CommitRequest, CliError> {
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let parsed = if is_json {
        serde_json::from_str(text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| CliError::InvalidRequest {
        path: path.to_path_buf(),
        message,
    })
}

async fn read_request(path: &Path) -> Result<CommitRequest, CliError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| CliError::InvalidRequest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    parse_request(path, &text)
}

/// Problems found in a request without resolving secrets or contacting
/// GitHub.
pub fn request_problems(request: &CommitRequest) -> Vec<String> {
    let mut problems = Vec::new();

    if let Err(e) = request.check_auth_shape() {
        problems.push(e.to_string());
    }
    if request.files.is_empty() {
        problems.push(ClientError::NoFiles.to_string());
    }
    for (index, file) in request.files.iter().enumerate() {
        if let Err(e) = file.validate() {
            problems.push(format!("files[{}] ({}): {}", index, file.display_path(), e));
        }
    }

    problems
}

/// Render a report in the requested format.
pub fn render_report(report: &BatchReport, format: OutputFormat) -> Result<String, CliError> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(report).map_err(|e| e.to_string()),
        OutputFormat::Yaml => serde_yaml::to_string(report).map_err(|e| e.to_string()),
    };
    rendered.map_err(|message| CliError::Output { message })
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Main CLI entry point
pub async fn run_cli() -> Result<CommandStatus, CliError> {
    let cli = Cli::parse();

    let settings = load_settings(cli.config.as_deref())?;
    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| settings.logging.level.clone());
    init_tracing(&level, cli.json_logs || settings.logging.json)?;

    let mut stdout = std::io::stdout().lock();
    execute(cli.command, &settings, &mut stdout).await
}

/// Execute a command, writing its output to `out`.
pub async fn execute(
    command: Commands,
    settings: &CommitterSettings,
    out: &mut dyn Write,
) -> Result<CommandStatus, CliError> {
    match command {
        Commands::Run {
            request,
            format,
            secrets_dir,
        } => execute_run_command(&request, format, secrets_dir.as_deref(), settings, out).await,
        Commands::Validate { request } => execute_validate_command(&request, out).await,
    }
}

// ============================================================================
// Command Implementations
// ============================================================================

async fn execute_run_command(
    request_path: &Path,
    format: OutputFormat,
    secrets_dir: Option<&Path>,
    settings: &CommitterSettings,
    out: &mut dyn Write,
) -> Result<CommandStatus, CliError> {
    let request = read_request(request_path).await?;
    info!(request = %request_path.display(), files = request.files.len(), "Running commit request");

    let resolver: Box<dyn SecretResolver> = match secrets_dir {
        Some(dir) => {
            debug!(secrets_dir = %dir.display(), "Resolving credentials from mounted secrets");
            Box::new(MountedSecretResolver::new(dir))
        }
        None => Box::new(InMemorySecretResolver::new()),
    };

    let http = GitHubHttp::new(settings.github.client_config())?;
    let report = BatchOrchestrator::new(http)
        .run_request(request, &*resolver)
        .await;

    writeln!(out, "{}", render_report(&report, format)?)?;
    Ok(report.severity.into())
}

async fn execute_validate_command(
    request_path: &Path,
    out: &mut dyn Write,
) -> Result<CommandStatus, CliError> {
    let request = read_request(request_path).await?;
    let problems = request_problems(&request);

    if problems.is_empty() {
        writeln!(
            out,
            "Request is valid: {} files to commit",
            request.files.len()
        )?;
        return Ok(CommandStatus::Success);
    }

    for problem in &problems {
        writeln!(out, "- {}", problem)?;
    }
    Ok(CommandStatus::Invalid)
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
