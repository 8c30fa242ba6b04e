//! Batch orchestration.
//!
//! A batch runs in two phases:
//!
//! 1. **Setup** checks that there is work to do, builds the
//!    [`GitHubAuthProvider`] and primes it once. Any failure here is fatal:
//!    no file is attempted and the result carries the single setup error.
//! 2. **Processing** walks the files in input order. Each file is validated
//!    locally and then committed. Failures are recorded against the file and
//!    the loop always continues.
//!
//! The outcome is a [`BatchReport`]: the aggregate [`BatchResult`] plus a
//! severity-tagged summary message.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::auth::{AuthConfig, AuthProvider, GitHubAuthProvider};
use crate::client::{CommittedFile, ContentsClient, FileCommitter, GitHubHttp};
use crate::error::{CommitError, ConfigError, SetupError, ValidationError};
use crate::files::FileCommitRequest;
use crate::request::CommitRequest;
use crate::secrets::SecretResolver;

// ============================================================================
// Outcomes
// ============================================================================

/// Result of committing one file.
///
/// A successful outcome carries `sha` and `url`; a failed one carries
/// `error`. Never both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    pub success: bool,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha: Option<String>,
    #[serde(
        rename = "githubUrl",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommitOutcome {
    pub fn succeeded(file: CommittedFile) -> Self {
        Self {
            success: true,
            path: file.path,
            sha: Some(file.sha),
            url: Some(file.url),
            error: None,
        }
    }

    pub fn failed(path: impl Into<String>, error: impl fmt::Display) -> Self {
        Self {
            success: false,
            path: path.into(),
            sha: None,
            url: None,
            error: Some(error.to_string()),
        }
    }

    /// Convert the result of an upsert into an outcome.
    pub fn from_result(path: &str, result: Result<CommittedFile, CommitError>) -> Self {
        match result {
            Ok(file) => Self::succeeded(file),
            Err(e) => Self::failed(path, e),
        }
    }
}

/// Aggregate result of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    /// True iff `errors` is empty.
    pub success: bool,
    /// Number of files for which an outcome was produced.
    pub files_processed: usize,
    pub results: Vec<CommitOutcome>,
    pub errors: Vec<String>,
}

impl BatchResult {
    /// Result of a batch that failed during setup.
    pub fn fatal(reason: impl fmt::Display) -> Self {
        Self {
            success: false,
            files_processed: 0,
            results: Vec::new(),
            errors: vec![reason.to_string()],
        }
    }

    fn from_outcomes(results: Vec<CommitOutcome>, errors: Vec<String>) -> Self {
        Self {
            success: errors.is_empty(),
            files_processed: results.len(),
            results,
            errors,
        }
    }
}

/// Severity of a batch summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Every file was committed.
    Normal,
    /// Setup succeeded but at least one file failed.
    Warning,
    /// Setup failed; no file was attempted.
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Fatal => "fatal",
        };
        f.write_str(label)
    }
}

/// What the caller receives for a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub severity: Severity,
    pub message: String,
    pub result: BatchResult,
}

impl BatchReport {
    /// Summarise a batch whose setup succeeded.
    pub fn completed(result: BatchResult) -> Self {
        if result.errors.is_empty() {
            Self {
                severity: Severity::Normal,
                message: format!(
                    "Successfully committed {} files to GitHub",
                    result.files_processed
                ),
                result,
            }
        } else {
            Self {
                severity: Severity::Warning,
                message: format!(
                    "GitHub file commit completed with {} errors. Check results for details.",
                    result.errors.len()
                ),
                result,
            }
        }
    }

    /// Report a setup failure.
    pub fn fatal(error: &SetupError) -> Self {
        Self {
            severity: Severity::Fatal,
            message: format!("Function failed: {}", error),
            result: BatchResult::fatal(error),
        }
    }
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs batches of file commits.
pub struct BatchOrchestrator {
    http: GitHubHttp,
    committer: Arc<dyn FileCommitter>,
}

impl BatchOrchestrator {
    /// Create an orchestrator committing through the contents API.
    pub fn new(http: GitHubHttp) -> Self {
        let committer = Arc::new(ContentsClient::new(http.clone()));
        Self { http, committer }
    }

    /// Create an orchestrator with an explicit committer.
    pub fn with_committer(http: GitHubHttp, committer: Arc<dyn FileCommitter>) -> Self {
        Self { http, committer }
    }

    /// Run a batch for an already resolved identity.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), files = files.len(), auth = auth_config.kind()))]
    pub async fn run(&self, auth_config: AuthConfig, files: &[FileCommitRequest]) -> BatchReport {
        self.execute(auth_config, files).await
    }

    /// Resolve a caller request and run it.
    ///
    /// Credential resolution belongs to setup: a request with both or
    /// neither auth method, or an unresolvable reference, is fatal.
    #[instrument(skip_all, fields(run_id = %Uuid::new_v4(), files = request.files.len()))]
    pub async fn run_request(
        &self,
        request: CommitRequest,
        resolver: &dyn SecretResolver,
    ) -> BatchReport {
        if let Err(e) = request.check_auth_shape() {
            return fatal_report(e.into());
        }
        if request.files.is_empty() {
            return fatal_report(ConfigError::NoFiles.into());
        }

        match request.into_parts(resolver).await {
            Ok((auth_config, files)) => self.execute(auth_config, &files).await,
            Err(e) => fatal_report(e.into()),
        }
    }

    async fn execute(&self, auth_config: AuthConfig, files: &[FileCommitRequest]) -> BatchReport {
        let provider = match self.setup(auth_config, files).await {
            Ok(provider) => provider,
            Err(e) => return fatal_report(e),
        };

        let result = self.process(&provider, files).await;
        let report = BatchReport::completed(result);
        match report.severity {
            Severity::Normal => info!(message = %report.message, "Batch completed"),
            _ => warn!(message = %report.message, "Batch completed with errors"),
        }
        report
    }

    /// Check the batch can start and obtain a working auth provider.
    ///
    /// The provider is primed with one `header_value()` call so that an
    /// App token exchange failure aborts before any file is attempted.
    ///
    /// # Errors
    ///
    /// - `ConfigError::NoFiles` if `files` is empty
    /// - `AuthError` if the private key is unusable or the exchange fails
    pub async fn setup(
        &self,
        auth_config: AuthConfig,
        files: &[FileCommitRequest],
    ) -> Result<GitHubAuthProvider, SetupError> {
        if files.is_empty() {
            return Err(ConfigError::NoFiles.into());
        }

        let provider = GitHubAuthProvider::new(auth_config, self.http.clone())?;
        provider.header_value().await?;

        info!(files = files.len(), auth = provider.kind(), "Processing files");
        Ok(provider)
    }

    /// Commit every file in order, recording failures per file.
    pub async fn process(
        &self,
        auth: &dyn AuthProvider,
        files: &[FileCommitRequest],
    ) -> BatchResult {
        let mut results = Vec::with_capacity(files.len());
        let mut errors = Vec::new();

        for file in files {
            let (path, result) = match file.validate() {
                Ok(spec) => {
                    let result = self.committer.upsert(&spec, auth).await;
                    (spec.path().to_string(), result.map_err(FileFailure::from))
                }
                Err(e) => (file.display_path().to_string(), Err(e.into())),
            };

            let outcome = match result {
                Ok(committed) => {
                    info!(path = %committed.path, sha = %committed.sha, "Successfully processed file");
                    CommitOutcome::succeeded(committed)
                }
                Err(failure) => {
                    error!(
                        path = %path,
                        error = %failure,
                        transient = failure.is_transient(),
                        "Failed to process file"
                    );
                    errors.push(format!("Failed to process file {}: {}", path, failure));
                    CommitOutcome::failed(path, failure)
                }
            };
            results.push(outcome);
        }

        BatchResult::from_outcomes(results, errors)
    }
}

/// Why a single file could not be committed.
#[derive(Debug, Error)]
enum FileFailure {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Commit(#[from] CommitError),
}

impl FileFailure {
    fn is_transient(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Commit(e) => e.is_transient(),
        }
    }
}

fn fatal_report(error: SetupError) -> BatchReport {
    error!(error = %error, transient = error.is_transient(), "Batch setup failed");
    BatchReport::fatal(&error)
}

#[cfg(test)]
#[path = "batch_tests.rs"]
mod tests;
