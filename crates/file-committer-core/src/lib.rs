//! # File Committer Core
//!
//! Commits file content to GitHub repositories on behalf of an automation
//! caller, authenticating with either a personal access token or a GitHub App
//! installation.
//!
//! This crate provides:
//! - Authentication strategies with per-instance installation token caching
//! - An idempotent contents upsert (probe for the current blob, then create
//!   or update)
//! - Batch orchestration that tolerates per-file failures
//! - The caller request model and credential reference resolution
//!
//! # Examples
//!
//! ```rust,no_run
//! use file_committer_core::{
//!     AuthConfig, BatchOrchestrator, ClientConfig, FileCommitRequest, GitHubHttp,
//! };
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let http = GitHubHttp::new(ClientConfig::default())?;
//! let orchestrator = BatchOrchestrator::new(http);
//!
//! let files = vec![FileCommitRequest {
//!     repository: Some("octocat/hello-world".to_string()),
//!     path: Some("docs/status.md".to_string()),
//!     content: Some("All systems go\n".to_string()),
//!     commit_message: Some("Update status".to_string()),
//!     branch: None,
//! }];
//!
//! let report = orchestrator
//!     .run(AuthConfig::personal_token("ghp_example")?, &files)
//!     .await;
//! println!("{}: {}", report.severity, report.message);
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod batch;
pub mod client;
pub mod error;
pub mod files;
pub mod request;
pub mod secrets;

pub use auth::{AppIdentity, AuthConfig, AuthProvider, GitHubAuthProvider, InstallationId};
pub use batch::{BatchOrchestrator, BatchReport, BatchResult, CommitOutcome, Severity};
pub use client::{ClientConfig, CommittedFile, ContentsClient, FileCommitter, GitHubHttp};
pub use error::{
    AuthError, CommitError, ConfigError, SecretError, SetupError, ValidationError,
};
pub use files::{FileCommitRequest, FileCommitSpec, RepositoryName};
pub use request::{AppCredentials, CommitRequest, Credential};
pub use secrets::{
    InMemorySecretResolver, MountedSecretResolver, SecretReference, SecretResolver,
};
