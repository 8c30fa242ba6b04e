//! Tests for batch orchestration.

use super::*;
use crate::auth::AppIdentity;
use crate::client::ClientConfig;
use crate::error::AuthError;
use crate::files::FileCommitSpec;
use crate::request::Credential;
use crate::secrets::InMemorySecretResolver;
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEST_PRIVATE_KEY_PEM: &str = include_str!("../testdata/app_key.pem");

// ============================================================================
// Test doubles
// ============================================================================

/// Committer that records calls and succeeds unless told to reject a path.
#[derive(Default)]
struct RecordingCommitter {
    calls: Mutex<Vec<String>>,
    rejections: HashMap<String, (u16, String)>,
}

impl RecordingCommitter {
    fn rejecting(path: &str, status: u16, body: &str) -> Self {
        let mut rejections = HashMap::new();
        rejections.insert(path.to_string(), (status, body.to_string()));
        Self {
            calls: Mutex::new(Vec::new()),
            rejections,
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl FileCommitter for RecordingCommitter {
    async fn upsert(
        &self,
        spec: &FileCommitSpec,
        auth: &dyn AuthProvider,
    ) -> Result<CommittedFile, CommitError> {
        auth.header_value().await?;
        self.calls.lock().unwrap().push(spec.path().to_string());

        if let Some((status, body)) = self.rejections.get(spec.path()) {
            return Err(CommitError::Rejected {
                status: *status,
                body: body.clone(),
            });
        }

        Ok(CommittedFile {
            path: spec.path().to_string(),
            sha: format!("sha-{}", spec.path()),
            url: format!(
                "https://github.com/{}/blob/{}/{}",
                spec.repository(),
                spec.branch(),
                spec.path()
            ),
        })
    }
}

struct FailingAuth;

#[async_trait]
impl AuthProvider for FailingAuth {
    async fn header_value(&self) -> Result<String, AuthError> {
        Err(AuthError::TokenExchangeFailed {
            status: 503,
            body: "unavailable".to_string(),
        })
    }
}

fn default_http() -> GitHubHttp {
    GitHubHttp::new(ClientConfig::default()).unwrap()
}

fn orchestrator(committer: Arc<RecordingCommitter>) -> BatchOrchestrator {
    BatchOrchestrator::with_committer(default_http(), committer)
}

fn token() -> AuthConfig {
    AuthConfig::personal_token("ghp_test").unwrap()
}

fn file(path: &str) -> FileCommitRequest {
    FileCommitRequest {
        repository: Some("owner/repo".to_string()),
        path: Some(path.to_string()),
        content: Some(format!("content of {}", path)),
        commit_message: Some(format!("Add {}", path)),
        branch: None,
    }
}

// ============================================================================
// Outcome and report types
// ============================================================================

mod outcome_tests {
    use super::*;

    #[test]
    fn test_success_outcome_has_sha_and_url_only() {
        let outcome = CommitOutcome::succeeded(CommittedFile {
            path: "a.txt".to_string(),
            sha: "abc".to_string(),
            url: "https://github.com/o/r/blob/main/a.txt".to_string(),
        });

        assert!(outcome.success);
        assert!(outcome.error.is_none());
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "success": true,
                "path": "a.txt",
                "sha": "abc",
                "githubUrl": "https://github.com/o/r/blob/main/a.txt"
            })
        );
    }

    #[test]
    fn test_failed_outcome_has_error_only() {
        let outcome = CommitOutcome::from_result(
            "a.txt",
            Err(CommitError::Rejected {
                status: 409,
                body: "conflict".to_string(),
            }),
        );

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "success": false, "path": "a.txt", "error": "409 - conflict" })
        );
    }

    #[test]
    fn test_report_serializes_camel_case_and_lowercase_severity() {
        let report = BatchReport::completed(BatchResult::from_outcomes(Vec::new(), Vec::new()));
        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(value["severity"], "normal");
        assert_eq!(value["result"]["filesProcessed"], 0);
        assert_eq!(value["result"]["success"], true);
    }

    #[test]
    fn test_fatal_result_shape() {
        let result = BatchResult::fatal("boom");

        assert!(!result.success);
        assert_eq!(result.files_processed, 0);
        assert!(result.results.is_empty());
        assert_eq!(result.errors, vec!["boom"]);
    }
}

// ============================================================================
// Processing phase
// ============================================================================

mod processing_tests {
    use super::*;

    #[tokio::test]
    async fn test_all_files_succeed() {
        let committer = Arc::new(RecordingCommitter::default());
        let files = vec![file("test/file1.yaml"), file("test/file2.yaml")];

        let report = orchestrator(committer.clone()).run(token(), &files).await;

        assert_eq!(report.severity, Severity::Normal);
        assert_eq!(report.message, "Successfully committed 2 files to GitHub");
        assert!(report.result.success);
        assert_eq!(report.result.files_processed, 2);
        assert!(report.result.errors.is_empty());
        assert_eq!(committer.calls(), vec!["test/file1.yaml", "test/file2.yaml"]);
        assert_eq!(
            report.result.results[0].sha.as_deref(),
            Some("sha-test/file1.yaml")
        );
    }

    /// A file missing a field fails alone; the rest are still attempted.
    #[tokio::test]
    async fn test_validation_failure_is_recorded_and_skipped() {
        let committer = Arc::new(RecordingCommitter::default());
        let files = vec![
            file("test/file1.yaml"),
            FileCommitRequest {
                content: None,
                ..file("test/file2.yaml")
            },
            file("test/file3.yaml"),
        ];

        let report = orchestrator(committer.clone()).run(token(), &files).await;

        assert_eq!(report.severity, Severity::Warning);
        assert_eq!(
            report.message,
            "GitHub file commit completed with 1 errors. Check results for details."
        );
        assert_eq!(committer.calls(), vec!["test/file1.yaml", "test/file3.yaml"]);
        assert_eq!(report.result.files_processed, 3);
        assert_eq!(
            report.result.errors,
            vec!["Failed to process file test/file2.yaml: Missing required fields: content"]
        );

        let failed = &report.result.results[1];
        assert!(!failed.success);
        assert_eq!(failed.path, "test/file2.yaml");
        assert!(failed.sha.is_none());
    }

    #[tokio::test]
    async fn test_rejected_commit_is_recorded_and_batch_continues() {
        let committer = Arc::new(RecordingCommitter::rejecting(
            "test/file1.yaml",
            422,
            "Validation failed",
        ));
        let files = vec![file("test/file1.yaml"), file("test/file2.yaml")];

        let report = orchestrator(committer.clone()).run(token(), &files).await;

        assert_eq!(report.severity, Severity::Warning);
        assert_eq!(committer.calls().len(), 2);
        let error = report.result.results[0].error.as_deref().unwrap();
        assert!(error.contains("422"));
        assert!(error.contains("Validation failed"));
        assert!(report.result.results[1].success);
        assert_eq!(report.result.errors.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_path_is_reported_as_unknown() {
        let committer = Arc::new(RecordingCommitter::default());
        let files = vec![FileCommitRequest {
            path: None,
            ..file("ignored")
        }];

        let report = orchestrator(committer).run(token(), &files).await;

        assert_eq!(report.result.results[0].path, "unknown");
        assert_eq!(
            report.result.errors,
            vec!["Failed to process file unknown: Missing required fields: path"]
        );
    }

    /// An auth failure after setup is charged to each file, not the batch.
    #[tokio::test]
    async fn test_auth_failure_during_processing_is_per_file() {
        let committer = Arc::new(RecordingCommitter::default());
        let files = vec![file("a.txt"), file("b.txt")];

        let result = orchestrator(committer.clone())
            .process(&FailingAuth, &files)
            .await;

        assert!(!result.success);
        assert_eq!(result.files_processed, 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors[0].starts_with("Failed to process file a.txt: Authentication failed"));
        assert!(committer.calls().is_empty());
    }

    /// The error entry names the same path as the outcome.
    #[tokio::test]
    async fn test_rejected_file_reports_normalised_path() {
        let committer = Arc::new(RecordingCommitter::rejecting("a.txt", 409, "conflict"));

        let report = orchestrator(committer).run(token(), &[file("/a.txt")]).await;

        assert_eq!(report.result.results[0].path, "a.txt");
        assert_eq!(
            report.result.errors,
            vec!["Failed to process file a.txt: 409 - conflict"]
        );
    }

    #[tokio::test]
    async fn test_parent_segment_is_never_committed() {
        let committer = Arc::new(RecordingCommitter::default());
        let files = vec![file("docs/../secret.txt"), file("docs/readme.md")];

        let report = orchestrator(committer.clone()).run(token(), &files).await;

        assert_eq!(committer.calls(), vec!["docs/readme.md"]);
        assert!(!report.result.results[0].success);
        assert!(report.result.errors[0]
            .starts_with("Failed to process file docs/../secret.txt: Invalid format for path"));
    }

    #[tokio::test]
    async fn test_error_count_matches_failed_items() {
        let committer = Arc::new(RecordingCommitter::rejecting("b.txt", 500, "oops"));
        let files = vec![
            file("a.txt"),
            file("b.txt"),
            FileCommitRequest {
                repository: Some("not-a-repo".to_string()),
                ..file("c.txt")
            },
            file("d.txt"),
        ];

        let report = orchestrator(committer).run(token(), &files).await;

        let failed = report.result.results.iter().filter(|r| !r.success).count();
        assert_eq!(failed, 2);
        assert_eq!(report.result.errors.len(), failed);
        assert_eq!(report.result.files_processed, 4);
    }
}

// ============================================================================
// Setup phase
// ============================================================================

mod setup_tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_file_list_is_fatal() {
        let committer = Arc::new(RecordingCommitter::default());

        let report = orchestrator(committer.clone()).run(token(), &[]).await;

        assert_eq!(report.severity, Severity::Fatal);
        assert_eq!(
            report.message,
            "Function failed: At least one file must be specified"
        );
        assert_eq!(report.result.files_processed, 0);
        assert!(report.result.results.is_empty());
        assert!(committer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_without_auth_is_fatal() {
        let committer = Arc::new(RecordingCommitter::default());
        let request = CommitRequest {
            files: vec![file("a.txt")],
            ..CommitRequest::default()
        };

        let report = orchestrator(committer.clone())
            .run_request(request, &InMemorySecretResolver::new())
            .await;

        assert_eq!(report.severity, Severity::Fatal);
        assert_eq!(
            report.message,
            "Function failed: Either githubToken or githubApp authentication must be provided"
        );
        assert!(committer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_with_both_auth_methods_is_fatal() {
        let committer = Arc::new(RecordingCommitter::default());
        let request: CommitRequest = serde_json::from_value(json!({
            "githubToken": "ghp_x",
            "githubApp": { "appId": "1", "installationId": "2", "privateKey": "k" },
            "files": [{ "repository": "owner/repo", "path": "a.txt", "content": "x", "commitMessage": "m" }]
        }))
        .unwrap();

        let report = orchestrator(committer.clone())
            .run_request(request, &InMemorySecretResolver::new())
            .await;

        assert_eq!(report.severity, Severity::Fatal);
        assert!(report.message.contains("simultaneously"));
        assert!(committer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_request_with_token_runs() {
        let committer = Arc::new(RecordingCommitter::default());
        let request = CommitRequest {
            github_token: Some(Credential::from("ghp_x")),
            files: vec![file("a.txt")],
            ..CommitRequest::default()
        };

        let report = orchestrator(committer.clone())
            .run_request(request, &InMemorySecretResolver::new())
            .await;

        assert_eq!(report.severity, Severity::Normal);
        assert_eq!(committer.calls(), vec!["a.txt"]);
    }

    /// A failed token exchange during setup prevents any commit.
    #[tokio::test]
    async fn test_app_exchange_failure_is_fatal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Bad credentials"))
            .expect(1)
            .mount(&server)
            .await;

        let http =
            GitHubHttp::new(ClientConfig::default().with_github_api_url(server.uri())).unwrap();
        let committer = Arc::new(RecordingCommitter::default());
        let orchestrator = BatchOrchestrator::with_committer(http, committer.clone());
        let identity = AppIdentity::new("12345", "67890", TEST_PRIVATE_KEY_PEM).unwrap();

        let report = orchestrator
            .run(AuthConfig::AppIdentity(identity), &[file("a.txt")])
            .await;

        assert_eq!(report.severity, Severity::Fatal);
        assert_eq!(
            report.message,
            "Function failed: Failed to get installation access token: 401 - Bad credentials"
        );
        assert!(committer.calls().is_empty());
    }

    /// A token that cannot travel in a header stops the batch before any commit.
    #[tokio::test]
    async fn test_token_with_control_character_is_fatal() {
        let committer = Arc::new(RecordingCommitter::default());
        let auth = AuthConfig::personal_token("ghp_abc\n").unwrap();

        let report = orchestrator(committer.clone())
            .run(auth, &[file("a.txt"), file("b.txt")])
            .await;

        assert_eq!(report.severity, Severity::Fatal);
        assert_eq!(
            report.message,
            "Function failed: Credential is not a valid header value"
        );
        assert_eq!(report.result.files_processed, 0);
        assert!(committer.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unusable_private_key_is_fatal() {
        let committer = Arc::new(RecordingCommitter::default());
        let identity = AppIdentity::new("1", "2", "not a pem").unwrap();

        let report = orchestrator(committer.clone())
            .run(AuthConfig::AppIdentity(identity), &[file("a.txt")])
            .await;

        assert_eq!(report.severity, Severity::Fatal);
        assert!(report.message.starts_with("Function failed: Invalid private key"));
        assert!(committer.calls().is_empty());
    }
}
