//! Common test utilities for file-committer integration tests
//!
//! This module provides:
//! - A GitHub API double built on `wiremock`
//! - Builders for requests and identities
//! - Helpers for inspecting what the double received

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use file_committer_core::{
    AppIdentity, AuthConfig, BatchOrchestrator, ClientConfig, FileCommitRequest, GitHubHttp,
};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[allow(dead_code)]
pub const TEST_PRIVATE_KEY_PEM: &str =
    include_str!("../../../file-committer-core/testdata/app_key.pem");

#[allow(dead_code)]
pub const EXCHANGE_PATH: &str = "/app/installations/67890/access_tokens";

// ============================================================================
// Builders
// ============================================================================

#[allow(dead_code)]
pub fn orchestrator_for(server: &MockServer) -> BatchOrchestrator {
    let http = GitHubHttp::new(ClientConfig::default().with_github_api_url(server.uri()))
        .expect("mock server URI is a valid base URL");
    BatchOrchestrator::new(http)
}

#[allow(dead_code)]
pub fn token_auth() -> AuthConfig {
    AuthConfig::personal_token("ghp_integration").expect("token is not blank")
}

#[allow(dead_code)]
pub fn app_auth() -> AuthConfig {
    let identity = AppIdentity::new("12345", "67890", TEST_PRIVATE_KEY_PEM)
        .expect("test identity is complete");
    AuthConfig::AppIdentity(identity)
}

#[allow(dead_code)]
pub fn file(path: &str, content: &str) -> FileCommitRequest {
    FileCommitRequest {
        repository: Some("owner/repo".to_string()),
        path: Some(path.to_string()),
        content: Some(content.to_string()),
        commit_message: Some(format!("Update {}", path)),
        branch: None,
    }
}

#[allow(dead_code)]
pub fn contents_path(file_path: &str) -> String {
    format!("/repos/owner/repo/contents/{}", file_path)
}

#[allow(dead_code)]
pub fn encoded(content: &str) -> String {
    STANDARD.encode(content.as_bytes())
}

// ============================================================================
// GitHub double
// ============================================================================

/// Probe answers 404 for `file_path`.
#[allow(dead_code)]
pub async fn mount_missing_file(server: &MockServer, file_path: &str) {
    Mock::given(method("GET"))
        .and(path(contents_path(file_path)))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({ "message": "Not Found" })))
        .mount(server)
        .await;
}

/// PUT for `file_path` succeeds with the given blob sha.
#[allow(dead_code)]
pub async fn mount_put_success(server: &MockServer, file_path: &str, sha: &str) {
    Mock::given(method("PUT"))
        .and(path(contents_path(file_path)))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "content": { "sha": sha, "path": file_path },
            "commit": { "sha": format!("commit-{}", sha) }
        })))
        .mount(server)
        .await;
}

/// Token exchange body as GitHub returns it.
#[allow(dead_code)]
pub fn token_body(token: &str, expires_at: DateTime<Utc>) -> Value {
    json!({
        "token": token,
        "expires_at": expires_at.to_rfc3339(),
        "permissions": { "contents": "write" },
        "repository_selection": "all"
    })
}

// ============================================================================
// Inspection
// ============================================================================

/// JSON bodies of every PUT the double received, in order.
#[allow(dead_code)]
pub async fn put_bodies(server: &MockServer) -> Vec<Value> {
    requests_with_method(server, "PUT")
        .await
        .iter()
        .map(|request| request.body_json::<Value>().expect("PUT body is JSON"))
        .collect()
}

/// `Authorization` header of every PUT the double received, in order.
#[allow(dead_code)]
pub async fn put_authorizations(server: &MockServer) -> Vec<String> {
    requests_with_method(server, "PUT")
        .await
        .iter()
        .map(|request| {
            request
                .headers
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string()
        })
        .collect()
}

/// Number of token exchanges the double received.
#[allow(dead_code)]
pub async fn exchange_count(server: &MockServer) -> usize {
    requests_with_method(server, "POST")
        .await
        .iter()
        .filter(|request| request.url.path() == EXCHANGE_PATH)
        .count()
}

#[allow(dead_code)]
async fn requests_with_method(server: &MockServer, verb: &str) -> Vec<wiremock::Request> {
    server
        .received_requests()
        .await
        .expect("request recording is enabled")
        .into_iter()
        .filter(|request| request.method.as_str() == verb)
        .collect()
}
