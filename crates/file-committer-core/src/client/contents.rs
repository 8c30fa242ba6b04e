//! Repository contents upsert.
//!
//! A commit is a read-before-write against
//! `/repos/{owner}/{repo}/contents/{path}`:
//!
//! 1. `GET ?ref={branch}` probes for the current blob. A `200` yields its
//!    `sha`; `404` means the file is new. Any other status, or a transport
//!    failure, is logged and treated as unknown state.
//! 2. `PUT` with the base64 content, including `sha` only when the probe
//!    found one. GitHub requires the prior `sha` to update an existing file.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use url::Url;

use super::{FileCommitter, GitHubHttp};
use crate::auth::AuthProvider;
use crate::batch::CommitOutcome;
use crate::error::CommitError;
use crate::files::FileCommitSpec;

/// A file that was created or updated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommittedFile {
    /// Path within the repository
    pub path: String,
    /// Blob SHA of the committed content
    pub sha: String,
    /// Browsable URL of the file
    pub url: String,
}

/// Current blob as returned by the probe.
#[derive(Deserialize)]
struct ExistingContent {
    sha: Option<String>,
}

/// Request body for creating or updating a file.
#[derive(Debug, Serialize)]
struct PutContentsRequest<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Deserialize)]
struct PutContentsResponse {
    content: Option<ContentMetadata>,
}

#[derive(Deserialize)]
struct ContentMetadata {
    sha: String,
    html_url: Option<String>,
}

/// Client for the repository contents endpoint.
#[derive(Debug, Clone)]
pub struct ContentsClient {
    http: GitHubHttp,
}

impl ContentsClient {
    pub fn new(http: GitHubHttp) -> Self {
        Self { http }
    }

    /// Commit a file and report the outcome.
    ///
    /// Failures are captured in the returned [`CommitOutcome`] rather than
    /// propagated.
    pub async fn commit(&self, spec: &FileCommitSpec, auth: &dyn AuthProvider) -> CommitOutcome {
        CommitOutcome::from_result(spec.path(), self.upsert(spec, auth).await)
    }

    fn contents_url(&self, spec: &FileCommitSpec) -> Url {
        let repository = spec.repository();
        let segments = ["repos", repository.owner(), repository.name(), "contents"]
            .into_iter()
            .chain(spec.path().split('/'));
        self.http.endpoint(segments)
    }

    fn browsable_url(&self, spec: &FileCommitSpec) -> String {
        format!(
            "{}/{}/blob/{}/{}",
            self.http.config().github_web_url.trim_end_matches('/'),
            spec.repository(),
            spec.branch(),
            spec.path()
        )
    }

    /// Look up the current blob SHA. Never fails the commit.
    async fn probe_existing_sha(
        &self,
        url: &Url,
        spec: &FileCommitSpec,
        authorization: &str,
    ) -> Option<String> {
        let response = match self
            .http
            .client()
            .get(url.clone())
            .header(AUTHORIZATION, authorization)
            .query(&[("ref", spec.branch())])
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                warn!(path = spec.path(), error = %e, "Error checking file existence");
                return None;
            }
        };

        match response.status() {
            StatusCode::OK => match response.json::<ExistingContent>().await {
                Ok(ExistingContent { sha: Some(sha) }) => {
                    info!(path = spec.path(), sha = %sha, "File exists, will update");
                    Some(sha)
                }
                Ok(ExistingContent { sha: None }) => {
                    warn!(path = spec.path(), "Existing content carries no sha");
                    None
                }
                Err(e) => {
                    warn!(path = spec.path(), error = %e, "Unreadable existence response");
                    None
                }
            },
            StatusCode::NOT_FOUND => {
                info!(path = spec.path(), "File does not exist, will create");
                None
            }
            status => {
                warn!(
                    path = spec.path(),
                    status = status.as_u16(),
                    "Unexpected response checking file existence"
                );
                None
            }
        }
    }
}

#[async_trait]
impl FileCommitter for ContentsClient {
    async fn upsert(
        &self,
        spec: &FileCommitSpec,
        auth: &dyn AuthProvider,
    ) -> Result<CommittedFile, CommitError> {
        let authorization = auth.header_value().await?;
        let url = self.contents_url(spec);

        let sha = self.probe_existing_sha(&url, spec, &authorization).await;

        let body = PutContentsRequest {
            message: spec.commit_message(),
            content: STANDARD.encode(spec.content().as_bytes()),
            branch: spec.branch(),
            sha,
        };

        info!(
            repository = %spec.repository(),
            branch = spec.branch(),
            path = spec.path(),
            update = body.sha.is_some(),
            "Committing file"
        );

        let response = self
            .http
            .client()
            .put(url)
            .header(AUTHORIZATION, authorization.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| CommitError::Network(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK && status != StatusCode::CREATED {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            return Err(CommitError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let content = response
            .json::<PutContentsResponse>()
            .await
            .map_err(|e| CommitError::InvalidResponse {
                message: e.to_string(),
            })?
            .content
            .ok_or_else(|| CommitError::InvalidResponse {
                message: "response carries no content metadata".to_string(),
            })?;

        let url = content
            .html_url
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| self.browsable_url(spec));

        info!(path = spec.path(), sha = %content.sha, "Committed file");

        Ok(CommittedFile {
            path: spec.path().to_string(),
            sha: content.sha,
            url,
        })
    }
}

#[cfg(test)]
#[path = "contents_tests.rs"]
mod tests;
