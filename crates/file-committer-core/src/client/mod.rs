//! HTTP plumbing for GitHub REST calls.
//!
//! [`GitHubHttp`] owns the configured `reqwest::Client` (timeout, `Accept`
//! and `User-Agent` headers) and builds endpoint URLs. It is cheap to clone
//! and shared by the auth provider and the contents client.

mod contents;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use std::time::Duration;
use url::Url;

use crate::auth::AuthProvider;
use crate::error::{CommitError, ConfigError};
use crate::files::FileCommitSpec;

pub use contents::{CommittedFile, ContentsClient};

/// Media type sent on every request.
pub const GITHUB_ACCEPT: &str = "application/vnd.github.v3+json";

/// Configuration for GitHub API client behavior.
///
/// # Examples
///
/// ```
/// use file_committer_core::client::ClientConfig;
/// use std::time::Duration;
///
/// let config = ClientConfig::default()
///     .with_timeout(Duration::from_secs(60))
///     .with_user_agent("my-automation");
/// assert_eq!(config.timeout, Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// GitHub API base URL
    pub github_api_url: String,
    /// Base URL for browsable links to committed files
    pub github_web_url: String,
    /// User agent string for API requests (required by GitHub)
    pub user_agent: String,
    /// Timeout applied to every outbound request
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            github_api_url: "https://api.github.com".to_string(),
            github_web_url: "https://github.com".to_string(),
            user_agent: "file-committer".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    /// Set the GitHub API base URL.
    pub fn with_github_api_url(mut self, url: impl Into<String>) -> Self {
        self.github_api_url = url.into();
        self
    }

    /// Set the base URL used for browsable file links.
    pub fn with_github_web_url(mut self, url: impl Into<String>) -> Self {
        self.github_web_url = url.into();
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Configured HTTP client for GitHub's REST API.
#[derive(Debug, Clone)]
pub struct GitHubHttp {
    client: reqwest::Client,
    api_base: Url,
    config: ClientConfig,
}

impl GitHubHttp {
    /// Build the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the API URL cannot be used as a base URL or
    /// the underlying client cannot be constructed.
    pub fn new(config: ClientConfig) -> Result<Self, ConfigError> {
        let api_base = Url::parse(&config.github_api_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "github_api_url".to_string(),
                message: format!("'{}' is not a valid base URL", config.github_api_url),
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            api_base,
            config,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub(crate) fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Build an API URL from path segments, percent-encoding each one.
    pub fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_base.clone();
        // Cannot fail: the base was checked in `new`.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

/// Commits a single file using credentials from an [`AuthProvider`].
#[async_trait]
pub trait FileCommitter: Send + Sync {
    /// Create or update the file described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns `CommitError` if no credential can be obtained, the upsert is
    /// rejected, or the response cannot be interpreted.
    async fn upsert(
        &self,
        spec: &FileCommitSpec,
        auth: &dyn AuthProvider,
    ) -> Result<CommittedFile, CommitError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
