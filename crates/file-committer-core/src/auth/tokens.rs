//! [`AuthProvider`] implementation for personal tokens and GitHub Apps.
//!
//! With a personal token the header value is derived once and returned on
//! every call without I/O. With an App identity the provider mints a JWT,
//! exchanges it at `POST /app/installations/{id}/access_tokens`, and caches
//! the installation token until its effective expiry.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};
use zeroize::Zeroizing;

use super::{
    AppIdentity, AuthConfig, AuthProvider, InstallationId, InstallationToken,
    InstallationTokenCache, JwtSigner, Rs256JwtSigner,
};
use crate::client::GitHubHttp;
use crate::error::AuthError;

/// Main authentication provider.
pub struct GitHubAuthProvider {
    strategy: Strategy,
}

enum Strategy {
    PersonalToken {
        header: Zeroizing<String>,
    },
    App {
        app_id: String,
        installation_id: InstallationId,
        signer: Arc<dyn JwtSigner>,
        cache: InstallationTokenCache,
        http: GitHubHttp,
    },
}

/// Response body of the installation token exchange.
#[derive(Deserialize)]
struct AccessTokenResponse {
    token: String,
    expires_at: DateTime<Utc>,
}

impl GitHubAuthProvider {
    /// Create a provider for the configured identity.
    ///
    /// # Errors
    ///
    /// - `AuthError::InvalidHeaderValue` if a personal token cannot be sent in
    ///   an `Authorization` header
    /// - `AuthError::InvalidPrivateKey` if an App identity carries a key that
    ///   cannot be used for RS256 signing
    pub fn new(config: AuthConfig, http: GitHubHttp) -> Result<Self, AuthError> {
        match config {
            AuthConfig::PersonalToken { value } => Self::personal_token(&value),
            AuthConfig::AppIdentity(identity) => {
                let signer = Rs256JwtSigner::from_pem(identity.private_key_pem())?;
                Ok(Self::with_signer(identity, Arc::new(signer), http))
            }
        }
    }

    fn personal_token(value: &str) -> Result<Self, AuthError> {
        Ok(Self {
            strategy: Strategy::PersonalToken {
                header: token_header(value)?,
            },
        })
    }

    /// Create an App provider with an explicit JWT signer.
    pub fn with_signer(identity: AppIdentity, signer: Arc<dyn JwtSigner>, http: GitHubHttp) -> Self {
        Self {
            strategy: Strategy::App {
                app_id: identity.app_id().to_string(),
                installation_id: identity.installation_id(),
                signer,
                cache: InstallationTokenCache::new(),
                http,
            },
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self.strategy {
            Strategy::PersonalToken { .. } => "personal_token",
            Strategy::App { .. } => "github_app",
        }
    }
}

/// Build `token {value}`, rejecting values that are not legal header text.
fn token_header(value: &str) -> Result<Zeroizing<String>, AuthError> {
    let header = Zeroizing::new(format!("token {}", value));
    HeaderValue::from_str(&header).map_err(|_| AuthError::InvalidHeaderValue)?;
    Ok(header)
}

/// Exchange a JWT for an installation access token.
async fn exchange_installation_token(
    http: &GitHubHttp,
    installation_id: InstallationId,
    jwt: &str,
) -> Result<InstallationToken, AuthError> {
    let installation = installation_id.to_string();
    let url = http.endpoint(["app", "installations", installation.as_str(), "access_tokens"]);

    info!(installation_id = %installation_id, "Requesting installation access token");

    let response = http
        .client()
        .post(url)
        .header(AUTHORIZATION, format!("Bearer {}", jwt))
        .send()
        .await
        .map_err(|e| AuthError::Network(e.to_string()))?;

    let status = response.status();
    if status != StatusCode::CREATED {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error body".to_string());
        error!(
            installation_id = %installation_id,
            status = status.as_u16(),
            "Installation token exchange failed"
        );
        return Err(AuthError::TokenExchangeFailed {
            status: status.as_u16(),
            body,
        });
    }

    let body = response
        .json::<AccessTokenResponse>()
        .await
        .map_err(|e| AuthError::InvalidTokenResponse {
            message: e.to_string(),
        })?;

    token_header(&body.token)?;
    let token = InstallationToken::from_exchange(body.token, body.expires_at);
    debug!(
        installation_id = %installation_id,
        expires_at = %token.expires_at(),
        "Installation token refreshed"
    );
    Ok(token)
}

#[async_trait]
impl AuthProvider for GitHubAuthProvider {
    async fn header_value(&self) -> Result<String, AuthError> {
        match &self.strategy {
            Strategy::PersonalToken { header } => Ok(header.as_str().to_string()),
            Strategy::App {
                app_id,
                installation_id,
                signer,
                cache,
                http,
            } => {
                let token = cache
                    .get_or_refresh(|| async {
                        let jwt = Zeroizing::new(signer.sign(app_id)?);
                        exchange_installation_token(http, *installation_id, &jwt).await
                    })
                    .await?;
                Ok(format!("token {}", token.token()))
            }
        }
    }
}

#[cfg(test)]
#[path = "tokens_tests.rs"]
mod tests;
