//! Authentication strategies for GitHub API requests.
//!
//! This module provides:
//! - [`AuthConfig`], the choice between a personal access token and a GitHub
//!   App identity
//! - [`AuthProvider`], the interface producing `Authorization` header values
//! - [`GitHubAuthProvider`], the implementation that mints JWTs and exchanges
//!   them for installation tokens when configured with an App identity
//!
//! Secret material (tokens, private keys) is held in [`Zeroizing`] buffers and
//! never exposed through `Debug`.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use zeroize::Zeroizing;

use crate::error::{AuthError, ConfigError};

pub mod cache;
pub mod jwt;
pub mod tokens;

pub use cache::InstallationTokenCache;
pub use jwt::{JwtSigner, Rs256JwtSigner};
pub use tokens::GitHubAuthProvider;

/// Minutes before nominal expiry in which an installation token is treated
/// as expired. Absorbs clock skew and requests already in flight.
pub const TOKEN_REFRESH_MARGIN_MINUTES: i64 = 5;

// ============================================================================
// Identifiers
// ============================================================================

/// GitHub App installation identifier.
///
/// # Examples
///
/// ```
/// use file_committer_core::auth::InstallationId;
///
/// let id: InstallationId = "67890".parse().unwrap();
/// assert_eq!(id.as_u64(), 67890);
/// assert!("not-a-number".parse::<InstallationId>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstallationId(u64);

impl InstallationId {
    /// Create a new installation ID.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the raw u64 value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for InstallationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InstallationId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().parse::<u64>() {
            Ok(id) if id > 0 => Ok(Self::new(id)),
            _ => Err(ConfigError::InvalidValue {
                field: "installationId".to_string(),
                message: "must be a positive integer".to_string(),
            }),
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// GitHub App identity used to mint installation tokens.
#[derive(Clone)]
pub struct AppIdentity {
    app_id: String,
    installation_id: InstallationId,
    private_key: Zeroizing<String>,
}

impl AppIdentity {
    /// Create an App identity, validating that every field is present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if `app_id` or `private_key` is empty, or if
    /// `installation_id` is not a positive integer.
    pub fn new(
        app_id: impl Into<String>,
        installation_id: &str,
        private_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let app_id = app_id.into().trim().to_string();
        if app_id.is_empty() {
            return Err(ConfigError::Required {
                field: "githubApp.appId".to_string(),
            });
        }

        if installation_id.trim().is_empty() {
            return Err(ConfigError::Required {
                field: "githubApp.installationId".to_string(),
            });
        }
        let installation_id = installation_id.parse::<InstallationId>()?;

        let private_key = Zeroizing::new(private_key.into());
        if private_key.trim().is_empty() {
            return Err(ConfigError::Required {
                field: "githubApp.privateKey".to_string(),
            });
        }

        Ok(Self {
            app_id,
            installation_id,
            private_key,
        })
    }

    /// The App ID, used as the JWT issuer.
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn installation_id(&self) -> InstallationId {
        self.installation_id
    }

    /// PEM-encoded RSA private key.
    pub fn private_key_pem(&self) -> &str {
        &self.private_key
    }
}

impl std::fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppIdentity")
            .field("app_id", &self.app_id)
            .field("installation_id", &self.installation_id)
            .field("private_key", &"<REDACTED>")
            .finish()
    }
}

/// The identity outgoing requests authenticate as.
///
/// Exactly one strategy is configured; [`AuthConfig::from_parts`] rejects
/// inputs that carry both or neither.
#[derive(Clone)]
pub enum AuthConfig {
    /// Static personal access token.
    PersonalToken { value: Zeroizing<String> },

    /// GitHub App installation, authenticated with short-lived tokens.
    AppIdentity(AppIdentity),
}

impl AuthConfig {
    /// Configure authentication with a personal access token.
    pub fn personal_token(value: impl Into<String>) -> Result<Self, ConfigError> {
        let value = Zeroizing::new(value.into());
        if value.trim().is_empty() {
            return Err(ConfigError::Required {
                field: "githubToken".to_string(),
            });
        }
        Ok(Self::PersonalToken { value })
    }

    /// Build the configuration from optional inputs, requiring exactly one.
    ///
    /// # Examples
    ///
    /// ```
    /// use file_committer_core::auth::AuthConfig;
    ///
    /// assert!(AuthConfig::from_parts(None, None).is_err());
    /// assert!(AuthConfig::from_parts(Some("ghp_x".to_string()), None).is_ok());
    /// ```
    pub fn from_parts(
        token: Option<String>,
        app: Option<AppIdentity>,
    ) -> Result<Self, ConfigError> {
        match (token, app) {
            (Some(token), None) => Self::personal_token(token),
            (None, Some(app)) => Ok(Self::AppIdentity(app)),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingAuth),
            (None, None) => Err(ConfigError::MissingAuth),
        }
    }

    /// Short label for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PersonalToken { .. } => "personal_token",
            Self::AppIdentity(_) => "github_app",
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PersonalToken { .. } => f
                .debug_struct("PersonalToken")
                .field("value", &"<REDACTED>")
                .finish(),
            Self::AppIdentity(app) => f.debug_tuple("AppIdentity").field(app).finish(),
        }
    }
}

// ============================================================================
// Tokens
// ============================================================================

/// JWT claims for GitHub App authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
    /// Issuer, the GitHub App ID.
    pub iss: String,
}

/// Installation access token with its effective expiry.
///
/// `expires_at` is already reduced by [`TOKEN_REFRESH_MARGIN_MINUTES`] relative to
/// the expiry GitHub reported.
#[derive(Clone)]
pub struct InstallationToken {
    token: Zeroizing<String>,
    expires_at: DateTime<Utc>,
}

impl InstallationToken {
    /// Create a token from the values returned by the exchange endpoint.
    pub fn from_exchange(token: impl Into<String>, nominal_expiry: DateTime<Utc>) -> Self {
        Self {
            token: Zeroizing::new(token.into()),
            expires_at: nominal_expiry - Duration::minutes(TOKEN_REFRESH_MARGIN_MINUTES),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Effective expiry, after which the token is refreshed.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit instant.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

// Security: Don't expose token in debug output
impl std::fmt::Debug for InstallationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstallationToken")
            .field("expires_at", &self.expires_at)
            .field("token", &"<REDACTED>")
            .finish()
    }
}

// ============================================================================
// Provider interface
// ============================================================================

/// Produces the `Authorization` header value for outgoing requests.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Get a header value such as `token ghp_...`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError` if a credential cannot be minted or exchanged.
    async fn header_value(&self) -> Result<String, AuthError>;
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
