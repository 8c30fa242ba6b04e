//! Error types for file commit operations.
//!
//! Errors are split by how far they propagate. [`ConfigError`] and
//! [`AuthError`] are fatal and abort a batch before any file is attempted;
//! they are unified under [`SetupError`]. [`ValidationError`] and
//! [`CommitError`] are scoped to a single file and are recorded in the batch
//! result instead of being propagated.

use thiserror::Error;

/// Malformed, absent or conflicting configuration (fatal).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither a personal token nor a GitHub App identity was supplied.
    #[error("Either githubToken or githubApp authentication must be provided")]
    MissingAuth,

    /// Both a personal token and a GitHub App identity were supplied.
    #[error("Cannot use both githubToken and githubApp authentication simultaneously")]
    ConflictingAuth,

    /// A required configuration field is empty or missing.
    #[error("Required configuration field missing: {field}")]
    Required { field: String },

    /// A configuration field has an invalid value.
    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// The batch contains no files.
    #[error("At least one file must be specified")]
    NoFiles,

    /// A credential reference could not be resolved.
    #[error("Failed to resolve credential '{field}': {source}")]
    SecretResolution {
        field: String,
        #[source]
        source: SecretError,
    },

    /// The HTTP client could not be constructed.
    #[error("HTTP client configuration failed: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ConfigError {
    /// Only an unavailable secret store is transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::SecretResolution { source, .. } => source.is_transient(),
            _ => false,
        }
    }
}

/// Authentication failures (fatal).
#[derive(Debug, Error)]
pub enum AuthError {
    /// The private key could not be parsed.
    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    /// JWT encoding or signing failed.
    #[error("JWT generation failed: {message}")]
    JwtGenerationFailed { message: String },

    /// GitHub rejected the installation token exchange.
    #[error("Failed to get installation access token: {status} - {body}")]
    TokenExchangeFailed { status: u16, body: String },

    /// The token exchange response could not be interpreted.
    #[error("Invalid installation token response: {message}")]
    InvalidTokenResponse { message: String },

    /// The credential could not be used as an HTTP header value.
    #[error("Credential is not a valid header value")]
    InvalidHeaderValue,

    /// Network connectivity or transport error.
    #[error("Network error: {0}")]
    Network(String),
}

impl AuthError {
    /// Check if this error represents a transient condition.
    ///
    /// Transient errors are network failures, server errors (5xx) and rate
    /// limiting (429). The classification is reported, never acted on: a
    /// failed attempt is final for the batch.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::TokenExchangeFailed { status, .. } => *status >= 500 || *status == 429,
            Self::Network(_) => true,
            Self::InvalidPrivateKey { .. }
            | Self::JwtGenerationFailed { .. }
            | Self::InvalidTokenResponse { .. }
            | Self::InvalidHeaderValue => false,
        }
    }
}

/// Errors while resolving a credential reference from secret storage.
#[derive(Debug, Error)]
pub enum SecretError {
    /// The referenced secret or key does not exist.
    #[error("Secret not found: {reference}")]
    NotFound { reference: String },

    /// The reference is malformed or the secret is not UTF-8 text.
    #[error("Invalid secret format: {reference}")]
    InvalidFormat { reference: String },

    /// The secret store could not be read.
    #[error("Secret provider unavailable: {0}")]
    ProviderUnavailable(String),
}

impl SecretError {
    /// Only `ProviderUnavailable` is considered transient.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ProviderUnavailable(_))
    }
}

/// Per-file input validation failures (recoverable).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// One or more required fields are missing or empty.
    #[error("Missing required fields: {}", fields.join(", "))]
    MissingFields { fields: Vec<String> },

    /// A field has an invalid format.
    #[error("Invalid format for {field}: {message}")]
    InvalidFormat { field: String, message: String },
}

/// Per-file commit failures (recoverable).
#[derive(Debug, Error)]
pub enum CommitError {
    /// The upsert request returned a non-success status.
    #[error("{status} - {body}")]
    Rejected { status: u16, body: String },

    /// The upsert response could not be interpreted.
    #[error("Invalid commit response: {message}")]
    InvalidResponse { message: String },

    /// Network connectivity or transport error.
    #[error("Request failed: {0}")]
    Network(String),

    /// No credential could be obtained for the request.
    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),
}

impl CommitError {
    /// Check if this error represents a transient condition.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidResponse { .. } => false,
            Self::Network(_) => true,
            Self::Auth(e) => e.is_transient(),
        }
    }
}

/// Failures in the setup phase of a batch. Any of these ends the batch.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

impl SetupError {
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Config(e) => e.is_transient(),
            Self::Auth(e) => e.is_transient(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
