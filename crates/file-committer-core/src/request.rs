//! Caller request document.
//!
//! A [`CommitRequest`] is what the caller sends: credentials, possibly
//! indirected through [`SecretReference`]s, and the files to commit. It is
//! turned into an [`AuthConfig`] and the file list by
//! [`CommitRequest::into_parts`] before the batch starts.
//!
//! ```
//! use file_committer_core::request::CommitRequest;
//!
//! let request: CommitRequest = serde_json::from_str(r#"{
//!     "githubApp": {
//!         "appId": 12345,
//!         "installationId": "67890",
//!         "privateKey": { "secretRef": { "name": "committer", "key": "key.pem" } }
//!     },
//!     "files": [{ "repository": "owner/repo", "path": "a.txt" }]
//! }"#).unwrap();
//!
//! assert!(request.check_auth_shape().is_ok());
//! assert_eq!(request.files.len(), 1);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroizing;

use crate::auth::{AppIdentity, AuthConfig};
use crate::error::ConfigError;
use crate::files::FileCommitRequest;
use crate::secrets::{SecretReference, SecretResolver};

/// A credential given inline or by reference.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Credential {
    /// Value carried in the request itself.
    Literal(String),

    /// Numeric literal, as App and installation IDs are often written.
    Numeric(u64),

    /// Value held in secret storage.
    Reference {
        #[serde(rename = "secretRef")]
        secret_ref: SecretReference,
    },
}

impl Credential {
    /// Produce the credential text, consulting `resolver` for references.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::SecretResolution` naming `field` if the
    /// reference cannot be resolved.
    pub async fn resolve(
        &self,
        field: &str,
        resolver: &dyn SecretResolver,
    ) -> Result<Zeroizing<String>, ConfigError> {
        match self {
            Self::Literal(value) => Ok(Zeroizing::new(value.clone())),
            Self::Numeric(value) => Ok(Zeroizing::new(value.to_string())),
            Self::Reference { secret_ref } => {
                resolver
                    .resolve(secret_ref)
                    .await
                    .map_err(|source| ConfigError::SecretResolution {
                        field: field.to_string(),
                        source,
                    })
            }
        }
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::Literal(value.to_string())
    }
}

impl From<SecretReference> for Credential {
    fn from(secret_ref: SecretReference) -> Self {
        Self::Reference { secret_ref }
    }
}

// Security: literal values stay out of debug output
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => f.write_str("Literal(<REDACTED>)"),
            Self::Numeric(value) => f.debug_tuple("Numeric").field(value).finish(),
            Self::Reference { secret_ref } => f
                .debug_struct("Reference")
                .field("secret_ref", secret_ref)
                .finish(),
        }
    }
}

/// GitHub App credentials as supplied by the caller.
///
/// Fields are optional so that an incomplete block is reported as a missing
/// field rather than a parse failure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppCredentials {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installation_id: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<Credential>,
}

impl AppCredentials {
    async fn resolve(&self, resolver: &dyn SecretResolver) -> Result<AppIdentity, ConfigError> {
        let app_id = resolve_field(&self.app_id, "githubApp.appId", resolver).await?;
        let installation_id =
            resolve_field(&self.installation_id, "githubApp.installationId", resolver).await?;
        let private_key =
            resolve_field(&self.private_key, "githubApp.privateKey", resolver).await?;

        AppIdentity::new(app_id.as_str(), &installation_id, private_key.as_str())
    }
}

async fn resolve_field(
    credential: &Option<Credential>,
    field: &str,
    resolver: &dyn SecretResolver,
) -> Result<Zeroizing<String>, ConfigError> {
    match credential {
        Some(credential) => credential.resolve(field, resolver).await,
        None => Err(ConfigError::Required {
            field: field.to_string(),
        }),
    }
}

/// A batch of files to commit together with the identity to commit as.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_token: Option<Credential>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_app: Option<AppCredentials>,
    #[serde(default)]
    pub files: Vec<FileCommitRequest>,
}

impl CommitRequest {
    /// Check that exactly one authentication method is present.
    ///
    /// Performs no secret resolution.
    pub fn check_auth_shape(&self) -> Result<(), ConfigError> {
        match (&self.github_token, &self.github_app) {
            (Some(_), Some(_)) => Err(ConfigError::ConflictingAuth),
            (None, None) => Err(ConfigError::MissingAuth),
            _ => Ok(()),
        }
    }

    /// Resolve credentials and split the request into its auth configuration
    /// and file list.
    ///
    /// The auth shape is checked before any reference is resolved, so a
    /// request carrying both or neither method never reaches secret storage.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the auth shape is wrong, a reference cannot
    /// be resolved, or an App field is missing or invalid.
    pub async fn into_parts(
        self,
        resolver: &dyn SecretResolver,
    ) -> Result<(AuthConfig, Vec<FileCommitRequest>), ConfigError> {
        self.check_auth_shape()?;

        let token = match &self.github_token {
            Some(credential) => {
                let value = credential.resolve("githubToken", resolver).await?;
                Some(value.as_str().to_string())
            }
            None => None,
        };
        let app = match &self.github_app {
            Some(app) => Some(app.resolve(resolver).await?),
            None => None,
        };

        let auth = AuthConfig::from_parts(token, app)?;
        Ok((auth, self.files))
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
