//! Resolution of credential references to secret values.
//!
//! A request may name its credentials indirectly through a
//! [`SecretReference`] instead of carrying them inline. A [`SecretResolver`]
//! turns the reference into the secret text before the batch starts.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use zeroize::Zeroizing;

use crate::error::SecretError;

/// Namespace assumed when a reference does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// Location of a secret value: a key inside a named secret.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SecretReference {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    pub key: String,
}

impl SecretReference {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
            key: key.into(),
        }
    }

    /// Place the reference in an explicit namespace.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    /// Namespace, falling back to [`DEFAULT_NAMESPACE`].
    pub fn namespace(&self) -> &str {
        match self.namespace.as_deref() {
            Some(namespace) if !namespace.is_empty() => namespace,
            _ => DEFAULT_NAMESPACE,
        }
    }
}

impl fmt::Display for SecretReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.namespace(), self.name, self.key)
    }
}

/// Looks up the value behind a [`SecretReference`].
#[async_trait]
pub trait SecretResolver: Send + Sync {
    /// Resolve a reference to its secret text.
    ///
    /// # Errors
    ///
    /// - `SecretError::NotFound` if the secret or key does not exist
    /// - `SecretError::InvalidFormat` if the reference is malformed or the
    ///   value is not UTF-8
    /// - `SecretError::ProviderUnavailable` if the store cannot be read
    async fn resolve(&self, reference: &SecretReference) -> Result<Zeroizing<String>, SecretError>;
}

// ============================================================================
// In-memory resolver
// ============================================================================

/// Resolver backed by a map, for tests and embedding.
#[derive(Default, Clone)]
pub struct InMemorySecretResolver {
    secrets: HashMap<(String, String, String), Zeroizing<String>>,
}

impl InMemorySecretResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a secret value.
    pub fn insert(&mut self, reference: &SecretReference, value: impl Into<String>) {
        self.secrets
            .insert(Self::slot(reference), Zeroizing::new(value.into()));
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_secret(mut self, reference: &SecretReference, value: impl Into<String>) -> Self {
        self.insert(reference, value);
        self
    }

    fn slot(reference: &SecretReference) -> (String, String, String) {
        (
            reference.namespace().to_string(),
            reference.name.clone(),
            reference.key.clone(),
        )
    }
}

impl fmt::Debug for InMemorySecretResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySecretResolver")
            .field("secrets", &self.secrets.len())
            .finish()
    }
}

#[async_trait]
impl SecretResolver for InMemorySecretResolver {
    async fn resolve(&self, reference: &SecretReference) -> Result<Zeroizing<String>, SecretError> {
        self.secrets
            .get(&Self::slot(reference))
            .cloned()
            .ok_or_else(|| SecretError::NotFound {
                reference: reference.to_string(),
            })
    }
}

// ============================================================================
// Mounted secret volumes
// ============================================================================

/// Resolver reading secrets mounted as files.
///
/// A reference maps to `{root}/{namespace}/{name}/{key}`; the namespace
/// defaults to [`DEFAULT_NAMESPACE`]. One trailing newline is stripped from
/// the file contents.
#[derive(Debug, Clone)]
pub struct MountedSecretResolver {
    root: PathBuf,
}

impl MountedSecretResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, reference: &SecretReference) -> Result<PathBuf, SecretError> {
        let segments = [
            reference.namespace(),
            reference.name.as_str(),
            reference.key.as_str(),
        ];
        let usable = |segment: &&str| {
            !segment.is_empty()
                && *segment != "."
                && *segment != ".."
                && !segment.contains(['/', '\\'])
        };
        if !segments.iter().all(usable) {
            return Err(SecretError::InvalidFormat {
                reference: reference.to_string(),
            });
        }

        Ok(segments
            .iter()
            .fold(self.root.clone(), |path, segment| path.join(segment)))
    }
}

#[async_trait]
impl SecretResolver for MountedSecretResolver {
    async fn resolve(&self, reference: &SecretReference) -> Result<Zeroizing<String>, SecretError> {
        let path = self.path_for(reference)?;
        debug!(path = %path.display(), "Reading mounted secret");

        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => Zeroizing::new(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SecretError::NotFound {
                    reference: reference.to_string(),
                })
            }
            Err(e) => {
                return Err(SecretError::ProviderUnavailable(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let text = std::str::from_utf8(&bytes).map_err(|_| SecretError::InvalidFormat {
            reference: reference.to_string(),
        })?;
        let text = text
            .strip_suffix("\r\n")
            .or_else(|| text.strip_suffix('\n'))
            .unwrap_or(text);

        Ok(Zeroizing::new(text.to_string()))
    }
}

#[cfg(test)]
#[path = "secrets_tests.rs"]
mod tests;
