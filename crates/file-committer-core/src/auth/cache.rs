//! Installation token caching.
//!
//! One cache belongs to one provider instance; there is no process-wide
//! token state.

use std::future::Future;
use tokio::sync::Mutex;
use tracing::debug;

use super::InstallationToken;
use crate::error::AuthError;

/// Single-slot cache for an installation token.
///
/// The lock is held across the refresh so concurrent callers observe one
/// exchange instead of racing to perform several.
#[derive(Default)]
pub struct InstallationTokenCache {
    slot: Mutex<Option<InstallationToken>>,
}

impl InstallationTokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached token if still valid, otherwise run `refresh` and
    /// cache its result.
    ///
    /// A freshly exchanged token is returned even if its effective expiry has
    /// already passed; it will be replaced on the next call.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Result<InstallationToken, AuthError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<InstallationToken, AuthError>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(token) = slot.as_ref() {
            if !token.is_expired() {
                debug!(expires_at = %token.expires_at(), "Using cached installation token");
                return Ok(token.clone());
            }
            debug!(expires_at = %token.expires_at(), "Cached installation token expired");
        }

        let token = refresh().await?;
        *slot = Some(token.clone());
        Ok(token)
    }

    #[cfg(test)]
    async fn current(&self) -> Option<InstallationToken> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
