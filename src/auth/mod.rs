//! GitLab credential storage.
//!
//! Persists the instance domain and access token as one JSON value under a
//! fixed settings key. Loading is forgiving: a missing, malformed, or invalid
//! stored value reads as logged out, while real storage failures propagate.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::store::{SettingsStore, StorageError};

/// Settings key holding the credential.
pub const AUTH_KEY: &str = "auth";

/// Minimum length for each credential field.
const MIN_FIELD_LEN: usize = 2;

/// Errors from validating or persisting credentials.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A credential field failed validation.
    #[error("{field} must be at least 2 characters")]
    Invalid { field: &'static str },

    /// The underlying settings store failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// The credential could not be serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A GitLab instance domain and its access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthState {
    pub domain: String,
    pub token: String,
}

impl AuthState {
    /// Check both fields meet the minimum length. No trimming is applied,
    /// so whitespace counts toward the length.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.domain.chars().count() < MIN_FIELD_LEN {
            return Err(AuthError::Invalid { field: "domain" });
        }
        if self.token.chars().count() < MIN_FIELD_LEN {
            return Err(AuthError::Invalid { field: "token" });
        }
        Ok(())
    }
}

/// Credential store backed by a [`SettingsStore`].
#[derive(Clone)]
pub struct AuthStore {
    storage: Arc<dyn SettingsStore>,
}

impl AuthStore {
    pub fn new(storage: Arc<dyn SettingsStore>) -> Self {
        Self { storage }
    }

    /// Load the stored credential.
    ///
    /// Returns `Ok(None)` when nothing is stored, or when the stored value is
    /// malformed or fails validation; those cases are logged and treated as
    /// logged out rather than surfaced.
    pub async fn load(&self) -> Result<Option<AuthState>, AuthError> {
        let Some(raw) = self.storage.get(AUTH_KEY).await? else {
            return Ok(None);
        };

        let state: AuthState = match serde_json::from_str(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!(error = %e, "Stored auth state is malformed, treating as logged out");
                return Ok(None);
            }
        };

        if let Err(e) = state.validate() {
            warn!(error = %e, "Stored auth state is invalid, treating as logged out");
            return Ok(None);
        }

        Ok(Some(state))
    }

    /// Validate and persist the credential.
    pub async fn save(&self, state: &AuthState) -> Result<(), AuthError> {
        state.validate()?;
        let raw = serde_json::to_string(state)?;
        self.storage.put(AUTH_KEY, &raw).await?;
        Ok(())
    }

    /// Remove the stored credential. Succeeds when nothing is stored.
    pub async fn clear(&self) -> Result<(), AuthError> {
        self.storage.remove(AUTH_KEY).await?;
        Ok(())
    }
}
