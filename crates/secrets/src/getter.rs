//! Deferred secret payload access
//!
//! Credentials carry a [`SecretGetter`] instead of their value. The store is
//! only contacted when a consumer reads the value, and every read contacts it
//! again: nothing is memoized.

use crate::scope::Scope;
use crate::store::{StoreConnector, StoreError};
use crate::types::{SecureBytes, SecureSecret};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Message attached to every unavailable credential
pub const COULD_NOT_RETRIEVE: &str = "Could not retrieve credential from Secret Manager";

/// A credential's value could not be fetched when it was read
#[derive(Debug, Error)]
#[error("{message} ({property} of '{id}'): {source}")]
pub struct CredentialsUnavailable {
    /// Which property of the credential was being read
    pub property: String,
    /// Secret id the read targeted
    pub id: String,
    /// Human readable summary
    pub message: String,
    /// Underlying store failure
    #[source]
    pub source: StoreError,
}

impl CredentialsUnavailable {
    /// Wrap a store failure for the `secret` property of `id`
    #[must_use]
    pub fn secret(id: impl Into<String>, source: StoreError) -> Self {
        Self {
            property: "secret".to_string(),
            id: id.into(),
            message: COULD_NOT_RETRIEVE.to_string(),
            source,
        }
    }
}

/// Fetches the latest payload of a secret on demand
#[async_trait]
pub trait SecretGetter: Send + Sync {
    /// Latest payload decoded as UTF-8 text
    async fn secret_string(&self, id: &str) -> Result<SecureSecret, CredentialsUnavailable>;

    /// Latest payload as raw bytes
    async fn secret_bytes(&self, id: &str) -> Result<SecureBytes, CredentialsUnavailable>;
}

/// [`SecretGetter`] bound to one project and location.
///
/// Each fetch builds a fresh store client for the scope, exactly as discovery
/// does, and drops it once the payload is read.
#[derive(Clone)]
pub struct ScopedSecretGetter {
    scope: Scope,
    connector: Arc<dyn StoreConnector>,
}

impl std::fmt::Debug for ScopedSecretGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScopedSecretGetter")
            .field("scope", &self.scope)
            .field("provider", &self.connector.provider_name())
            .finish()
    }
}

impl ScopedSecretGetter {
    /// Bind a getter to `scope`
    #[must_use]
    pub fn new(scope: Scope, connector: Arc<dyn StoreConnector>) -> Self {
        Self { scope, connector }
    }

    /// Scope this getter reads from
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    async fn payload(&self, id: &str) -> Result<Vec<u8>, CredentialsUnavailable> {
        let version = self.scope.latest_version_name(id);
        tracing::debug!(secret = %id, scope = %self.scope, "Accessing latest secret version");

        let store = self
            .connector
            .connect(&self.scope)
            .await
            .map_err(|e| CredentialsUnavailable::secret(id, e))?;

        store
            .access_secret_version(&version)
            .await
            .map_err(|e| CredentialsUnavailable::secret(id, e))
    }
}

#[async_trait]
impl SecretGetter for ScopedSecretGetter {
    async fn secret_string(&self, id: &str) -> Result<SecureSecret, CredentialsUnavailable> {
        let payload = self.payload(id).await?;
        Ok(SecureSecret::from_utf8_lossy(&payload))
    }

    async fn secret_bytes(&self, id: &str) -> Result<SecureBytes, CredentialsUnavailable> {
        self.payload(id).await.map(SecureBytes::new)
    }
}
