//! Connector that picks the HTTP or `gcloud` transport

use crate::gcloud::GcloudSecretStore;
use crate::http::HttpSecretStore;
use async_trait::async_trait;
use gsmcreds_secrets::{Scope, SecretStore, StoreConnector, StoreError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environment variable whose presence enables HTTP mode
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

/// Transport used to reach Secret Manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GcpMode {
    /// REST API with application default credentials
    Http,
    /// The `gcloud` CLI
    Cli,
}

impl GcpMode {
    /// HTTP if service account credentials are configured, otherwise CLI
    #[must_use]
    pub fn detect() -> Self {
        if std::env::var(CREDENTIALS_ENV).is_ok() {
            Self::Http
        } else {
            Self::Cli
        }
    }
}

impl fmt::Display for GcpMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Cli => write!(f, "cli"),
        }
    }
}

/// Builds Secret Manager stores
///
/// Mode is auto-negotiated based on environment:
/// - If `GOOGLE_APPLICATION_CREDENTIALS` is set → HTTP mode
/// - Otherwise → CLI mode (uses `gcloud` CLI)
#[derive(Clone, Copy)]
pub struct GcpConnector {
    mode: GcpMode,
}

impl fmt::Debug for GcpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GcpConnector")
            .field("mode", &self.mode.to_string())
            .finish()
    }
}

impl Default for GcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl GcpConnector {
    /// Create a connector with auto-detected mode
    #[must_use]
    pub fn new() -> Self {
        Self::with_mode(GcpMode::detect())
    }

    /// Create a connector with a fixed mode
    #[must_use]
    pub const fn with_mode(mode: GcpMode) -> Self {
        Self { mode }
    }

    /// Transport in use
    #[must_use]
    pub const fn mode(&self) -> GcpMode {
        self.mode
    }
}

#[async_trait]
impl StoreConnector for GcpConnector {
    async fn connect(&self, scope: &Scope) -> Result<Box<dyn SecretStore>, StoreError> {
        tracing::debug!(%scope, mode = %self.mode, "Connecting to Secret Manager");
        match self.mode {
            GcpMode::Http => Ok(Box::new(HttpSecretStore::connect(scope).await?)),
            GcpMode::Cli => Ok(Box::new(GcloudSecretStore::new(scope.clone()))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "gcp"
    }
}
