//! Credential discovery across projects and locations
//!
//! [`CredentialsSupplier::discover`] walks the configured project × location
//! matrix one unit at a time. Each unit gets its own store client, a freshly
//! composed list query, and two client-side gates (the configured label
//! filter, then the type label) before surviving secrets reach the
//! credential factory.

use crate::config::{ConfigError, ConfigSource, PluginConfiguration, ScanPolicy};
use crate::credential::{self, Credential};
use crate::getter::{COULD_NOT_RETRIEVE, ScopedSecretGetter, SecretGetter};
use crate::labels::{self, Filter};
use crate::scope::Scope;
use crate::store::{SecretDescriptor, StoreConnector, StoreError};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Discovery could not produce a result
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Configuration could not be read
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    /// Listing secrets failed for a unit under [`ScanPolicy::FailFast`]
    #[error("Failed to list secrets for {scope}: {source}")]
    List {
        /// Unit being listed
        scope: Scope,
        /// Store failure
        #[source]
        source: StoreError,
    },
}

/// A unit that contributed nothing because its store failed
#[derive(Debug)]
pub struct UnitFailure {
    /// Project and location of the unit
    pub scope: Scope,
    /// What went wrong
    pub error: StoreError,
}

/// Credentials found by one discovery call, plus the units that failed
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    credentials: Vec<Credential>,
    failures: Vec<UnitFailure>,
    aborted: bool,
}

impl DiscoveryReport {
    /// Discovered credentials
    #[must_use]
    pub fn credentials(&self) -> &[Credential] {
        &self.credentials
    }

    /// Units that failed and were skipped or caused the abort
    #[must_use]
    pub fn failures(&self) -> &[UnitFailure] {
        &self.failures
    }

    /// Whether a fail-fast abort discarded the result
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Take the credentials
    #[must_use]
    pub fn into_credentials(self) -> Vec<Credential> {
        self.credentials
    }

    fn abort(mut self, failure: UnitFailure) -> Self {
        self.credentials.clear();
        self.failures.push(failure);
        self.aborted = true;
        self
    }
}

enum UnitError {
    Connect(StoreError),
    List(StoreError),
}

/// Discovers credentials from labelled secrets
pub struct CredentialsSupplier {
    config: Arc<dyn ConfigSource>,
    connector: Arc<dyn StoreConnector>,
}

impl std::fmt::Debug for CredentialsSupplier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialsSupplier")
            .field("provider", &self.connector.provider_name())
            .finish_non_exhaustive()
    }
}

impl CredentialsSupplier {
    /// Create a supplier reading `config` and connecting through `connector`
    #[must_use]
    pub fn new(config: Arc<dyn ConfigSource>, connector: Arc<dyn StoreConnector>) -> Self {
        Self { config, connector }
    }

    /// Discover credentials and return them without the failure report.
    ///
    /// # Errors
    /// See [`CredentialsSupplier::discover`].
    pub async fn credentials(&self) -> Result<Vec<Credential>, DiscoveryError> {
        self.discover().await.map(DiscoveryReport::into_credentials)
    }

    /// Run one discovery pass.
    ///
    /// Payloads are never fetched here; each credential fetches its own value
    /// when read.
    ///
    /// # Errors
    /// Returns [`DiscoveryError::Config`] if the configuration cannot be read,
    /// and [`DiscoveryError::List`] if a listing fails under
    /// [`ScanPolicy::FailFast`].
    #[tracing::instrument(skip(self), fields(provider = self.connector.provider_name()))]
    pub async fn discover(&self) -> Result<DiscoveryReport, DiscoveryError> {
        let config = self.config.load()?;
        let projects = config.project_ids();
        if projects.is_empty() {
            tracing::debug!("No projects configured");
            return Ok(DiscoveryReport::default());
        }
        let locations = config.location_ids();

        let mut report = DiscoveryReport::default();
        let mut scanned = HashSet::new();

        for project in &projects {
            for location in &locations {
                let scope = Scope::new(project.as_str(), location);
                if !scanned.insert(scope.clone()) {
                    continue;
                }

                match self.scan_unit(&scope, &config).await {
                    Ok(credentials) => report.credentials.extend(credentials),
                    Err(UnitError::Connect(error)) => {
                        tracing::warn!(%scope, %error, "{}", COULD_NOT_RETRIEVE);
                        let failure = UnitFailure { scope, error };
                        if config.scan_policy == ScanPolicy::FailFast {
                            return Ok(report.abort(failure));
                        }
                        report.failures.push(failure);
                    }
                    Err(UnitError::List(error)) => {
                        if config.scan_policy == ScanPolicy::FailFast {
                            return Err(DiscoveryError::List {
                                scope,
                                source: error,
                            });
                        }
                        tracing::warn!(%scope, %error, "Skipping unit after listing failure");
                        report.failures.push(UnitFailure { scope, error });
                    }
                }
            }
        }

        tracing::debug!(
            credentials = report.credentials.len(),
            failures = report.failures.len(),
            "Discovery finished"
        );
        Ok(report)
    }

    /// Scan one project/location. The store client is dropped on return.
    async fn scan_unit(
        &self,
        scope: &Scope,
        config: &PluginConfiguration,
    ) -> Result<Vec<Credential>, UnitError> {
        let store = self
            .connector
            .connect(scope)
            .await
            .map_err(UnitError::Connect)?;

        let query = labels::compose_query(config.server_side_filter.as_ref());
        tracing::info!(
            filter = %query,
            project = %scope.project,
            location = %scope.location,
            "Listing secrets"
        );

        let secrets = store
            .list_secrets(&scope.parent(), &query)
            .await
            .map_err(UnitError::List)?;

        let filter = config.filter.as_ref().filter(|f| f.is_active());
        let getter: Arc<dyn SecretGetter> = Arc::new(ScopedSecretGetter::new(
            scope.clone(),
            Arc::clone(&self.connector),
        ));

        let mut seen = HashSet::new();
        let mut credentials = Vec::new();
        for secret in &secrets {
            if !admit(secret, filter) || !seen.insert(secret.id()) {
                continue;
            }

            if let Some(credential) = credential::build(
                secret.id(),
                &scope.project,
                scope.location.as_str(),
                &secret.labels,
                Arc::clone(&getter),
            ) {
                credentials.push(credential);
            }
        }

        Ok(credentials)
    }
}

/// Client-side gates: the configured label filter, then the type label.
fn admit(secret: &SecretDescriptor, filter: Option<&Filter>) -> bool {
    if let Some(filter) = filter
        && !filter.matches(&secret.labels)
    {
        tracing::info!(secret = %secret.name, "Secret does not match provided filter");
        return false;
    }

    secret.labels.contains_key(&labels::type_key())
}
