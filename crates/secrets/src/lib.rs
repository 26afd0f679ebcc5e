//! Credential discovery from Secret Manager
//!
//! Secrets labelled with [`labels::TYPE`] are discovered across a configured
//! set of projects and locations and turned into typed [`Credential`]s. A
//! credential carries only its identity and a [`SecretGetter`]; the payload is
//! fetched from the store each time the value is read.
//!
//! # Discovery
//!
//! ```ignore
//! use gsmcreds_secrets::{CredentialsSupplier, PluginConfiguration};
//!
//! let config = PluginConfiguration::new("prod-project").with_location("global,europe-west1");
//! let supplier = CredentialsSupplier::new(Arc::new(config), connector);
//!
//! for credential in supplier.credentials().await? {
//!     println!("{} ({})", credential.id(), credential.kind());
//! }
//! ```
//!
//! Store implementations live in separate crates:
//! - `gsmcreds-gcp`: Google Cloud Secret Manager over HTTP or the `gcloud` CLI

pub mod config;
pub mod credential;
mod getter;
pub mod labels;
pub mod memory;
mod scope;
mod store;
mod supplier;
mod types;

pub use config::{
    ConfigError, ConfigSource, FileConfigSource, LayeredConfigSource, PluginConfiguration,
    ScanPolicy,
};
pub use credential::{Credential, CredentialKind, CredentialSummary};
pub use getter::{COULD_NOT_RETRIEVE, CredentialsUnavailable, ScopedSecretGetter, SecretGetter};
pub use labels::{Filter, ServerSideFilter};
pub use scope::{GLOBAL, LATEST, Location, Scope, secret_id};
pub use store::{SecretDescriptor, SecretPage, SecretStore, StoreConnector, StoreError};
pub use supplier::{CredentialsSupplier, DiscoveryError, DiscoveryReport, UnitFailure};
pub use types::{SecureBytes, SecureSecret};
