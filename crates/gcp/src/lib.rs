//! Google Cloud Secret Manager store for gsmcreds
//!
//! [`GcpConnector`] implements [`gsmcreds_secrets::StoreConnector`] with two
//! transports:
//! - [`HttpSecretStore`]: REST API, used when `GOOGLE_APPLICATION_CREDENTIALS` is set
//! - [`GcloudSecretStore`]: the `gcloud` CLI otherwise

mod connector;
mod gcloud;
mod http;
mod resource;

pub use connector::{CREDENTIALS_ENV, GcpConnector, GcpMode};
pub use gcloud::GcloudSecretStore;
pub use http::HttpSecretStore;
pub use resource::VersionName;
