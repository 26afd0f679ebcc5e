//! Secret Manager access over the REST API

use async_trait::async_trait;
use google_secretmanager1::SecretManager;
use google_secretmanager1::api::Secret;
use google_secretmanager1::yup_oauth2::{
    ApplicationDefaultCredentialsAuthenticator, ApplicationDefaultCredentialsFlowOpts,
    authenticator::ApplicationDefaultCredentialsTypes,
};
use gsmcreds_secrets::{Scope, SecretDescriptor, SecretPage, SecretStore, StoreError};
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{Client, connect::HttpConnector};
use hyper_util::rt::TokioExecutor;

type Hub = SecretManager<HttpsConnector<HttpConnector>>;

/// Store backed by the Secret Manager REST API for one project and location.
///
/// Authenticates with application default credentials. Regional scopes talk
/// to the regional endpoint.
pub struct HttpSecretStore {
    scope: Scope,
    hub: Hub,
}

impl std::fmt::Debug for HttpSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSecretStore")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl HttpSecretStore {
    /// Build a client for `scope`.
    ///
    /// # Errors
    /// Returns [`StoreError::Connect`] if TLS roots or credentials cannot be
    /// loaded.
    pub async fn connect(scope: &Scope) -> Result<Self, StoreError> {
        let connect_error = |message: String| StoreError::Connect {
            scope: scope.clone(),
            message,
        };

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|e| connect_error(format!("Failed to load TLS roots: {e}")))?
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();
        let client = Client::builder(TokioExecutor::new()).build(connector);

        let opts = ApplicationDefaultCredentialsFlowOpts::default();
        let auth = match ApplicationDefaultCredentialsAuthenticator::builder(opts).await {
            ApplicationDefaultCredentialsTypes::InstanceMetadata(builder) => builder.build().await,
            ApplicationDefaultCredentialsTypes::ServiceAccount(builder) => builder.build().await,
        }
        .map_err(|e| connect_error(format!("Failed to load credentials: {e}")))?;

        let mut hub = SecretManager::new(client, auth);
        if let Some(url) = endpoint_url(scope) {
            tracing::debug!(%scope, url = %url, "Using regional endpoint");
            hub.base_url(url.clone());
            hub.root_url(url);
        }

        Ok(Self {
            scope: scope.clone(),
            hub,
        })
    }
}

fn endpoint_url(scope: &Scope) -> Option<String> {
    scope.endpoint().map(|endpoint| format!("https://{endpoint}/"))
}

fn descriptor(secret: Secret) -> Option<SecretDescriptor> {
    let name = secret.name?;
    Some(SecretDescriptor::new(name, secret.labels.unwrap_or_default()))
}

fn request_error(resource: &str, error: &google_secretmanager1::Error) -> StoreError {
    StoreError::Request {
        resource: resource.to_string(),
        message: error.to_string(),
    }
}

#[async_trait]
impl SecretStore for HttpSecretStore {
    async fn list_secrets_page(
        &self,
        parent: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<SecretPage, StoreError> {
        let projects = self.hub.projects();
        let result = if self.scope.location.is_global() {
            let mut call = projects.secrets_list(parent).filter(filter);
            if let Some(token) = page_token {
                call = call.page_token(token);
            }
            call.doit().await
        } else {
            let mut call = projects.locations_secrets_list(parent).filter(filter);
            if let Some(token) = page_token {
                call = call.page_token(token);
            }
            call.doit().await
        };
        let (_, response) = result.map_err(|e| request_error(parent, &e))?;

        Ok(SecretPage {
            secrets: response
                .secrets
                .unwrap_or_default()
                .into_iter()
                .filter_map(descriptor)
                .collect(),
            next_page_token: response.next_page_token,
        })
    }

    async fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let projects = self.hub.projects();
        let result = if self.scope.location.is_global() {
            projects.secrets_versions_access(name).doit().await
        } else {
            projects.locations_secrets_versions_access(name).doit().await
        };
        let (_, response) = result.map_err(|e| request_error(name, &e))?;

        response
            .payload
            .and_then(|payload| payload.data)
            .ok_or_else(|| StoreError::MissingPayload {
                resource: name.to_string(),
            })
    }
}
