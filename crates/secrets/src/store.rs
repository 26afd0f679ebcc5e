//! Secret store boundary
//!
//! Discovery and payload access only need two remote operations: a paged
//! secret listing and access to one secret version. Implementations live in
//! provider crates (`gsmcreds-gcp`) and in [`crate::memory`] for tests.

use crate::scope::{Scope, secret_id};
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised by a secret store or while constructing one
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport or authentication setup failed for a scope
    #[error("Failed to connect to Secret Manager for {scope}: {message}")]
    Connect {
        /// Scope the client was being built for
        scope: Scope,
        /// Error message from the transport
        message: String,
    },

    /// A remote call was rejected or failed in transit
    #[error("Secret Manager request for '{resource}' failed: {message}")]
    Request {
        /// Resource name the call targeted
        resource: String,
        /// Error message from the API or CLI
        message: String,
    },

    /// The accessed version carried no payload
    #[error("Secret version '{resource}' has no payload")]
    MissingPayload {
        /// Resource name of the version
        resource: String,
    },
}

/// A secret as returned by one list call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretDescriptor {
    /// Fully qualified resource name, e.g. `projects/p/secrets/db-pass`
    pub name: String,
    /// Label key to label value
    pub labels: HashMap<String, String>,
}

impl SecretDescriptor {
    /// Create a descriptor
    #[must_use]
    pub fn new(name: impl Into<String>, labels: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            labels,
        }
    }

    /// Secret id: the last segment of the resource name
    #[must_use]
    pub fn id(&self) -> &str {
        secret_id(&self.name)
    }
}

/// One page of a secret listing
#[derive(Debug, Clone, Default)]
pub struct SecretPage {
    /// Secrets on this page
    pub secrets: Vec<SecretDescriptor>,
    /// Token for the next page, `None` or empty when exhausted
    pub next_page_token: Option<String>,
}

/// Client for one project and location of the secret store
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch one page of secrets under `parent` matching `filter`.
    async fn list_secrets_page(
        &self,
        parent: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<SecretPage, StoreError>;

    /// Fetch the payload of the version named by `name`.
    async fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, StoreError>;

    /// List every secret under `parent` matching `filter`, following page tokens.
    async fn list_secrets(
        &self,
        parent: &str,
        filter: &str,
    ) -> Result<Vec<SecretDescriptor>, StoreError> {
        let mut secrets = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_secrets_page(parent, filter, page_token.as_deref())
                .await?;
            secrets.extend(page.secrets);

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        Ok(secrets)
    }
}

/// Builds a [`SecretStore`] scoped to one project and location.
///
/// The returned store is owned by the caller and dropped when its unit of
/// work finishes, which releases its connections.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    /// Construct a client for `scope`.
    async fn connect(&self, scope: &Scope) -> Result<Box<dyn SecretStore>, StoreError>;

    /// Connector identifier used in logs
    fn provider_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct PagedStore {
        pages: Vec<SecretPage>,
        tokens_seen: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl SecretStore for PagedStore {
        async fn list_secrets_page(
            &self,
            _parent: &str,
            _filter: &str,
            page_token: Option<&str>,
        ) -> Result<SecretPage, StoreError> {
            let mut seen = self.tokens_seen.lock().unwrap();
            seen.push(page_token.map(str::to_string));
            let index = page_token.map_or(0, |t| t.parse::<usize>().unwrap());
            Ok(self.pages[index].clone())
        }

        async fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, StoreError> {
            Err(StoreError::MissingPayload {
                resource: name.to_string(),
            })
        }
    }

    fn descriptor(name: &str) -> SecretDescriptor {
        SecretDescriptor::new(name, HashMap::new())
    }

    #[tokio::test]
    async fn test_list_secrets_follows_page_tokens() {
        let store = PagedStore {
            pages: vec![
                SecretPage {
                    secrets: vec![descriptor("projects/p/secrets/a")],
                    next_page_token: Some("1".to_string()),
                },
                SecretPage {
                    secrets: vec![
                        descriptor("projects/p/secrets/b"),
                        descriptor("projects/p/secrets/c"),
                    ],
                    next_page_token: Some("2".to_string()),
                },
                SecretPage {
                    secrets: vec![],
                    next_page_token: Some(String::new()),
                },
            ],
            tokens_seen: Mutex::new(Vec::new()),
        };

        let secrets = store.list_secrets("projects/p", "labels.x:*").await.unwrap();
        let ids: Vec<_> = secrets.iter().map(SecretDescriptor::id).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            *store.tokens_seen.lock().unwrap(),
            vec![None, Some("1".to_string()), Some("2".to_string())]
        );
    }

    #[test]
    fn test_descriptor_id() {
        assert_eq!(descriptor("projects/p/locations/eu/secrets/k").id(), "k");
    }

    #[test]
    fn test_store_error_messages() {
        let err = StoreError::Connect {
            scope: Scope::new("p1", "eu"),
            message: "dns error".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("p1/eu"));
        assert!(msg.contains("dns error"));

        let err = StoreError::MissingPayload {
            resource: "projects/p/secrets/s/versions/latest".to_string(),
        };
        assert!(err.to_string().contains("no payload"));
    }
}
