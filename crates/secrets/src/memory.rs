//! In-memory secret store
//!
//! A [`StoreConnector`] backed by a map, recording every connection, listing
//! and version access so callers can assert on store traffic. Filter
//! expressions are recorded, not evaluated.

use crate::scope::Scope;
use crate::store::{SecretDescriptor, SecretPage, SecretStore, StoreConnector, StoreError};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MemoryState {
    secrets: HashMap<String, Vec<SecretDescriptor>>,
    payloads: HashMap<String, Vec<u8>>,
    failing_connects: HashSet<Scope>,
    failing_lists: HashSet<String>,
    page_size: Option<usize>,
    connections: Vec<Scope>,
    listings: Vec<(String, String)>,
    accessed: Vec<String>,
    open_stores: usize,
}

/// Connector handing out stores over shared in-memory state
#[derive(Debug, Clone, Default)]
pub struct InMemoryConnector {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryConnector {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a secret under the parent of `scope`
    pub fn add_secret(&self, scope: &Scope, id: &str, labels: &[(&str, &str)]) {
        let labels = labels
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let descriptor = SecretDescriptor::new(scope.secret_name(id), labels);
        self.state()
            .secrets
            .entry(scope.parent())
            .or_default()
            .push(descriptor);
    }

    /// Set the payload returned for a version resource name
    pub fn add_payload(&self, version_name: &str, payload: Vec<u8>) {
        self.state()
            .payloads
            .insert(version_name.to_string(), payload);
    }

    /// Make client construction fail for `scope`
    pub fn fail_connect(&self, scope: Scope) {
        self.state().failing_connects.insert(scope);
    }

    /// Make listing fail for the parent of `scope`
    pub fn fail_list(&self, scope: &Scope) {
        self.state().failing_lists.insert(scope.parent());
    }

    /// Split listings into pages of `size` secrets
    pub fn set_page_size(&self, size: usize) {
        self.state().page_size = Some(size.max(1));
    }

    /// Scopes passed to `connect`, in order
    #[must_use]
    pub fn connections(&self) -> Vec<Scope> {
        self.state().connections.clone()
    }

    /// `(parent, filter)` of every page request, in order
    #[must_use]
    pub fn listings(&self) -> Vec<(String, String)> {
        self.state().listings.clone()
    }

    /// Version names accessed, in order
    #[must_use]
    pub fn accessed(&self) -> Vec<String> {
        self.state().accessed.clone()
    }

    /// Stores handed out and not yet dropped
    #[must_use]
    pub fn open_stores(&self) -> usize {
        self.state().open_stores
    }
}

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, scope: &Scope) -> Result<Box<dyn SecretStore>, StoreError> {
        let mut state = self.state();
        state.connections.push(scope.clone());
        if state.failing_connects.contains(scope) {
            return Err(StoreError::Connect {
                scope: scope.clone(),
                message: "connection refused".to_string(),
            });
        }
        state.open_stores += 1;
        drop(state);

        Ok(Box::new(InMemoryStore {
            state: Arc::clone(&self.state),
        }))
    }

    fn provider_name(&self) -> &'static str {
        "memory"
    }
}

struct InMemoryStore {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStore {
    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for InMemoryStore {
    fn drop(&mut self) {
        let mut state = self.state();
        state.open_stores = state.open_stores.saturating_sub(1);
    }
}

#[async_trait]
impl SecretStore for InMemoryStore {
    async fn list_secrets_page(
        &self,
        parent: &str,
        filter: &str,
        page_token: Option<&str>,
    ) -> Result<SecretPage, StoreError> {
        let mut state = self.state();
        state
            .listings
            .push((parent.to_string(), filter.to_string()));
        if state.failing_lists.contains(parent) {
            return Err(StoreError::Request {
                resource: parent.to_string(),
                message: "permission denied".to_string(),
            });
        }

        let all = state.secrets.get(parent).cloned().unwrap_or_default();
        let start = page_token
            .and_then(|t| t.parse::<usize>().ok())
            .unwrap_or(0);
        let size = state.page_size.unwrap_or(usize::MAX);
        let end = start.saturating_add(size).min(all.len());
        let next_page_token = (end < all.len()).then(|| end.to_string());

        Ok(SecretPage {
            secrets: all.get(start..end).map(<[_]>::to_vec).unwrap_or_default(),
            next_page_token,
        })
    }

    async fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let mut state = self.state();
        state.accessed.push(name.to_string());
        state
            .payloads
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::MissingPayload {
                resource: name.to_string(),
            })
    }
}
