//! Secret Manager access through the `gcloud` CLI

use crate::resource::VersionName;
use async_trait::async_trait;
use gsmcreds_secrets::{Scope, SecretDescriptor, SecretPage, SecretStore, StoreError};
use serde::Deserialize;
use std::collections::HashMap;
use tokio::process::Command;

/// One entry of `gcloud secrets list --format json`
#[derive(Debug, Deserialize)]
struct ListedSecret {
    name: String,
    #[serde(default)]
    labels: HashMap<String, String>,
}

/// Store that shells out to `gcloud` for one project and location.
///
/// `gcloud` drains the listing itself, so every listing is a single page.
#[derive(Debug, Clone)]
pub struct GcloudSecretStore {
    scope: Scope,
}

impl GcloudSecretStore {
    /// Create a store for `scope`
    #[must_use]
    pub const fn new(scope: Scope) -> Self {
        Self { scope }
    }

    fn location_args(scope: &Scope) -> Vec<String> {
        if scope.location.is_global() {
            Vec::new()
        } else {
            vec!["--location".to_string(), scope.location.to_string()]
        }
    }

    fn list_args(&self, filter: &str) -> Vec<String> {
        let mut args = vec![
            "secrets".to_string(),
            "list".to_string(),
            "--project".to_string(),
            self.scope.project.clone(),
            "--filter".to_string(),
            filter.to_string(),
            "--format".to_string(),
            "json".to_string(),
        ];
        args.extend(Self::location_args(&self.scope));
        args
    }

    fn access_args(version: &VersionName) -> Vec<String> {
        let mut args = vec![
            "secrets".to_string(),
            "versions".to_string(),
            "access".to_string(),
            version.version.clone(),
            "--secret".to_string(),
            version.secret.clone(),
            "--project".to_string(),
            version.scope.project.clone(),
        ];
        args.extend(Self::location_args(&version.scope));
        args
    }

    async fn run(resource: &str, args: &[String]) -> Result<Vec<u8>, StoreError> {
        let output = Command::new("gcloud")
            .args(args)
            .output()
            .await
            .map_err(|e| StoreError::Request {
                resource: resource.to_string(),
                message: format!("Failed to execute gcloud CLI: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(StoreError::Request {
                resource: resource.to_string(),
                message: format!("gcloud CLI failed: {}", stderr.trim()),
            });
        }

        Ok(output.stdout)
    }

    fn parse_listing(resource: &str, stdout: &[u8]) -> Result<Vec<SecretDescriptor>, StoreError> {
        let listed: Vec<ListedSecret> =
            serde_json::from_slice(stdout).map_err(|e| StoreError::Request {
                resource: resource.to_string(),
                message: format!("Unexpected gcloud output: {e}"),
            })?;

        Ok(listed
            .into_iter()
            .map(|secret| SecretDescriptor::new(secret.name, secret.labels))
            .collect())
    }
}

#[async_trait]
impl SecretStore for GcloudSecretStore {
    async fn list_secrets_page(
        &self,
        parent: &str,
        filter: &str,
        _page_token: Option<&str>,
    ) -> Result<SecretPage, StoreError> {
        let stdout = Self::run(parent, &self.list_args(filter)).await?;
        Ok(SecretPage {
            secrets: Self::parse_listing(parent, &stdout)?,
            next_page_token: None,
        })
    }

    async fn access_secret_version(&self, name: &str) -> Result<Vec<u8>, StoreError> {
        let version = VersionName::parse(name).ok_or_else(|| StoreError::Request {
            resource: name.to_string(),
            message: "Invalid secret version resource name".to_string(),
        })?;
        Self::run(name, &Self::access_args(&version)).await
    }
}
