//! `list` and `show` command implementations

use crate::cli::CliError;
use gsmcreds_secrets::{Credential, CredentialSummary, CredentialsSupplier, DiscoveryReport};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FailureOutput {
    project: String,
    location: String,
    error: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListOutput {
    credentials: Vec<CredentialSummary>,
    failures: Vec<FailureOutput>,
    aborted: bool,
}

impl From<&DiscoveryReport> for ListOutput {
    fn from(report: &DiscoveryReport) -> Self {
        Self {
            credentials: report.credentials().iter().map(Credential::summary).collect(),
            failures: report
                .failures()
                .iter()
                .map(|failure| FailureOutput {
                    project: failure.scope.project.clone(),
                    location: failure.scope.location.to_string(),
                    error: failure.error.to_string(),
                })
                .collect(),
            aborted: report.is_aborted(),
        }
    }
}

fn write_error(e: &std::io::Error) -> CliError {
    CliError::other(format!("Failed to write output: {e}"))
}

/// Discover credentials and write their summaries as one JSON document.
///
/// # Errors
/// Returns [`CliError`] if discovery fails or output cannot be written.
#[tracing::instrument(skip_all)]
pub async fn execute_list(
    supplier: &CredentialsSupplier,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let report = supplier.discover().await?;
    let output = ListOutput::from(&report);

    serde_json::to_writer_pretty(&mut *out, &output)
        .map_err(|e| CliError::other(format!("Failed to serialize output: {e}")))?;
    writeln!(out).map_err(|e| write_error(&e))?;
    Ok(())
}

/// Discover credentials and write the value of the one named `id`.
///
/// Text kinds are written with a trailing newline; certificates and files
/// are written as raw bytes.
///
/// # Errors
/// Returns [`CliError`] if discovery aborts, no credential has that id, or
/// the value cannot be fetched.
#[tracing::instrument(skip(supplier, out))]
pub async fn execute_show(
    supplier: &CredentialsSupplier,
    id: &str,
    out: &mut impl Write,
) -> Result<(), CliError> {
    let report = supplier.discover().await?;
    if report.is_aborted()
        && let Some(failure) = report.failures().first()
    {
        return Err(CliError::store_with_help(
            format!("Discovery aborted at {}: {}", failure.scope, failure.error),
            "Use --best-effort to skip projects or locations that cannot be reached",
        ));
    }

    let mut matches = report.credentials().iter().filter(|c| c.id() == id);
    let credential = matches.next().ok_or_else(|| {
        CliError::config_with_help(
            format!("No credential named '{id}' was discovered"),
            "Run `gsmcreds list` to see discovered credentials",
        )
    })?;
    if matches.next().is_some() {
        tracing::warn!(
            id,
            project = credential.project(),
            location = %credential.location(),
            "Credential id found in several places, showing the first"
        );
    }

    let written = match credential {
        Credential::SecretText(c) => writeln!(out, "{}", c.secret().await?.expose()),
        Credential::UsernamePassword(c) => writeln!(out, "{}", c.password().await?.expose()),
        Credential::SshUserPrivateKey(c) => writeln!(out, "{}", c.private_key().await?.expose()),
        Credential::Certificate(c) => out.write_all(c.key_store_bytes().await?.expose()),
        Credential::File(c) => out.write_all(c.content().await?.expose()),
    };
    written.map_err(|e| write_error(&e))?;
    out.flush().map_err(|e| write_error(&e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use gsmcreds_secrets::labels;
    use gsmcreds_secrets::memory::InMemoryConnector;
    use gsmcreds_secrets::{PluginConfiguration, ScanPolicy, Scope};
    use std::sync::Arc;

    fn supplier(config: PluginConfiguration, connector: &Arc<InMemoryConnector>) -> CredentialsSupplier {
        CredentialsSupplier::new(Arc::new(config), connector.clone())
    }

    #[tokio::test]
    async fn test_list_writes_summaries_without_values() {
        let connector = Arc::new(InMemoryConnector::new());
        connector.add_secret(&Scope::global("p1"), "db-pass", &[(labels::TYPE, "string")]);
        connector.add_payload(
            "projects/p1/secrets/db-pass/versions/latest",
            b"hunter2".to_vec(),
        );

        let mut out = Vec::new();
        execute_list(&supplier(PluginConfiguration::new("p1"), &connector), &mut out)
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["credentials"][0]["id"], "db-pass");
        assert_eq!(json["credentials"][0]["kind"], "string");
        assert_eq!(json["aborted"], false);
        assert!(!String::from_utf8(out).unwrap().contains("hunter2"));
        assert!(connector.accessed().is_empty());
    }

    #[tokio::test]
    async fn test_list_reports_tolerated_failures() {
        let connector = Arc::new(InMemoryConnector::new());
        connector.add_secret(&Scope::global("p1"), "a", &[(labels::TYPE, "string")]);
        connector.fail_connect(Scope::new("p1", "eu"));

        let config = PluginConfiguration::new("p1")
            .with_location("global,eu")
            .with_scan_policy(ScanPolicy::BestEffort);
        let mut out = Vec::new();
        execute_list(&supplier(config, &connector), &mut out)
            .await
            .unwrap();

        let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(json["credentials"].as_array().unwrap().len(), 1);
        assert_eq!(json["failures"][0]["location"], "eu");
        assert_eq!(json["aborted"], false);
    }

    #[tokio::test]
    async fn test_show_prints_text_value() {
        let connector = Arc::new(InMemoryConnector::new());
        connector.add_secret(
            &Scope::global("p1"),
            "deploy",
            &[(labels::TYPE, "username-password"), (labels::USERNAME, "ci")],
        );
        connector.add_payload(
            "projects/p1/secrets/deploy/versions/latest",
            b"s3cret".to_vec(),
        );

        let mut out = Vec::new();
        execute_show(&supplier(PluginConfiguration::new("p1"), &connector), "deploy", &mut out)
            .await
            .unwrap();

        assert_eq!(out, b"s3cret\n");
        assert_eq!(
            connector.accessed(),
            vec!["projects/p1/secrets/deploy/versions/latest"]
        );
    }

    #[tokio::test]
    async fn test_show_writes_file_bytes_raw() {
        let connector = Arc::new(InMemoryConnector::new());
        connector.add_secret(
            &Scope::new("p1", "eu"),
            "kubeconfig",
            &[(labels::TYPE, "file"), (labels::FILENAME, "config")],
        );
        connector.add_payload(
            "projects/p1/locations/eu/secrets/kubeconfig/versions/latest",
            vec![0, 159, 146, 150],
        );

        let config = PluginConfiguration::new("p1").with_location("eu");
        let mut out = Vec::new();
        execute_show(&supplier(config, &connector), "kubeconfig", &mut out)
            .await
            .unwrap();

        assert_eq!(out, vec![0, 159, 146, 150]);
    }

    #[tokio::test]
    async fn test_show_unknown_id_is_config_error() {
        let connector = Arc::new(InMemoryConnector::new());
        let mut out = Vec::new();
        let err = execute_show(&supplier(PluginConfiguration::new("p1"), &connector), "nope", &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Config { .. }));
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_show_missing_payload_is_store_error() {
        let connector = Arc::new(InMemoryConnector::new());
        connector.add_secret(&Scope::global("p1"), "db-pass", &[(labels::TYPE, "string")]);

        let mut out = Vec::new();
        let err = execute_show(&supplier(PluginConfiguration::new("p1"), &connector), "db-pass", &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Store { .. }));
    }

    #[tokio::test]
    async fn test_show_after_fail_fast_abort() {
        let connector = Arc::new(InMemoryConnector::new());
        connector.fail_connect(Scope::global("p1"));

        let mut out = Vec::new();
        let err = execute_show(&supplier(PluginConfiguration::new("p1"), &connector), "db-pass", &mut out)
            .await
            .unwrap_err();

        assert!(matches!(err, CliError::Store { .. }));
        assert!(err.to_string().contains("p1/global"));
    }
}
