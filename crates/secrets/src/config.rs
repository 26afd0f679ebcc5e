//! Discovery configuration
//!
//! [`PluginConfiguration`] is read through a [`ConfigSource`] at the start of
//! every discovery call. Nothing is cached between calls, so edits to a
//! configuration file apply to the next discovery.

use crate::labels::{Filter, ServerSideFilter};
use crate::scope::GLOBAL;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors reading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Failed to read configuration file '{path}': {source}")]
    Io {
        /// File that was read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML
    #[error("Invalid TOML in '{path}': {source}")]
    Toml {
        /// File that was parsed
        path: PathBuf,
        /// Parser error
        #[source]
        source: toml::de::Error,
    },

    /// The configuration file is not valid JSON
    #[error("Invalid JSON in '{path}': {source}")]
    Json {
        /// File that was parsed
        path: PathBuf,
        /// Parser error
        #[source]
        source: serde_json::Error,
    },
}

/// What discovery does when one project/location unit fails
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScanPolicy {
    /// A client construction failure empties the whole result; a listing
    /// failure aborts discovery with an error.
    #[default]
    FailFast,
    /// Failed units are reported and skipped; the other units still contribute.
    BestEffort,
}

/// Settings for credential discovery
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PluginConfiguration {
    /// Comma-separated project ids
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,

    /// Comma-separated location ids, `global` when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Client-side label filter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<Filter>,

    /// Fragment ANDed onto the default list query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_side_filter: Option<ServerSideFilter>,

    /// Unit failure handling
    #[serde(default)]
    pub scan_policy: ScanPolicy,
}

impl PluginConfiguration {
    /// Configuration for a comma-separated project list
    #[must_use]
    pub fn new(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    /// Set the comma-separated location list
    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the client-side filter
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the server-side filter fragment
    #[must_use]
    pub fn with_server_side_filter(mut self, filter: impl Into<String>) -> Self {
        self.server_side_filter = Some(ServerSideFilter::new(filter));
        self
    }

    /// Set the scan policy
    #[must_use]
    pub const fn with_scan_policy(mut self, policy: ScanPolicy) -> Self {
        self.scan_policy = policy;
        self
    }

    /// Trimmed project ids. Blank entries are dropped.
    #[must_use]
    pub fn project_ids(&self) -> Vec<String> {
        split_ids(self.project.as_deref())
    }

    /// Trimmed location ids, exactly `["global"]` when none are configured
    #[must_use]
    pub fn location_ids(&self) -> Vec<String> {
        let ids = split_ids(self.location.as_deref());
        if ids.is_empty() {
            vec![GLOBAL.to_string()]
        } else {
            ids
        }
    }

    /// Overlay `overrides` onto `self`; fields set in `overrides` win.
    #[must_use]
    pub fn merge(self, overrides: Self) -> Self {
        Self {
            project: overrides.project.or(self.project),
            location: overrides.location.or(self.location),
            filter: overrides.filter.or(self.filter),
            server_side_filter: overrides.server_side_filter.or(self.server_side_filter),
            scan_policy: if overrides.scan_policy == ScanPolicy::default() {
                self.scan_policy
            } else {
                overrides.scan_policy
            },
        }
    }
}

fn split_ids(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Provides the configuration for one discovery call
pub trait ConfigSource: Send + Sync {
    /// Read the current configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the backing storage cannot be read or parsed.
    fn load(&self) -> Result<PluginConfiguration, ConfigError>;
}

impl ConfigSource for PluginConfiguration {
    fn load(&self) -> Result<PluginConfiguration, ConfigError> {
        Ok(self.clone())
    }
}

/// Configuration file, re-read on every load.
///
/// `.json` files are parsed as JSON, anything else as TOML.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    /// Read configuration from `path`
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the configuration file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<PluginConfiguration, ConfigError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;

        let is_json = self
            .path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        if is_json {
            serde_json::from_str(&contents).map_err(|source| ConfigError::Json {
                path: self.path.clone(),
                source,
            })
        } else {
            toml::from_str(&contents).map_err(|source| ConfigError::Toml {
                path: self.path.clone(),
                source,
            })
        }
    }
}

/// Optional file configuration with explicit overrides on top
#[derive(Debug, Clone, Default)]
pub struct LayeredConfigSource {
    file: Option<FileConfigSource>,
    overrides: PluginConfiguration,
}

impl LayeredConfigSource {
    /// Layer `overrides` over the optional `file`
    #[must_use]
    pub const fn new(file: Option<FileConfigSource>, overrides: PluginConfiguration) -> Self {
        Self { file, overrides }
    }
}

impl ConfigSource for LayeredConfigSource {
    fn load(&self) -> Result<PluginConfiguration, ConfigError> {
        let base = match &self.file {
            Some(file) => file.load()?,
            None => PluginConfiguration::default(),
        };
        Ok(base.merge(self.overrides.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_project_ids_are_trimmed() {
        let config = PluginConfiguration::new(" p1 , p2,, ");
        assert_eq!(config.project_ids(), vec!["p1", "p2"]);
    }

    #[test]
    fn test_empty_project() {
        assert!(PluginConfiguration::default().project_ids().is_empty());
        assert!(PluginConfiguration::new("").project_ids().is_empty());
    }

    #[test]
    fn test_location_defaults_to_global() {
        assert_eq!(PluginConfiguration::new("p").location_ids(), vec!["global"]);
        assert_eq!(
            PluginConfiguration::new("p").with_location("").location_ids(),
            vec!["global"]
        );
        assert_eq!(
            PluginConfiguration::new("p")
                .with_location("global, eu")
                .location_ids(),
            vec!["global", "eu"]
        );
    }

    #[test]
    fn test_camel_case_deserialization() {
        let json = r#"{
            "project": "p1,p2",
            "filter": {"label": "env", "value": "prod"},
            "serverSideFilter": {"filter": "labels.team=infra"},
            "scanPolicy": "bestEffort"
        }"#;
        let config: PluginConfiguration = serde_json::from_str(json).unwrap();
        assert_eq!(config.project.as_deref(), Some("p1,p2"));
        assert_eq!(config.filter, Some(Filter::new("env", "prod")));
        assert_eq!(
            config.server_side_filter,
            Some(ServerSideFilter::new("labels.team=infra"))
        );
        assert_eq!(config.scan_policy, ScanPolicy::BestEffort);
        assert_eq!(config.location, None);
    }

    #[test]
    fn test_scan_policy_default() {
        let config: PluginConfiguration = serde_json::from_str("{}").unwrap();
        assert_eq!(config.scan_policy, ScanPolicy::FailFast);
    }

    #[test]
    fn test_merge_prefers_overrides() {
        let base = PluginConfiguration::new("from-file")
            .with_location("eu")
            .with_scan_policy(ScanPolicy::BestEffort);
        let overrides = PluginConfiguration::new("from-flag");

        let merged = base.merge(overrides);
        assert_eq!(merged.project.as_deref(), Some("from-flag"));
        assert_eq!(merged.location.as_deref(), Some("eu"));
        assert_eq!(merged.scan_policy, ScanPolicy::BestEffort);
    }

    #[test]
    fn test_file_source_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
project = "p1"
location = "us-central1"

[filter]
label = "env"
value = "prod,staging"
"#
        )
        .unwrap();

        let config = FileConfigSource::new(file.path()).load().unwrap();
        assert_eq!(config.project_ids(), vec!["p1"]);
        assert_eq!(config.location_ids(), vec!["us-central1"]);
        assert_eq!(config.filter, Some(Filter::new("env", "prod,staging")));
    }

    #[test]
    fn test_file_source_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"project": "p9"}}"#).unwrap();

        let config = FileConfigSource::new(file.path()).load().unwrap();
        assert_eq!(config.project_ids(), vec!["p9"]);
    }

    #[test]
    fn test_file_source_is_reread() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "project = \"first\"").unwrap();
        let source = FileConfigSource::new(file.path());
        assert_eq!(source.load().unwrap().project_ids(), vec!["first"]);

        std::fs::write(file.path(), "project = \"second\"").unwrap();
        assert_eq!(source.load().unwrap().project_ids(), vec!["second"]);
    }

    #[test]
    fn test_file_source_missing() {
        let err = FileConfigSource::new("/nonexistent/gsmcreds.toml")
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
        assert!(err.to_string().contains("gsmcreds.toml"));
    }

    #[test]
    fn test_file_source_invalid_toml() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        write!(file, "project = ").unwrap();
        let err = FileConfigSource::new(file.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
    }

    #[test]
    fn test_layered_source_without_file() {
        let source = LayeredConfigSource::new(None, PluginConfiguration::new("p"));
        assert_eq!(source.load().unwrap().project_ids(), vec!["p"]);
    }
}
