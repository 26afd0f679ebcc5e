//! Label conventions and filter composition
//!
//! Secrets become credentials through a small set of reserved labels. The
//! type label selects the credential kind; the others carry auxiliary fields.
//! Discovery narrows the listing twice: a server-side query evaluated by
//! Secret Manager, then a client-side label match evaluated here.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Label whose presence marks a secret as a credential; its value is the kind.
pub const TYPE: &str = "jenkins-credentials-type";

/// Username for `username-password` and `ssh-user-private-key` credentials.
pub const USERNAME: &str = "jenkins-credentials-username";

/// File name for `file` credentials.
pub const FILENAME: &str = "jenkins-credentials-filename";

/// Optional extension appended to [`FILENAME`]. Label values cannot hold dots.
pub const FILE_EXTENSION: &str = "jenkins-credentials-file-extension";

/// The label key the discovery gate looks up, lower-cased.
#[must_use]
pub fn type_key() -> String {
    TYPE.to_lowercase()
}

/// Query selecting every secret that carries any value for the type label.
#[must_use]
pub fn default_query() -> String {
    format!("labels.{}:*", type_key())
}

/// Client-side label match.
///
/// A secret passes when it carries `label` and its value is one of the
/// comma-separated entries of `value`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    /// Label key to match on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Comma-separated allowed values
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Filter {
    /// Create a filter for `label` accepting any of the comma-separated `values`
    #[must_use]
    pub fn new(label: impl Into<String>, values: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            value: Some(values.into()),
        }
    }

    /// Split `value` into the allow-list. Entries are compared verbatim.
    #[must_use]
    pub fn allowed_values(&self) -> Vec<String> {
        self.value
            .as_deref()
            .map(|v| v.split(',').map(str::to_string).collect())
            .unwrap_or_default()
    }

    /// Both label and value are configured, so the filter applies.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.label.is_some() && self.value.is_some()
    }

    /// Exact match of the label value against the allow-list
    #[must_use]
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        let Some(label) = self.label.as_deref() else {
            return true;
        };
        let allowed = self.allowed_values();
        labels
            .get(label)
            .is_some_and(|value| allowed.iter().any(|candidate| candidate == value))
    }
}

/// Fragment of the Secret Manager filter language ANDed onto [`default_query`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerSideFilter {
    /// Raw filter expression, inserted without escaping or validation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ServerSideFilter {
    /// Create a server-side filter from a raw expression
    #[must_use]
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
        }
    }
}

/// Build the list query for one discovery unit.
///
/// Always derived from the default and the optional fragment, so every unit
/// of a scan sends the same expression.
#[must_use]
pub fn compose_query(server_side: Option<&ServerSideFilter>) -> String {
    let default = default_query();
    match server_side.and_then(|f| f.filter.as_deref()) {
        Some(fragment) => format!("{default} AND ({fragment})"),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_query() {
        assert_eq!(default_query(), "labels.jenkins-credentials-type:*");
    }

    #[test]
    fn test_compose_query_without_fragment() {
        assert_eq!(compose_query(None), default_query());
        assert_eq!(
            compose_query(Some(&ServerSideFilter::default())),
            default_query()
        );
    }

    #[test]
    fn test_compose_query_with_fragment() {
        let filter = ServerSideFilter::new("labels.team=infra");
        assert_eq!(
            compose_query(Some(&filter)),
            "labels.jenkins-credentials-type:* AND (labels.team=infra)"
        );
    }

    #[test]
    fn test_compose_query_is_stable_across_calls() {
        let filter = ServerSideFilter::new("name:prod");
        let first = compose_query(Some(&filter));
        let second = compose_query(Some(&filter));
        assert_eq!(first, second);
        assert_eq!(first.matches("AND").count(), 1);
    }

    #[test]
    fn test_filter_allowed_values() {
        let filter = Filter::new("env", "prod,staging");
        assert_eq!(filter.allowed_values(), vec!["prod", "staging"]);
        assert!(Filter::default().allowed_values().is_empty());
    }

    #[test]
    fn test_filter_matches_allowed_value() {
        let filter = Filter::new("env", "prod,staging");
        assert!(filter.matches(&labels(&[("env", "staging")])));
        assert!(!filter.matches(&labels(&[("env", "dev")])));
    }

    #[test]
    fn test_filter_requires_label() {
        let filter = Filter::new("env", "prod");
        assert!(!filter.matches(&labels(&[("team", "prod")])));
    }

    #[test]
    fn test_filter_does_not_normalize() {
        let filter = Filter::new("env", "prod, staging");
        assert!(!filter.matches(&labels(&[("env", "staging")])));
        assert!(filter.matches(&labels(&[("env", " staging")])));
        assert!(!filter.matches(&labels(&[("env", "PROD")])));
    }

    #[test]
    fn test_filter_is_active() {
        assert!(Filter::new("env", "prod").is_active());
        assert!(!Filter::default().is_active());
        let label_only = Filter {
            label: Some("env".to_string()),
            value: None,
        };
        assert!(!label_only.is_active());
    }

    #[test]
    fn test_filter_deserialization() {
        let filter: Filter = serde_json::from_str(r#"{"label":"env","value":"prod"}"#).unwrap();
        assert_eq!(filter, Filter::new("env", "prod"));
    }
}
