//! Discovery units and Secret Manager resource names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Location id meaning "no regional pinning".
pub const GLOBAL: &str = "global";

/// Version alias every payload fetch targets
pub const LATEST: &str = "latest";

/// Where a secret lives: the global service or a regional endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Location {
    /// Default, regional-agnostic endpoint
    Global,
    /// Location-pinned endpoint, e.g. `europe-west1`
    Regional(String),
}

impl Location {
    /// Parse a configured location id. `"global"` maps to [`Location::Global`].
    #[must_use]
    pub fn parse(id: &str) -> Self {
        let id = id.trim();
        if id == GLOBAL {
            Self::Global
        } else {
            Self::Regional(id.to_string())
        }
    }

    /// The location id as configured
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Global => GLOBAL,
            Self::Regional(id) => id,
        }
    }

    /// Whether this is the global location
    #[must_use]
    pub const fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for Location {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<Location> for String {
    fn from(value: Location) -> Self {
        value.as_str().to_string()
    }
}

/// One discovery unit: a project paired with a location
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    /// GCP project id
    pub project: String,
    /// Location the secrets are read from
    pub location: Location,
}

impl Scope {
    /// Create a scope from configured ids
    #[must_use]
    pub fn new(project: impl Into<String>, location: &str) -> Self {
        Self {
            project: project.into().trim().to_string(),
            location: Location::parse(location),
        }
    }

    /// Scope on the global endpoint
    #[must_use]
    pub fn global(project: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            location: Location::Global,
        }
    }

    /// Regional API endpoint (`host:port`), `None` for the default endpoint
    #[must_use]
    pub fn endpoint(&self) -> Option<String> {
        match &self.location {
            Location::Global => None,
            Location::Regional(id) => Some(format!("secretmanager.{id}.rep.googleapis.com:443")),
        }
    }

    /// Resource parent secrets are listed under
    #[must_use]
    pub fn parent(&self) -> String {
        match &self.location {
            Location::Global => format!("projects/{}", self.project),
            Location::Regional(id) => format!("projects/{}/locations/{id}", self.project),
        }
    }

    /// Resource name of a secret in this scope
    #[must_use]
    pub fn secret_name(&self, id: &str) -> String {
        format!("{}/secrets/{id}", self.parent())
    }

    /// Resource name of the latest version of a secret in this scope
    #[must_use]
    pub fn latest_version_name(&self, id: &str) -> String {
        format!("{}/versions/{LATEST}", self.secret_name(id))
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.project, self.location)
    }
}

/// Secret id from a fully qualified resource name (its last path segment)
#[must_use]
pub fn secret_id(resource_name: &str) -> &str {
    resource_name
        .rsplit_once('/')
        .map_or(resource_name, |(_, id)| id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_parse() {
        assert_eq!(Location::parse("global"), Location::Global);
        assert_eq!(Location::parse(" global "), Location::Global);
        assert_eq!(
            Location::parse("europe-west1"),
            Location::Regional("europe-west1".to_string())
        );
    }

    #[test]
    fn test_global_scope_names() {
        let scope = Scope::new("my-project", "global");
        assert_eq!(scope.endpoint(), None);
        assert_eq!(scope.parent(), "projects/my-project");
        assert_eq!(
            scope.latest_version_name("db-pass"),
            "projects/my-project/secrets/db-pass/versions/latest"
        );
    }

    #[test]
    fn test_regional_scope_names() {
        let scope = Scope::new("my-project", "us-central1");
        assert_eq!(
            scope.endpoint().as_deref(),
            Some("secretmanager.us-central1.rep.googleapis.com:443")
        );
        assert_eq!(scope.parent(), "projects/my-project/locations/us-central1");
        assert_eq!(
            scope.latest_version_name("api-key"),
            "projects/my-project/locations/us-central1/secrets/api-key/versions/latest"
        );
    }

    #[test]
    fn test_scope_trims_project() {
        let scope = Scope::new(" p1 ", "global");
        assert_eq!(scope.project, "p1");
        assert_eq!(scope.to_string(), "p1/global");
    }

    #[test]
    fn test_secret_id() {
        assert_eq!(secret_id("projects/p/secrets/db-pass"), "db-pass");
        assert_eq!(
            secret_id("projects/p/locations/eu/secrets/api-key"),
            "api-key"
        );
        assert_eq!(secret_id("bare"), "bare");
    }

    #[test]
    fn test_location_serde_roundtrip_as_string() {
        let json = serde_json::to_string(&Location::Regional("eu".to_string())).unwrap();
        assert_eq!(json, "\"eu\"");
        let parsed: Location = serde_json::from_str("\"global\"").unwrap();
        assert!(parsed.is_global());
    }
}
