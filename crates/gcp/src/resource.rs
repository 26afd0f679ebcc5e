//! Parsing Secret Manager version resource names

use gsmcreds_secrets::Scope;

/// Parts of a secret version resource name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionName {
    /// Project and location the secret lives in
    pub scope: Scope,
    /// Secret id
    pub secret: String,
    /// Version id or alias
    pub version: String,
}

impl VersionName {
    /// Parse either resource shape:
    /// - `projects/PROJECT/secrets/SECRET/versions/VERSION`
    /// - `projects/PROJECT/locations/LOCATION/secrets/SECRET/versions/VERSION`
    #[must_use]
    pub fn parse(resource_name: &str) -> Option<Self> {
        let parts: Vec<&str> = resource_name.split('/').collect();
        match parts.as_slice() {
            ["projects", project, "secrets", secret, "versions", version] => Some(Self {
                scope: Scope::global(*project),
                secret: (*secret).to_string(),
                version: (*version).to_string(),
            }),
            [
                "projects",
                project,
                "locations",
                location,
                "secrets",
                secret,
                "versions",
                version,
            ] => Some(Self {
                scope: Scope::new(*project, location),
                secret: (*secret).to_string(),
                version: (*version).to_string(),
            }),
            _ => None,
        }
    }
}
