//! Typed credentials built from labelled secrets
//!
//! [`build`] maps a secret's labels onto one [`Credential`] variant. The type
//! label picks the variant; kind-specific labels fill in auxiliary fields.
//! A secret that names an unknown kind or lacks a required label produces no
//! credential at all.

use crate::getter::{CredentialsUnavailable, SecretGetter};
use crate::labels;
use crate::scope::{Location, Scope};
use crate::types::{SecureBytes, SecureSecret};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Kind discriminator carried in the type label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CredentialKind {
    /// `string`
    #[serde(rename = "string")]
    SecretText,
    /// `username-password`
    UsernamePassword,
    /// `ssh-user-private-key`
    SshUserPrivateKey,
    /// `certificate`
    Certificate,
    /// `file`
    File,
}

impl CredentialKind {
    /// Parse a type label value
    #[must_use]
    pub fn from_label(value: &str) -> Option<Self> {
        match value {
            "string" => Some(Self::SecretText),
            "username-password" => Some(Self::UsernamePassword),
            "ssh-user-private-key" => Some(Self::SshUserPrivateKey),
            "certificate" => Some(Self::Certificate),
            "file" => Some(Self::File),
            _ => None,
        }
    }

    /// Label value for this kind
    #[must_use]
    pub const fn as_label(self) -> &'static str {
        match self {
            Self::SecretText => "string",
            Self::UsernamePassword => "username-password",
            Self::SshUserPrivateKey => "ssh-user-private-key",
            Self::Certificate => "certificate",
            Self::File => "file",
        }
    }
}

impl fmt::Display for CredentialKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Identity of a credential plus the capability to fetch its payload
#[derive(Clone)]
pub struct SecretHandle {
    id: String,
    scope: Scope,
    getter: Arc<dyn SecretGetter>,
}

impl SecretHandle {
    /// Bind `id` in `scope` to `getter`
    #[must_use]
    pub fn new(id: impl Into<String>, scope: Scope, getter: Arc<dyn SecretGetter>) -> Self {
        Self {
            id: id.into(),
            scope,
            getter,
        }
    }

    /// Secret id, also the credential id
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Project and location the secret belongs to
    #[must_use]
    pub const fn scope(&self) -> &Scope {
        &self.scope
    }

    async fn text(&self) -> Result<SecureSecret, CredentialsUnavailable> {
        self.getter.secret_string(&self.id).await
    }

    async fn bytes(&self) -> Result<SecureBytes, CredentialsUnavailable> {
        self.getter.secret_bytes(&self.id).await
    }
}

impl fmt::Debug for SecretHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretHandle")
            .field("id", &self.id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

/// Secret text credential
#[derive(Debug, Clone)]
pub struct SecretTextCredential {
    handle: SecretHandle,
}

impl SecretTextCredential {
    /// Fetch the secret text.
    ///
    /// # Errors
    /// Returns [`CredentialsUnavailable`] if the store cannot be reached.
    pub async fn secret(&self) -> Result<SecureSecret, CredentialsUnavailable> {
        self.handle.text().await
    }
}

/// Username with a password held in the secret
#[derive(Debug, Clone)]
pub struct UsernamePasswordCredential {
    handle: SecretHandle,
    username: String,
}

impl UsernamePasswordCredential {
    /// Username from the username label
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Fetch the password.
    ///
    /// # Errors
    /// Returns [`CredentialsUnavailable`] if the store cannot be reached.
    pub async fn password(&self) -> Result<SecureSecret, CredentialsUnavailable> {
        self.handle.text().await
    }
}

/// Username with an SSH private key held in the secret
#[derive(Debug, Clone)]
pub struct SshUserPrivateKeyCredential {
    handle: SecretHandle,
    username: String,
}

impl SshUserPrivateKeyCredential {
    /// Username from the username label
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Fetch the PEM encoded private key.
    ///
    /// # Errors
    /// Returns [`CredentialsUnavailable`] if the store cannot be reached.
    pub async fn private_key(&self) -> Result<SecureSecret, CredentialsUnavailable> {
        self.handle.text().await
    }
}

/// PKCS#12 key store held in the secret, protected by an empty password
#[derive(Debug, Clone)]
pub struct CertificateCredential {
    handle: SecretHandle,
}

impl CertificateCredential {
    /// Fetch the raw key store.
    ///
    /// # Errors
    /// Returns [`CredentialsUnavailable`] if the store cannot be reached.
    pub async fn key_store_bytes(&self) -> Result<SecureBytes, CredentialsUnavailable> {
        self.handle.bytes().await
    }

    /// Key store password. Always empty.
    #[must_use]
    pub const fn password(&self) -> &'static str {
        ""
    }
}

/// File whose content is held in the secret
#[derive(Debug, Clone)]
pub struct FileCredential {
    handle: SecretHandle,
    file_name: String,
}

impl FileCredential {
    /// File name, including the extension label when present
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Fetch the file content.
    ///
    /// # Errors
    /// Returns [`CredentialsUnavailable`] if the store cannot be reached.
    pub async fn content(&self) -> Result<SecureBytes, CredentialsUnavailable> {
        self.handle.bytes().await
    }
}

/// A discovered credential
#[derive(Debug, Clone)]
pub enum Credential {
    /// `string`
    SecretText(SecretTextCredential),
    /// `username-password`
    UsernamePassword(UsernamePasswordCredential),
    /// `ssh-user-private-key`
    SshUserPrivateKey(SshUserPrivateKeyCredential),
    /// `certificate`
    Certificate(CertificateCredential),
    /// `file`
    File(FileCredential),
}

impl Credential {
    fn handle(&self) -> &SecretHandle {
        match self {
            Self::SecretText(c) => &c.handle,
            Self::UsernamePassword(c) => &c.handle,
            Self::SshUserPrivateKey(c) => &c.handle,
            Self::Certificate(c) => &c.handle,
            Self::File(c) => &c.handle,
        }
    }

    /// Credential id (the secret id)
    #[must_use]
    pub fn id(&self) -> &str {
        self.handle().id()
    }

    /// Owning project
    #[must_use]
    pub fn project(&self) -> &str {
        &self.handle().scope().project
    }

    /// Owning location
    #[must_use]
    pub fn location(&self) -> &Location {
        &self.handle().scope().location
    }

    /// Kind of this credential
    #[must_use]
    pub const fn kind(&self) -> CredentialKind {
        match self {
            Self::SecretText(_) => CredentialKind::SecretText,
            Self::UsernamePassword(_) => CredentialKind::UsernamePassword,
            Self::SshUserPrivateKey(_) => CredentialKind::SshUserPrivateKey,
            Self::Certificate(_) => CredentialKind::Certificate,
            Self::File(_) => CredentialKind::File,
        }
    }

    /// Username for the kinds that carry one
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        match self {
            Self::UsernamePassword(c) => Some(c.username()),
            Self::SshUserPrivateKey(c) => Some(c.username()),
            _ => None,
        }
    }

    /// Metadata view that never includes the payload
    #[must_use]
    pub fn summary(&self) -> CredentialSummary {
        CredentialSummary {
            id: self.id().to_string(),
            kind: self.kind(),
            project: self.project().to_string(),
            location: self.location().to_string(),
            username: self.username().map(str::to_string),
            file_name: match self {
                Self::File(c) => Some(c.file_name().to_string()),
                _ => None,
            },
        }
    }
}

/// Serializable description of a credential, without its value
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialSummary {
    /// Credential id
    pub id: String,
    /// Credential kind
    pub kind: CredentialKind,
    /// Owning project
    pub project: String,
    /// Owning location
    pub location: String,
    /// Username, for kinds that carry one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    /// File name, for file credentials
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
}

/// Build a credential from a secret's labels.
///
/// Returns `None` when the type label is missing or unknown, or when a label
/// the kind requires is absent. The getter is stored, never called.
#[must_use]
pub fn build(
    id: &str,
    project: &str,
    location: &str,
    secret_labels: &HashMap<String, String>,
    getter: Arc<dyn SecretGetter>,
) -> Option<Credential> {
    let type_value = secret_labels.get(&labels::type_key())?;
    let Some(kind) = CredentialKind::from_label(type_value) else {
        tracing::debug!(secret = %id, kind = %type_value, "Unknown credential type");
        return None;
    };

    let handle = SecretHandle::new(id, Scope::new(project, location), getter);
    let username = || required(secret_labels, labels::USERNAME, id, kind);

    let credential = match kind {
        CredentialKind::SecretText => Credential::SecretText(SecretTextCredential { handle }),
        CredentialKind::UsernamePassword => {
            Credential::UsernamePassword(UsernamePasswordCredential {
                handle,
                username: username()?,
            })
        }
        CredentialKind::SshUserPrivateKey => {
            Credential::SshUserPrivateKey(SshUserPrivateKeyCredential {
                handle,
                username: username()?,
            })
        }
        CredentialKind::Certificate => Credential::Certificate(CertificateCredential { handle }),
        CredentialKind::File => {
            let name = required(secret_labels, labels::FILENAME, id, kind)?;
            let file_name = match secret_labels.get(labels::FILE_EXTENSION) {
                Some(ext) if !ext.is_empty() => format!("{name}.{ext}"),
                _ => name,
            };
            Credential::File(FileCredential { handle, file_name })
        }
    };

    Some(credential)
}

fn required(
    secret_labels: &HashMap<String, String>,
    key: &str,
    id: &str,
    kind: CredentialKind,
) -> Option<String> {
    let value = secret_labels.get(key).filter(|v| !v.is_empty()).cloned();
    if value.is_none() {
        tracing::debug!(secret = %id, %kind, label = key, "Missing required label");
    }
    value
}
