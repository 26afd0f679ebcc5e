//! Secure payload types with automatic memory zeroing
//!
//! Every payload read from the store is handed out through one of these:
//! - [`SecureSecret`]: text payloads (passwords, tokens, private keys)
//! - [`SecureBytes`]: binary payloads (key stores, files)

use secrecy::{ExposeSecret, SecretSlice, SecretString};

/// A secret text value with automatic memory zeroing on drop.
///
/// Debug and Display output show `[REDACTED]`; the value is only reachable
/// through [`SecureSecret::expose`].
#[derive(Clone)]
pub struct SecureSecret {
    inner: SecretString,
}

impl SecureSecret {
    /// Move a string into secure storage.
    #[must_use]
    pub fn new(value: String) -> Self {
        Self {
            inner: SecretString::from(value),
        }
    }

    /// Decode a payload as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn from_utf8_lossy(payload: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(payload).into_owned())
    }

    /// Expose the secret value for use.
    ///
    /// The caller must not log or persist the returned value.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.inner.expose_secret()
    }

    /// Length of the value without exposing it
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Whether the value is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl std::fmt::Display for SecureSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// A binary secret value with automatic memory zeroing on drop.
pub struct SecureBytes {
    inner: SecretSlice<u8>,
}

impl SecureBytes {
    /// Move a payload into secure storage.
    #[must_use]
    pub fn new(value: Vec<u8>) -> Self {
        Self {
            inner: SecretSlice::from(value),
        }
    }

    /// Expose the raw bytes for use.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Number of bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.expose_secret().len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.expose_secret().is_empty()
    }
}

impl std::fmt::Debug for SecureBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[REDACTED; {} bytes]", self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secure_secret_debug_is_redacted() {
        let secret = SecureSecret::new("my-super-secret-password".to_string());
        let debug_output = format!("{secret:?}");
        assert_eq!(debug_output, "[REDACTED]");
        assert!(!debug_output.contains("password"));
    }

    #[test]
    fn secure_secret_display_is_redacted() {
        let secret = SecureSecret::new("my-super-secret-password".to_string());
        assert_eq!(format!("{secret}"), "[REDACTED]");
    }

    #[test]
    fn secure_secret_expose_returns_value() {
        let secret = SecureSecret::new("test-value".to_string());
        assert_eq!(secret.expose(), "test-value");
        assert_eq!(secret.len(), 10);
        assert!(!secret.is_empty());
    }

    #[test]
    fn secure_secret_lossy_decoding() {
        let secret = SecureSecret::from_utf8_lossy(&[b'o', b'k', 0xff]);
        assert_eq!(secret.expose(), "ok\u{fffd}");
    }

    #[test]
    fn secure_bytes_keeps_raw_payload() {
        let bytes = SecureBytes::new(vec![0x30, 0x82, 0x00, 0xff]);
        assert_eq!(bytes.expose(), &[0x30, 0x82, 0x00, 0xff]);
        assert_eq!(bytes.len(), 4);
        assert_eq!(format!("{bytes:?}"), "[REDACTED; 4 bytes]");
    }
}
