//! HMAC-SHA256 signing shared by plugin code signatures and the secure cache.

use super::profile::SecurityProfile;
use crate::error::{SecurityError, SignatureError};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use std::fmt;
use tracing::error;

type HmacSha256 = Hmac<Sha256>;

/// Well-known key used only when a non-strict profile has no configured secret
const DEVELOPMENT_KEY: &[u8] = b"uplift-development-signing-key-do-not-use-in-production";

/// Where a signing key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Read from the named environment variable or config entry
    Configured(&'static str),
    /// Passed in directly by the caller
    Explicit,
    /// Built-in development fallback
    Default,
}

/// Secret HMAC key; never printed
#[derive(Clone)]
pub struct SigningKey {
    bytes: Vec<u8>,
    source: KeySource,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("source", &self.source)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl SigningKey {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            source: KeySource::Explicit,
        }
    }

    /// The built-in development key
    pub fn development() -> Self {
        Self {
            bytes: DEVELOPMENT_KEY.to_vec(),
            source: KeySource::Default,
        }
    }

    /// Resolve a configured secret, falling back to the development key
    ///
    /// The strict profile refuses the fallback. Other profiles accept it but
    /// log at error level, since signatures made with a public key prove
    /// nothing.
    pub fn resolve(
        configured: Option<&str>,
        var: &'static str,
        profile: SecurityProfile,
    ) -> Result<Self, SecurityError> {
        match configured.filter(|k| !k.is_empty()) {
            Some(secret) => Ok(Self {
                bytes: secret.as_bytes().to_vec(),
                source: KeySource::Configured(var),
            }),
            None if profile.allows_default_key() => {
                error!(
                    variable = var,
                    profile = %profile,
                    "no secret key configured, falling back to the built-in development key; signatures are forgeable until {} is set",
                    var
                );
                Ok(Self::development())
            }
            None => Err(SecurityError::MissingSecretKey { var, profile }),
        }
    }

    pub fn source(&self) -> KeySource {
        self.source
    }

    pub fn is_default(&self) -> bool {
        self.source == KeySource::Default
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Lowercase hex SHA-256 of `data`
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn mac_for(key: &[u8]) -> Result<HmacSha256, SignatureError> {
    HmacSha256::new_from_slice(key).map_err(|e| SignatureError::Malformed(e.to_string()))
}

/// Hex HMAC-SHA256 of `payload` under `key`
pub fn sign(payload: &[u8], key: &[u8]) -> Result<String, SignatureError> {
    let mut mac = mac_for(key)?;
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check `signature_hex` against `payload` in constant time
pub fn verify_signature(payload: &[u8], signature_hex: &str, key: &[u8]) -> Result<(), SignatureError> {
    let expected = hex::decode(signature_hex.trim())
        .map_err(|e| SignatureError::Malformed(format!("signature is not hex: {}", e)))?;
    let mut mac = mac_for(key)?;
    mac.update(payload);
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}

/// `true` only when the signature verifies; every failure mode is `false`
pub fn verify(payload: &[u8], signature_hex: &str, key: &[u8]) -> bool {
    verify_signature(payload, signature_hex, key).is_ok()
}

/// Signs and verifies payloads under one key
#[derive(Debug, Clone)]
pub struct SignatureValidator {
    key: SigningKey,
}

impl SignatureValidator {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    pub fn sign(&self, payload: &[u8]) -> Result<String, SignatureError> {
        sign(payload, self.key.as_bytes())
    }

    pub fn verify(&self, payload: &[u8], signature_hex: &str) -> bool {
        verify(payload, signature_hex, self.key.as_bytes())
    }

    /// Like `verify`, but reports why verification failed
    pub fn check(&self, payload: &[u8], signature_hex: &str) -> Result<(), SignatureError> {
        verify_signature(payload, signature_hex, self.key.as_bytes())
    }

    pub fn key_source(&self) -> KeySource {
        self.key.source()
    }

    pub fn uses_default_key(&self) -> bool {
        self.key.is_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_matches_known_vector() {
        // RFC 4231 test case 2
        let sig = sign(b"what do ya want for nothing?", b"Jefe").unwrap();
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let validator = SignatureValidator::new(SigningKey::new("secret"));
        let sig = validator.sign(b"payload").unwrap();
        assert!(validator.verify(b"payload", &sig));
        assert!(!validator.verify(b"payload!", &sig));
        assert!(!validator.verify(b"payload", "not-hex"));
        assert!(!validator.verify(b"payload", ""));
        assert_eq!(
            validator.check(b"other", &sig).unwrap_err(),
            SignatureError::Mismatch
        );
        assert!(matches!(
            validator.check(b"payload", "zz"),
            Err(SignatureError::Malformed(_))
        ));
    }

    #[test]
    fn test_different_keys_disagree() {
        let a = SignatureValidator::new(SigningKey::new("key-a"));
        let b = SignatureValidator::new(SigningKey::new("key-b"));
        let sig = a.sign(b"data").unwrap();
        assert!(!b.verify(b"data", &sig));
    }

    #[test]
    fn test_resolve_prefers_configured_key() {
        let key = SigningKey::resolve(Some("s3cret"), "UPLIFT_PLUGIN_SECRET_KEY", SecurityProfile::Strict)
            .unwrap();
        assert_eq!(key.source(), KeySource::Configured("UPLIFT_PLUGIN_SECRET_KEY"));
        assert!(!key.is_default());
    }

    #[test]
    fn test_strict_refuses_default_key() {
        let err = SigningKey::resolve(None, "UPLIFT_PLUGIN_SECRET_KEY", SecurityProfile::Strict)
            .unwrap_err();
        assert!(matches!(err, SecurityError::MissingSecretKey { .. }));

        let empty = SigningKey::resolve(Some(""), "UPLIFT_CACHE_SECRET_KEY", SecurityProfile::Strict);
        assert!(empty.is_err());
    }

    #[test]
    fn test_moderate_falls_back_to_default_key() {
        let key = SigningKey::resolve(None, "UPLIFT_CACHE_SECRET_KEY", SecurityProfile::Moderate)
            .unwrap();
        assert!(key.is_default());
        assert!(!format!("{:?}", key).contains("uplift-development"));
    }

    #[test]
    fn test_sha256_hex() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
