//! Detached code signatures for plugin source.

use crate::error::SignatureError;
use crate::security::signature::{SignatureValidator, sha256_hex};
use serde::{Deserialize, Serialize};

pub const SIGNATURE_ALGORITHM: &str = "hmac-sha256";
pub const SIGNATURE_VERSION: &str = "1.0";

fn default_algorithm() -> String {
    SIGNATURE_ALGORITHM.to_string()
}

fn default_version() -> String {
    SIGNATURE_VERSION.to_string()
}

/// Signature over the exact UTF-8 bytes of a plugin's source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginSignature {
    /// Hex SHA-256 of the source
    pub code_hash: String,
    /// Hex HMAC-SHA256 of the source
    pub signature: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    #[serde(default = "default_version")]
    pub version: String,
}

impl PluginSignature {
    pub fn generate(code: &str, signer: &SignatureValidator) -> Result<Self, SignatureError> {
        Ok(Self {
            code_hash: sha256_hex(code.as_bytes()),
            signature: signer.sign(code.as_bytes())?,
            algorithm: SIGNATURE_ALGORITHM.to_string(),
            version: SIGNATURE_VERSION.to_string(),
        })
    }

    /// Check this signature against `code`
    pub fn verify(&self, code: &str, signer: &SignatureValidator) -> Result<(), SignatureError> {
        if self.algorithm != SIGNATURE_ALGORITHM {
            return Err(SignatureError::UnsupportedAlgorithm(self.algorithm.clone()));
        }
        if !self
            .code_hash
            .eq_ignore_ascii_case(&sha256_hex(code.as_bytes()))
        {
            return Err(SignatureError::HashMismatch);
        }
        signer.check(code.as_bytes(), &self.signature)
    }

    pub fn from_json(json: &str) -> Result<Self, SignatureError> {
        serde_json::from_str(json).map_err(|e| SignatureError::Malformed(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SignatureError> {
        serde_json::to_string_pretty(self).map_err(|e| SignatureError::Malformed(e.to_string()))
    }
}
