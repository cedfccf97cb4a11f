//! Error types for the Uplift security layer
//!
//! Validators report rejections as values. These errors exist for the
//! enforcement boundary (a wrapper refusing to perform a side effect) and for
//! configuration problems discovered at startup.

use crate::security::{CommandRisk, PathRisk, PluginRisk, SecurityProfile, SqlRisk};
use std::path::PathBuf;

/// Result alias for enforcement-boundary operations
pub type SecurityResult<T> = Result<T, SecurityError>;

/// Signature and verification failures
///
/// Any of these means "could not verify", which is always handled the same
/// way as "verification failed".
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    #[error("signature does not match payload")]
    Mismatch,

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("unsupported signature algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("code hash does not match signed content")]
    HashMismatch,

    #[error("signature required but not provided")]
    Missing,
}

/// Raised when a rejection must stop a side-effecting operation
#[derive(Debug, Clone, thiserror::Error)]
pub enum SecurityError {
    #[error("command rejected ({risk}): {reason}")]
    CommandRejected {
        command: String,
        risk: CommandRisk,
        reason: String,
    },

    #[error("path rejected ({risk}): {reason}")]
    PathRejected {
        path: String,
        risk: PathRisk,
        reason: String,
    },

    #[error("SQL input rejected ({risk}): {reason}")]
    SqlRejected {
        input: String,
        risk: SqlRisk,
        reason: String,
    },

    #[error("plugin '{name}' rejected ({risk}): {reason}")]
    PluginRejected {
        name: String,
        risk: PluginRisk,
        reason: String,
    },

    #[error("signature verification failed: {0}")]
    Signature(#[from] SignatureError),

    #[error("{var} is not set and the {profile} profile refuses the built-in signing key")]
    MissingSecretKey {
        var: &'static str,
        profile: SecurityProfile,
    },
}

impl SecurityError {
    /// Stable identifier for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CommandRejected { .. } => "UPLIFT_COMMAND_REJECTED",
            Self::PathRejected { .. } => "UPLIFT_PATH_REJECTED",
            Self::SqlRejected { .. } => "UPLIFT_SQL_REJECTED",
            Self::PluginRejected { .. } => "UPLIFT_PLUGIN_REJECTED",
            Self::Signature(_) => "UPLIFT_SIGNATURE",
            Self::MissingSecretKey { .. } => "UPLIFT_MISSING_SECRET_KEY",
        }
    }

    /// Whether this error blocked untrusted input (as opposed to a setup problem)
    pub fn is_security_violation(&self) -> bool {
        !matches!(self, Self::MissingSecretKey { .. })
    }

    /// The human-readable rejection reason, without the variant prefix
    pub fn reason(&self) -> String {
        match self {
            Self::CommandRejected { reason, .. }
            | Self::PathRejected { reason, .. }
            | Self::SqlRejected { reason, .. }
            | Self::PluginRejected { reason, .. } => reason.clone(),
            other => other.to_string(),
        }
    }
}

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid security profile '{0}' (expected strict, moderate or permissive)")]
    InvalidProfile(String),

    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },

    #[error("failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Security(#[from] SecurityError),
}

impl ConfigError {
    pub fn invalid_value(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidProfile(_) => "UPLIFT_CONFIG_PROFILE",
            Self::InvalidValue { .. } => "UPLIFT_CONFIG_VALUE",
            Self::Read { .. } => "UPLIFT_CONFIG_READ",
            Self::Parse { .. } => "UPLIFT_CONFIG_PARSE",
            Self::Security(err) => err.error_code(),
        }
    }
}
