//! Per-family validation results.
//!
//! Each family has its own result type carrying its own risk enum and extras.
//! `ValidationOutcome` unifies them for consumers (audit, CLI) that handle
//! several families; access goes through exhaustive matches.

use super::plugin::Permission;
use super::risk::{CommandRisk, PathRisk, PluginRisk, RiskTier, SqlRisk};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Result of validating a shell command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandValidation {
    pub is_valid: bool,
    pub risk_level: CommandRisk,
    pub reason: String,
    /// Tokens re-joined with shell quoting, set only for accepted commands
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized_command: Option<String>,
}

impl CommandValidation {
    pub fn accept(risk_level: CommandRisk, reason: impl Into<String>, sanitized: String) -> Self {
        Self {
            is_valid: true,
            risk_level,
            reason: reason.into(),
            sanitized_command: Some(sanitized),
        }
    }

    pub fn reject(risk_level: CommandRisk, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            risk_level,
            reason: reason.into(),
            sanitized_command: None,
        }
    }
}

/// Result of validating a filesystem path
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathValidation {
    pub is_valid: bool,
    pub risk_level: PathRisk,
    pub reason: String,
    /// Canonical path that subsequent I/O must use
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_directory: Option<PathBuf>,
}

impl PathValidation {
    pub fn accept(resolved_path: PathBuf, allowed_directory: PathBuf) -> Self {
        Self {
            is_valid: true,
            risk_level: PathRisk::Safe,
            reason: "path allowed".to_string(),
            resolved_path: Some(resolved_path),
            allowed_directory: Some(allowed_directory),
        }
    }

    pub fn reject(risk_level: PathRisk, reason: impl Into<String>) -> Self {
        debug_assert!(risk_level.rejects());
        Self {
            is_valid: false,
            risk_level,
            reason: reason.into(),
            resolved_path: None,
            allowed_directory: None,
        }
    }
}

/// Result of validating a SQL identifier or query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlValidation {
    pub is_valid: bool,
    pub risk_level: SqlRisk,
    pub reason: String,
    /// Rewritten identifier produced by `sanitize_identifier`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sanitized: Option<String>,
}

impl SqlValidation {
    pub fn accept(risk_level: SqlRisk, reason: impl Into<String>) -> Self {
        debug_assert!(!risk_level.rejects());
        Self {
            is_valid: true,
            risk_level,
            reason: reason.into(),
            sanitized: None,
        }
    }

    pub fn reject(risk_level: SqlRisk, reason: impl Into<String>) -> Self {
        debug_assert!(risk_level.rejects());
        Self {
            is_valid: false,
            risk_level,
            reason: reason.into(),
            sanitized: None,
        }
    }
}

/// Result of validating plugin source code
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PluginValidation {
    pub is_valid: bool,
    pub risk_level: PluginRisk,
    pub reason: String,
    /// Whether the signature stage passed (true when no signature was required or offered)
    pub signature_valid: bool,
    pub static_analysis_passed: bool,
    pub permissions_required: BTreeSet<Permission>,
    pub dangerous_patterns: Vec<String>,
}

impl PluginValidation {
    /// A rejection produced before or instead of static analysis
    pub fn reject(risk_level: PluginRisk, reason: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            risk_level,
            reason: reason.into(),
            signature_valid: false,
            static_analysis_passed: false,
            permissions_required: BTreeSet::new(),
            dangerous_patterns: Vec::new(),
        }
    }
}

/// A result from any validator family
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ValidationOutcome {
    Command(CommandValidation),
    Path(PathValidation),
    Sql(SqlValidation),
    Plugin(PluginValidation),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        match self {
            Self::Command(r) => r.is_valid,
            Self::Path(r) => r.is_valid,
            Self::Sql(r) => r.is_valid,
            Self::Plugin(r) => r.is_valid,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Command(r) => &r.reason,
            Self::Path(r) => &r.reason,
            Self::Sql(r) => &r.reason,
            Self::Plugin(r) => &r.reason,
        }
    }

    pub fn risk_label(&self) -> &'static str {
        match self {
            Self::Command(r) => r.risk_level.as_str(),
            Self::Path(r) => r.risk_level.as_str(),
            Self::Sql(r) => r.risk_level.as_str(),
            Self::Plugin(r) => r.risk_level.as_str(),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Path(_) => "path",
            Self::Sql(_) => "sql",
            Self::Plugin(_) => "plugin",
        }
    }
}

impl From<CommandValidation> for ValidationOutcome {
    fn from(r: CommandValidation) -> Self {
        Self::Command(r)
    }
}

impl From<PathValidation> for ValidationOutcome {
    fn from(r: PathValidation) -> Self {
        Self::Path(r)
    }
}

impl From<SqlValidation> for ValidationOutcome {
    fn from(r: SqlValidation) -> Self {
        Self::Sql(r)
    }
}

impl From<PluginValidation> for ValidationOutcome {
    fn from(r: PluginValidation) -> Self {
        Self::Plugin(r)
    }
}
