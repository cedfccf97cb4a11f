//! Audited front end to the path validator

use crate::AUDIT_COMMAND_CHARS;
use crate::error::ToolResult;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, instrument};
use uplift_core::security::{DEFAULT_AUDIT_CAPACITY, sanitize_for_log};
use uplift_core::{
    AccessMode, AuditEntry, AuditLog, PathValidation, PathValidator, SecurityError, SecuritySuite,
    SharedAuditLog,
};

const OPERATION: &str = "validate_path";

/// Wraps a shared `PathValidator` and records every decision
#[derive(Debug, Clone)]
pub struct SecurePathManager {
    validator: Arc<PathValidator>,
    audit: SharedAuditLog,
}

impl SecurePathManager {
    pub fn new(validator: Arc<PathValidator>) -> Self {
        Self::with_audit_log(validator, AuditLog::shared(DEFAULT_AUDIT_CAPACITY))
    }

    pub fn with_audit_log(validator: Arc<PathValidator>, audit: SharedAuditLog) -> Self {
        Self { validator, audit }
    }

    pub fn from_suite(suite: &SecuritySuite) -> Self {
        Self::with_audit_log(suite.paths(), AuditLog::shared(suite.audit_capacity()))
    }

    pub fn validator(&self) -> &PathValidator {
        &self.validator
    }

    /// Validate and audit, returning the result either way
    pub fn validate(&self, path: &Path, mode: AccessMode) -> PathValidation {
        let validation = self.validator.validate(path, mode);

        let mut entry = AuditEntry::new(
            OPERATION,
            sanitize_for_log(&path.to_string_lossy(), AUDIT_COMMAND_CHARS),
            validation.is_valid,
        )
        .with_risk(validation.risk_level)
        .with_detail("mode", mode.as_str());
        if let Some(resolved) = &validation.resolved_path {
            entry = entry.with_detail("resolved_path", resolved.display().to_string());
        }
        if let Some(dir) = &validation.allowed_directory {
            entry = entry.with_detail("allowed_directory", dir.display().to_string());
        }
        if !validation.is_valid {
            entry = entry.with_reason(validation.reason.clone());
        }
        self.audit.record(entry);

        validation
    }

    /// The canonical path to operate on, or a `PathRejected` error
    #[instrument(skip(self), fields(path = %path.display(), mode = %mode.as_str()))]
    pub fn require(&self, path: &Path, mode: AccessMode) -> ToolResult<PathBuf> {
        let validation = self.validate(path, mode);
        match validation.resolved_path {
            Some(resolved) if validation.is_valid => Ok(resolved),
            _ => {
                error!(
                    risk = %validation.risk_level,
                    reason = %validation.reason,
                    "path access blocked"
                );
                Err(SecurityError::PathRejected {
                    path: sanitize_for_log(&path.to_string_lossy(), AUDIT_COMMAND_CHARS),
                    risk: validation.risk_level,
                    reason: validation.reason,
                }
                .into())
            }
        }
    }

    pub fn add_allowed_directory(&self, dir: impl AsRef<Path>) -> io::Result<PathBuf> {
        self.validator.add_allowed_directory(dir)
    }

    pub fn remove_allowed_directory(&self, dir: impl AsRef<Path>) -> bool {
        self.validator.remove_allowed_directory(dir)
    }

    pub fn allowed_directories(&self) -> Vec<PathBuf> {
        self.validator.allowed_directories()
    }

    pub fn get_audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.recent(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use tempfile::TempDir;
    use uplift_core::PathRisk;

    fn manager(dir: &TempDir) -> SecurePathManager {
        SecurePathManager::new(Arc::new(PathValidator::new([dir.path()])))
    }

    #[test]
    fn test_accepted_path_is_audited_with_resolution() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let target = dir.path().join("report.txt");

        let resolved = manager.require(&target, AccessMode::Create).unwrap();
        assert!(resolved.ends_with("report.txt"));

        let log = manager.get_audit_log(10);
        assert_eq!(log.len(), 1);
        assert!(log[0].success);
        assert_eq!(log[0].details["mode"], "create");
        assert!(log[0].details.contains_key("resolved_path"));
        assert!(log[0].details.contains_key("allowed_directory"));
    }

    #[test]
    fn test_traversal_is_rejected_and_audited() {
        let dir = TempDir::new().unwrap();
        let manager = manager(&dir);
        let sneaky = dir.path().join("../../../etc/passwd");

        let err = manager.require(&sneaky, AccessMode::Read).unwrap_err();
        match err {
            ToolError::Security(SecurityError::PathRejected { risk, .. }) => {
                assert_eq!(risk, PathRisk::Dangerous)
            }
            other => panic!("unexpected error: {other}"),
        }
        let log = manager.get_audit_log(10);
        assert!(!log[0].success);
        assert!(log[0].reason.as_deref().unwrap().contains(".."));
        assert!(!log[0].details.contains_key("resolved_path"));
    }

    #[test]
    fn test_runtime_directory_changes() {
        let dir = TempDir::new().unwrap();
        let extra = TempDir::new().unwrap();
        let manager = manager(&dir);
        let file = extra.path().join("x.txt");

        assert!(manager.require(&file, AccessMode::Read).is_err());
        manager.add_allowed_directory(extra.path()).unwrap();
        assert!(manager.require(&file, AccessMode::Read).is_ok());
        assert!(manager.remove_allowed_directory(extra.path()));
        assert!(manager.require(&file, AccessMode::Read).is_err());
        assert_eq!(manager.allowed_directories().len(), 1);
    }
}
