//! Audited front end to the identifier validator and injection detector

use crate::AUDIT_QUERY_CHARS;
use tracing::{error, instrument};
use uplift_core::security::{DEFAULT_AUDIT_CAPACITY, sanitize_for_log};
use uplift_core::{
    AuditEntry, AuditLog, IdentifierKind, IdentifierValidator, InjectionDetector, SecurityError,
    SecuritySuite, SharedAuditLog, SqlRisk, SqlValidation,
};

#[derive(Debug, Clone)]
pub struct SecureSqlManager {
    identifiers: IdentifierValidator,
    injections: InjectionDetector,
    /// Treat Suspicious identifiers as rejected
    strict: bool,
    audit: SharedAuditLog,
}

impl Default for SecureSqlManager {
    fn default() -> Self {
        Self::new(false)
    }
}

impl SecureSqlManager {
    pub fn new(strict: bool) -> Self {
        Self::with_audit_log(strict, AuditLog::shared(DEFAULT_AUDIT_CAPACITY))
    }

    pub fn with_audit_log(strict: bool, audit: SharedAuditLog) -> Self {
        Self {
            identifiers: IdentifierValidator::new(),
            injections: InjectionDetector::new(),
            strict,
            audit,
        }
    }

    pub fn from_suite(suite: &SecuritySuite) -> Self {
        Self::with_audit_log(
            suite.strict_identifiers(),
            AuditLog::shared(suite.audit_capacity()),
        )
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    pub fn validate_table_name(&self, name: &str) -> SqlValidation {
        let result = self.identifiers.validate_table_name(name);
        self.record("validate_table_name", name, &result);
        result
    }

    pub fn validate_column_name(&self, name: &str) -> SqlValidation {
        let result = self.identifiers.validate_column_name(name);
        self.record("validate_column_name", name, &result);
        result
    }

    pub fn validate_query(&self, query: &str) -> SqlValidation {
        let result = self.injections.detect_injection(query);
        self.record("validate_query", query, &result);
        result
    }

    pub fn sanitize_identifier(&self, name: &str, kind: IdentifierKind) -> SqlValidation {
        let result = self.identifiers.sanitize_identifier(name, kind);
        self.record("sanitize_identifier", name, &result);
        result
    }

    /// The trimmed identifier, or `SqlRejected`
    ///
    /// In strict mode a Suspicious identifier is rejected as well.
    #[instrument(skip(self), fields(kind = %kind))]
    pub fn require_identifier(&self, name: &str, kind: IdentifierKind) -> Result<String, SecurityError> {
        let result = self.identifiers.validate_identifier(name, kind);
        let accepted = result.is_valid && !(self.strict && result.risk_level >= SqlRisk::Suspicious);
        let reason = if result.is_valid && !accepted {
            format!("{} (refused in strict mode)", result.reason)
        } else {
            result.reason.clone()
        };

        let logged = sanitize_for_log(name, AUDIT_QUERY_CHARS);
        let mut entry = AuditEntry::new("require_identifier", logged.clone(), accepted)
            .with_risk(result.risk_level)
            .with_detail("kind", kind.as_str());
        if !accepted {
            entry = entry.with_reason(reason.clone());
        }
        self.audit.record(entry);

        if accepted {
            return Ok(name.trim().to_string());
        }
        error!(identifier = %logged, risk = %result.risk_level, reason = %reason, "SQL identifier blocked");
        Err(SecurityError::SqlRejected {
            input: logged,
            risk: result.risk_level,
            reason,
        })
    }

    pub fn get_audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.recent(limit)
    }

    fn record(&self, operation: &str, input: &str, result: &SqlValidation) {
        let mut entry = AuditEntry::new(
            operation,
            sanitize_for_log(input, AUDIT_QUERY_CHARS),
            result.is_valid,
        )
        .with_risk(result.risk_level);
        if !result.is_valid {
            entry = entry.with_reason(result.reason.clone());
        }
        if let Some(sanitized) = &result.sanitized {
            entry = entry.with_detail("sanitized", sanitized.as_str());
        }
        self.audit.record(entry);
    }
}
