//! Bounded in-memory audit log for the enforcing wrappers.

use super::risk::RiskTier;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::{Arc, LazyLock};

/// Default number of retained entries
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

/// Thread-safe audit log handle
pub type SharedAuditLog = Arc<AuditLog>;

static SECRET_ASSIGNMENT: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(password|passwd|secret|token|api[_-]?key)(\s*[=:]\s*)\S+").ok()
});

/// Redact `key=value` secrets and truncate to `max_chars` characters
pub fn sanitize_for_log(input: &str, max_chars: usize) -> String {
    let redacted = match SECRET_ASSIGNMENT.as_ref() {
        Some(re) => re.replace_all(input, "${1}${2}[REDACTED]").into_owned(),
        None => return "[REDACTED]".to_string(),
    };
    if redacted.chars().count() <= max_chars {
        return redacted;
    }
    let mut truncated: String = redacted.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

/// One audited operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    /// Already truncated and redacted
    pub input: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl AuditEntry {
    pub fn new(operation: impl Into<String>, input: impl Into<String>, success: bool) -> Self {
        Self {
            timestamp: Utc::now(),
            operation: operation.into(),
            input: input.into(),
            success,
            risk_level: None,
            reason: None,
            error: None,
            details: Map::new(),
        }
    }

    pub fn with_risk<R: RiskTier>(mut self, risk: R) -> Self {
        self.risk_level = Some(risk.as_str().to_string());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_detail(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.details.insert(key.to_string(), value.into());
        self
    }
}

/// Append-only ring buffer of audit entries
///
/// Append and eviction happen under one lock, so concurrent writers never
/// lose entries or grow the buffer past its capacity.
#[derive(Debug)]
pub struct AuditLog {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl AuditLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_AUDIT_CAPACITY))),
            capacity,
        }
    }

    pub fn shared(capacity: usize) -> SharedAuditLog {
        Arc::new(Self::new(capacity))
    }

    pub fn record(&self, entry: AuditEntry) {
        let mut entries = self.entries.lock();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// The newest `limit` entries, oldest first
    pub fn recent(&self, limit: usize) -> Vec<AuditEntry> {
        let entries = self.entries.lock();
        let start = entries.len().saturating_sub(limit);
        entries.iter().skip(start).cloned().collect()
    }

    pub fn failures(&self) -> Vec<AuditEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| !e.success)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
