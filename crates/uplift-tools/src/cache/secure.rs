//! `SecureCache`: JSON entries signed with the cache key

use super::backend::{CacheBackend, MemoryBackend};
use super::stats::CacheStats;
use crate::error::{ToolError, ToolResult};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use chrono::Utc;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uplift_core::security::DEFAULT_AUDIT_CAPACITY;
use uplift_core::{AuditEntry, AuditLog, SecurityError, SecuritySuite, SharedAuditLog, SignatureValidator};

/// Lifetime of an entry stored without an explicit TTL
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Prefix separating cache keys from other data in a shared backend
pub const KEY_PREFIX: &str = "cache_";

const UNSIGNED_MARKER: &str = "unsigned";

/// The signed unit; `data` is the JSON text of the cached value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: String,
    pub data_type: String,
    /// Unix seconds
    pub expiry_time: i64,
    pub created_at: i64,
}

impl CacheEntry {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expiry_time
    }
}

/// Why a stored payload could not be trusted
enum Rejected {
    Signature(String),
    Malformed(String),
}

pub struct SecureCache<B: CacheBackend = MemoryBackend> {
    backend: B,
    signer: Option<SignatureValidator>,
    default_ttl: Duration,
    stats: Mutex<CacheStats>,
    audit: SharedAuditLog,
}

impl SecureCache<MemoryBackend> {
    pub fn new(signer: SignatureValidator) -> Self {
        Self::with_backend(
            MemoryBackend::new(),
            Some(signer),
            AuditLog::shared(DEFAULT_AUDIT_CAPACITY),
        )
    }

    /// Cache without signatures; entries are marked `unsigned`
    pub fn unsigned() -> Self {
        Self::with_backend(
            MemoryBackend::new(),
            None,
            AuditLog::shared(DEFAULT_AUDIT_CAPACITY),
        )
    }

    pub fn from_suite(suite: &SecuritySuite) -> Self {
        Self::with_backend(
            MemoryBackend::new(),
            Some(suite.cache_signer().clone()),
            AuditLog::shared(suite.audit_capacity()),
        )
    }
}

impl<B: CacheBackend> SecureCache<B> {
    pub fn with_backend(backend: B, signer: Option<SignatureValidator>, audit: SharedAuditLog) -> Self {
        match &signer {
            Some(signer) if signer.uses_default_key() => {
                warn!("cache entries are signed with the built-in development key")
            }
            None => warn!("cache signatures are disabled"),
            _ => {}
        }
        info!(signed = signer.is_some(), "secure cache initialized");
        Self {
            backend,
            signer,
            default_ttl: DEFAULT_TTL,
            stats: Mutex::new(CacheStats::default()),
            audit,
        }
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_signed(&self) -> bool {
        self.signer.is_some()
    }

    /// Cached value for `key`; misses, expired and untrusted entries are `None`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = format!("{KEY_PREFIX}{key}");
        let Some(payload) = self.backend.get(&full_key) else {
            self.stats.lock().misses += 1;
            self.record("get", key, false, Some("not_found"), None);
            return None;
        };

        let entry = match self.decode(&payload) {
            Ok(entry) => entry,
            Err(Rejected::Signature(reason)) => {
                error!(key, reason = %reason, "cache signature verification failed");
                self.backend.delete(&full_key);
                {
                    let mut stats = self.stats.lock();
                    stats.signature_failures += 1;
                    stats.misses += 1;
                }
                self.record("get", key, false, Some("signature_error"), Some(reason));
                return None;
            }
            Err(Rejected::Malformed(reason)) => {
                error!(key, reason = %reason, "cache entry could not be decoded");
                self.backend.delete(&full_key);
                {
                    let mut stats = self.stats.lock();
                    stats.serialization_errors += 1;
                    stats.misses += 1;
                }
                self.record("get", key, false, Some("deserialization_error"), Some(reason));
                return None;
            }
        };

        if entry.is_expired(Utc::now().timestamp()) {
            self.backend.delete(&full_key);
            self.stats.lock().misses += 1;
            self.record("get", key, false, Some("expired"), None);
            return None;
        }

        match serde_json::from_str(&entry.data) {
            Ok(value) => {
                self.stats.lock().hits += 1;
                self.record("get", key, true, None, None);
                Some(value)
            }
            Err(e) => {
                debug!(key, data_type = %entry.data_type, "cached value has a different type");
                {
                    let mut stats = self.stats.lock();
                    stats.serialization_errors += 1;
                    stats.misses += 1;
                }
                self.record("get", key, false, Some("type_mismatch"), Some(e.to_string()));
                None
            }
        }
    }

    /// Store `value` for `ttl`, or the default TTL
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Option<Duration>) -> ToolResult<()> {
        let full_key = format!("{KEY_PREFIX}{key}");
        let payload = match self.encode(value, ttl.unwrap_or(self.default_ttl)) {
            Ok(payload) => payload,
            Err(err) => {
                error!(key, error = %err, "cache entry could not be encoded");
                self.backend.delete(&full_key);
                if matches!(err, ToolError::Json(_)) {
                    self.stats.lock().serialization_errors += 1;
                }
                self.record("set", key, false, Some("serialization_error"), Some(err.to_string()));
                return Err(err);
            }
        };

        self.backend.set(&full_key, payload);
        self.stats.lock().sets += 1;
        self.record("set", key, true, None, None);
        Ok(())
    }

    pub fn delete(&self, key: &str) -> bool {
        let removed = self.backend.delete(&format!("{KEY_PREFIX}{key}"));
        self.stats.lock().deletes += 1;
        self.record("delete", key, true, None, None);
        removed
    }

    /// Remove every cache entry; returns how many were removed
    pub fn clear(&self) -> usize {
        let keys: Vec<String> = self
            .backend
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(KEY_PREFIX))
            .collect();
        for key in &keys {
            self.backend.delete(key);
        }
        self.stats.lock().deletes += keys.len() as u64;
        self.audit.record(
            AuditEntry::new("clear", "all", true).with_detail("count", keys.len()),
        );
        keys.len()
    }

    /// Drop expired and untrusted entries; returns how many were removed
    pub fn cleanup_expired(&self) -> usize {
        let now = Utc::now().timestamp();
        let mut removed = 0;
        for key in self.backend.keys() {
            if !key.starts_with(KEY_PREFIX) {
                continue;
            }
            let Some(payload) = self.backend.get(&key) else {
                continue;
            };
            let stale = match self.decode(&payload) {
                Ok(entry) => entry.is_expired(now),
                Err(_) => true,
            };
            if stale && self.backend.delete(&key) {
                removed += 1;
            }
        }
        if removed > 0 {
            info!(removed, "expired cache entries removed");
        }
        removed
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.lock().clone()
    }

    pub fn get_audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.recent(limit)
    }

    fn encode<T: Serialize>(&self, value: &T, ttl: Duration) -> ToolResult<String> {
        let value = serde_json::to_value(value)?;
        let now = Utc::now().timestamp();
        let entry = CacheEntry {
            data: serde_json::to_string(&value)?,
            data_type: json_kind(&value).to_string(),
            expiry_time: now.saturating_add(i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX)),
            created_at: now,
        };
        let entry_json = serde_json::to_string(&entry)?;

        let marker = match &self.signer {
            Some(signer) => signer
                .sign(entry_json.as_bytes())
                .map_err(SecurityError::from)?,
            None => UNSIGNED_MARKER.to_string(),
        };
        Ok(STANDARD.encode(format!("{marker}:{entry_json}")))
    }

    fn decode(&self, payload: &str) -> Result<CacheEntry, Rejected> {
        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| Rejected::Malformed(format!("invalid base64: {e}")))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| Rejected::Malformed(format!("invalid UTF-8: {e}")))?;
        let Some((marker, entry_json)) = text.split_once(':') else {
            return Err(Rejected::Malformed("missing signature separator".to_string()));
        };

        if let Some(signer) = &self.signer {
            if marker == UNSIGNED_MARKER {
                return Err(Rejected::Signature("entry is not signed".to_string()));
            }
            if let Err(e) = signer.check(entry_json.as_bytes(), marker) {
                return Err(Rejected::Signature(e.to_string()));
            }
        }

        serde_json::from_str(entry_json).map_err(|e| Rejected::Malformed(e.to_string()))
    }

    fn record(
        &self,
        operation: &str,
        key: &str,
        success: bool,
        reason: Option<&str>,
        error: Option<String>,
    ) {
        let mut entry = AuditEntry::new(operation, key, success);
        if let Some(reason) = reason {
            entry = entry.with_reason(reason);
        }
        if let Some(error) = error {
            entry = entry.with_error(error);
        }
        self.audit.record(entry);
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
