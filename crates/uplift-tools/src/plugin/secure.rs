//! `SecurePluginLoader`: read, validate, and only then load

use super::loader::{ModuleLoader, SourceModuleLoader};
use crate::error::{ToolError, ToolResult};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, instrument, warn};
use uplift_core::security::DEFAULT_AUDIT_CAPACITY;
use uplift_core::{
    AuditEntry, AuditLog, PluginRisk, PluginSignature, PluginValidation, PluginValidator,
    SecurityError, SecuritySuite, SharedAuditLog,
};

/// Plugin source that passed validation
///
/// Only `SecurePluginLoader::validate` builds one, so holding an
/// `ApprovedPlugin` proves the exact source inside was checked.
#[derive(Debug, Clone)]
pub struct ApprovedPlugin {
    name: String,
    path: PathBuf,
    source: String,
    validation: PluginValidation,
}

impl ApprovedPlugin {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn validation(&self) -> &PluginValidation {
        &self.validation
    }
}

/// Outcome of the validation phase
#[derive(Debug, Clone)]
pub enum PluginDecision {
    Allow(ApprovedPlugin),
    Deny(PluginValidation),
}

impl PluginDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow(_))
    }

    pub fn validation(&self) -> &PluginValidation {
        match self {
            Self::Allow(approved) => &approved.validation,
            Self::Deny(validation) => validation,
        }
    }
}

/// Validates plugin files and hands approved ones to a `ModuleLoader`
pub struct SecurePluginLoader<L: ModuleLoader = SourceModuleLoader> {
    validator: PluginValidator,
    loader: L,
    loaded: RwLock<BTreeMap<String, L::Handle>>,
    audit: SharedAuditLog,
}

impl SecurePluginLoader<SourceModuleLoader> {
    pub fn new(validator: PluginValidator) -> Self {
        Self::with_loader(
            validator,
            SourceModuleLoader::new(),
            AuditLog::shared(DEFAULT_AUDIT_CAPACITY),
        )
    }

    pub fn from_suite(suite: &SecuritySuite) -> Self {
        Self::with_loader(
            suite.plugins().clone(),
            SourceModuleLoader::new(),
            AuditLog::shared(suite.audit_capacity()),
        )
    }
}

impl<L: ModuleLoader> SecurePluginLoader<L> {
    pub fn with_loader(validator: PluginValidator, loader: L, audit: SharedAuditLog) -> Self {
        Self {
            validator,
            loader,
            loaded: RwLock::new(BTreeMap::new()),
            audit,
        }
    }

    pub fn validator(&self) -> &PluginValidator {
        &self.validator
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Phase one: read the file and decide, with no loader side effects
    #[instrument(skip(self, signature), fields(plugin = name, path = %path.display()))]
    pub async fn validate(
        &self,
        name: &str,
        path: &Path,
        signature: Option<&PluginSignature>,
    ) -> PluginDecision {
        let validation = match tokio::fs::read_to_string(path).await {
            Ok(source) => {
                let validation = self.validator.validate_plugin_code(&source, signature);
                if validation.is_valid {
                    self.record_validation(name, path, &validation);
                    return PluginDecision::Allow(ApprovedPlugin {
                        name: name.to_string(),
                        path: path.to_path_buf(),
                        source,
                        validation,
                    });
                }
                validation
            }
            Err(e) => PluginValidation::reject(
                PluginRisk::Critical,
                format!("plugin file {} could not be read: {}", path.display(), e),
            ),
        };
        self.record_validation(name, path, &validation);
        PluginDecision::Deny(validation)
    }

    /// Phase two: load an approved plugin and track its handle
    #[instrument(skip(self, approved), fields(plugin = approved.name()))]
    pub async fn load(&self, approved: ApprovedPlugin) -> ToolResult<L::Handle> {
        let ApprovedPlugin {
            name,
            path,
            source,
            validation,
        } = approved;

        let isolated = self.validator.policy().isolates(validation.risk_level);
        if isolated {
            warn!(
                plugin = %name,
                risk = %validation.risk_level,
                permissions = ?validation.permissions_required,
                "loading plugin with elevated risk, flagged for isolation"
            );
        }

        match self.loader.load(&name, &path, &source).await {
            Ok(handle) => {
                self.loaded.write().insert(name.clone(), handle.clone());
                info!(plugin = %name, path = %path.display(), "plugin loaded");
                self.audit.record(
                    AuditEntry::new("load_plugin", name, true)
                        .with_risk(validation.risk_level)
                        .with_detail("path", path.display().to_string())
                        .with_detail("isolated", isolated),
                );
                Ok(handle)
            }
            Err(err) => {
                error!(plugin = %name, error = %err, "plugin loader failed");
                self.audit.record(
                    AuditEntry::new("load_plugin", name, false)
                        .with_risk(validation.risk_level)
                        .with_error(err.to_string()),
                );
                Err(err)
            }
        }
    }

    /// Both phases; a denial becomes `SecurityError::PluginRejected`
    pub async fn load_plugin_module(
        &self,
        name: &str,
        path: &Path,
        signature: Option<&PluginSignature>,
    ) -> ToolResult<L::Handle> {
        match self.validate(name, path, signature).await {
            PluginDecision::Allow(approved) => self.load(approved).await,
            PluginDecision::Deny(validation) => {
                error!(
                    plugin = name,
                    risk = %validation.risk_level,
                    reason = %validation.reason,
                    "plugin blocked"
                );
                Err(ToolError::Security(SecurityError::PluginRejected {
                    name: name.to_string(),
                    risk: validation.risk_level,
                    reason: validation.reason,
                }))
            }
        }
    }

    pub fn unload(&self, name: &str) -> bool {
        let removed = self.loaded.write().remove(name).is_some();
        if removed {
            self.audit
                .record(AuditEntry::new("unload_plugin", name, true));
        }
        removed
    }

    pub fn handle(&self, name: &str) -> Option<L::Handle> {
        self.loaded.read().get(name).cloned()
    }

    pub fn loaded_plugins(&self) -> Vec<String> {
        self.loaded.read().keys().cloned().collect()
    }

    pub fn get_audit_log(&self, limit: usize) -> Vec<AuditEntry> {
        self.audit.recent(limit)
    }

    fn record_validation(&self, name: &str, path: &Path, validation: &PluginValidation) {
        let permissions: Vec<Value> = validation
            .permissions_required
            .iter()
            .map(|p| Value::from(p.as_str()))
            .collect();
        let mut entry = AuditEntry::new("validate_plugin", name, validation.is_valid)
            .with_risk(validation.risk_level)
            .with_detail("path", path.display().to_string())
            .with_detail("signature_valid", validation.signature_valid)
            .with_detail("permissions", permissions);
        if !validation.is_valid {
            entry = entry.with_reason(validation.reason.clone());
        }
        self.audit.record(entry);
    }
}
