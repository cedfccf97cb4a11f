//! Composite plugin decision: signature, static analysis, permissions.

use super::detector::DangerousPatternDetector;
use super::permission::Permission;
use super::signature::PluginSignature;
use crate::error::SignatureError;
use crate::security::profile::SecurityProfile;
use crate::security::result::PluginValidation;
use crate::security::risk::{PluginRisk, RiskTier};
use crate::security::signature::SignatureValidator;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Construction-time plugin policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginPolicy {
    pub require_signature: bool,
    /// `None` allows every permission
    pub allowed_permissions: Option<BTreeSet<Permission>>,
    /// Flag accepted High/Medium plugins for isolation
    pub enable_sandbox: bool,
}

impl Default for PluginPolicy {
    fn default() -> Self {
        Self {
            require_signature: false,
            allowed_permissions: None,
            enable_sandbox: true,
        }
    }
}

impl PluginPolicy {
    pub fn for_profile(profile: SecurityProfile) -> Self {
        match profile {
            SecurityProfile::Strict => Self {
                require_signature: true,
                allowed_permissions: Some(
                    [Permission::FileRead, Permission::ApiCall].into_iter().collect(),
                ),
                enable_sandbox: true,
            },
            SecurityProfile::Moderate => Self {
                require_signature: false,
                allowed_permissions: Some(
                    [
                        Permission::FileRead,
                        Permission::FileWrite,
                        Permission::NetworkAccess,
                        Permission::ApiCall,
                        Permission::SystemInfo,
                    ]
                    .into_iter()
                    .collect(),
                ),
                enable_sandbox: true,
            },
            SecurityProfile::Permissive => Self {
                require_signature: false,
                allowed_permissions: None,
                enable_sandbox: false,
            },
        }
    }

    pub fn with_allowed_permissions<I>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = Permission>,
    {
        self.allowed_permissions = Some(permissions.into_iter().collect());
        self
    }

    pub fn with_signature_required(mut self, required: bool) -> Self {
        self.require_signature = required;
        self
    }

    pub fn with_sandbox(mut self, enabled: bool) -> Self {
        self.enable_sandbox = enabled;
        self
    }

    /// Whether an accepted plugin at `risk` must be flagged for isolation
    pub fn isolates(&self, risk: PluginRisk) -> bool {
        self.enable_sandbox && matches!(risk, PluginRisk::Medium | PluginRisk::High)
    }
}

/// Decides whether plugin source may be loaded
#[derive(Debug, Clone)]
pub struct PluginValidator {
    signer: SignatureValidator,
    detector: DangerousPatternDetector,
    policy: PluginPolicy,
}

impl PluginValidator {
    pub fn new(signer: SignatureValidator, policy: PluginPolicy) -> Self {
        if signer.uses_default_key() && policy.require_signature {
            warn!("plugin signatures are required but checked with the built-in development key");
        }
        Self {
            signer,
            detector: DangerousPatternDetector::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &PluginPolicy {
        &self.policy
    }

    pub fn signer(&self) -> &SignatureValidator {
        &self.signer
    }

    pub fn generate_signature(&self, code: &str) -> Result<PluginSignature, SignatureError> {
        PluginSignature::generate(code, &self.signer)
    }

    pub fn verify_signature(&self, code: &str, signature: &PluginSignature) -> bool {
        signature.verify(code, &self.signer).is_ok()
    }

    pub fn validate_plugin_code(
        &self,
        code: &str,
        signature: Option<&PluginSignature>,
    ) -> PluginValidation {
        self.validate_plugin_code_with_declared(code, signature, None)
    }

    /// Validate `code`, also checking the permissions the plugin declares
    ///
    /// Inferred permissions missing from `declared` are rejected, and the
    /// declared set itself must fit the allowed set.
    #[instrument(level = "debug", skip_all, fields(signed = signature.is_some()))]
    pub fn validate_plugin_code_with_declared(
        &self,
        code: &str,
        signature: Option<&PluginSignature>,
        declared: Option<&BTreeSet<Permission>>,
    ) -> PluginValidation {
        let signature_valid = match (signature, self.policy.require_signature) {
            (None, true) => {
                return PluginValidation::reject(
                    PluginRisk::Critical,
                    format!("code signature rejected: {}", SignatureError::Missing),
                );
            }
            (None, false) => true,
            (Some(sig), _) => {
                if let Err(e) = sig.verify(code, &self.signer) {
                    warn!(error = %e, "plugin signature verification failed");
                    return PluginValidation::reject(
                        PluginRisk::Critical,
                        format!("code signature rejected: {}", e),
                    );
                }
                true
            }
        };

        let mut result = self.detector.analyze_code(code);
        result.signature_valid = signature_valid;
        if !result.is_valid {
            return result;
        }

        if let Some(declared) = declared {
            let undeclared = difference(&result.permissions_required, declared);
            if !undeclared.is_empty() {
                return deny_permissions(
                    result,
                    format!("plugin uses undeclared permissions: {}", undeclared),
                );
            }
        }

        if let Some(allowed) = &self.policy.allowed_permissions {
            let mut required = result.permissions_required.clone();
            if let Some(declared) = declared {
                required.extend(declared.iter().copied());
            }
            let unauthorized = difference(&required, allowed);
            if !unauthorized.is_empty() {
                return deny_permissions(
                    result,
                    format!("plugin requires unauthorized permissions: {}", unauthorized),
                );
            }
        }

        debug!(risk = %result.risk_level, "plugin code accepted");
        result
    }

    /// Validate `code` against a signature still in its JSON form
    ///
    /// A signature document that does not parse is a Critical rejection.
    pub fn validate_plugin_code_signed_json(
        &self,
        code: &str,
        signature_json: Option<&str>,
    ) -> PluginValidation {
        match signature_json.map(PluginSignature::from_json).transpose() {
            Ok(signature) => self.validate_plugin_code(code, signature.as_ref()),
            Err(e) => {
                warn!(error = %e, "plugin signature could not be parsed");
                PluginValidation::reject(
                    PluginRisk::Critical,
                    format!("code signature rejected: {}", e),
                )
            }
        }
    }

    /// Read and validate a plugin file; an unreadable file is Critical
    pub fn validate_plugin_file(
        &self,
        path: &Path,
        signature: Option<&PluginSignature>,
    ) -> PluginValidation {
        match read_plugin(path) {
            Ok(code) => self.validate_plugin_code(&code, signature),
            Err(rejection) => rejection,
        }
    }

    /// `validate_plugin_file` with the signature as JSON
    pub fn validate_plugin_file_signed_json(
        &self,
        path: &Path,
        signature_json: Option<&str>,
    ) -> PluginValidation {
        match read_plugin(path) {
            Ok(code) => self.validate_plugin_code_signed_json(&code, signature_json),
            Err(rejection) => rejection,
        }
    }
}

fn read_plugin(path: &Path) -> Result<String, PluginValidation> {
    fs::read_to_string(path).map_err(|e| {
        PluginValidation::reject(
            PluginRisk::Critical,
            format!("plugin file {} could not be read: {}", path.display(), e),
        )
    })
}

fn difference(required: &BTreeSet<Permission>, allowed: &BTreeSet<Permission>) -> String {
    required
        .difference(allowed)
        .map(Permission::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

fn deny_permissions(mut result: PluginValidation, reason: String) -> PluginValidation {
    result.is_valid = false;
    result.risk_level = result.risk_level.escalate(PluginRisk::High);
    result.reason = reason;
    result
}
