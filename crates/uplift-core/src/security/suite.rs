//! One-shot construction of every validator from a `SecurityConfig`.

use super::command::CommandValidator;
use super::path::PathValidator;
use super::plugin::PluginValidator;
use super::profile::SecurityProfile;
use super::signature::SignatureValidator;
use super::sql::{IdentifierValidator, InjectionDetector};
use crate::config::SecurityConfig;
use crate::error::SecurityError;
use std::sync::Arc;
use tracing::info;

/// The validators a process needs, built once at startup and passed by handle
#[derive(Debug, Clone)]
pub struct SecuritySuite {
    profile: SecurityProfile,
    commands: CommandValidator,
    paths: Arc<PathValidator>,
    identifiers: IdentifierValidator,
    injections: InjectionDetector,
    plugins: PluginValidator,
    cache_signer: SignatureValidator,
    audit_capacity: usize,
}

impl SecuritySuite {
    /// Fails only when the profile refuses a missing secret key
    pub fn from_config(config: &SecurityConfig) -> Result<Self, SecurityError> {
        let plugins = PluginValidator::new(
            SignatureValidator::new(config.plugin_signing_key()?),
            config.plugin_policy(),
        );
        let cache_signer = SignatureValidator::new(config.cache_signing_key()?);
        let suite = Self {
            profile: config.profile,
            commands: CommandValidator::with_policy(config.command_policy()),
            paths: Arc::new(PathValidator::with_policy(config.path_policy())),
            identifiers: IdentifierValidator::new(),
            injections: InjectionDetector::new(),
            plugins,
            cache_signer,
            audit_capacity: config.audit_capacity,
        };
        info!(
            profile = %suite.profile,
            allowed_directories = suite.paths.allowed_directories().len(),
            "security suite initialized"
        );
        Ok(suite)
    }

    pub fn profile(&self) -> SecurityProfile {
        self.profile
    }

    pub fn commands(&self) -> &CommandValidator {
        &self.commands
    }

    pub fn paths(&self) -> Arc<PathValidator> {
        Arc::clone(&self.paths)
    }

    pub fn identifiers(&self) -> &IdentifierValidator {
        &self.identifiers
    }

    pub fn injections(&self) -> &InjectionDetector {
        &self.injections
    }

    pub fn plugins(&self) -> &PluginValidator {
        &self.plugins
    }

    pub fn cache_signer(&self) -> &SignatureValidator {
        &self.cache_signer
    }

    pub fn audit_capacity(&self) -> usize {
        self.audit_capacity
    }

    /// Strict mode also rejects Suspicious SQL identifiers
    pub fn strict_identifiers(&self) -> bool {
        self.profile == SecurityProfile::Strict
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::risk::CommandRisk;
    use tempfile::TempDir;

    #[test]
    fn test_strict_without_keys_refuses() {
        let err = SecuritySuite::from_config(&SecurityConfig::default()).unwrap_err();
        assert!(matches!(err, SecurityError::MissingSecretKey { .. }));
    }

    #[test]
    fn test_strict_with_keys() {
        let tmp = TempDir::new().unwrap();
        let config = SecurityConfig {
            plugin_secret_key: Some("p".into()),
            cache_secret_key: Some("c".into()),
            allowed_directories: vec![tmp.path().to_path_buf()],
            ..SecurityConfig::default()
        };
        let suite = SecuritySuite::from_config(&config).unwrap();
        assert!(suite.strict_identifiers());
        assert_eq!(suite.commands().rejection_threshold(), CommandRisk::Dangerous);
        assert!(!suite.paths().allows_symlinks());
        assert!(suite.plugins().policy().require_signature);
        assert!(!suite.cache_signer().uses_default_key());
    }

    #[test]
    fn test_moderate_falls_back_to_default_keys() {
        let suite =
            SecuritySuite::from_config(&SecurityConfig::for_profile(SecurityProfile::Moderate))
                .unwrap();
        assert!(suite.cache_signer().uses_default_key());
        assert!(suite.paths().allows_symlinks());
        assert!(suite.commands().validate("touch notes.txt").is_valid);
    }
}
