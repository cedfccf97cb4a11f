//! Security configuration from a JSON file and `UPLIFT_*` environment variables

use crate::error::{ConfigError, SecurityError};
use crate::security::{
    CommandPolicy, DEFAULT_AUDIT_CAPACITY, PathPolicy, PluginPolicy, SecurityProfile, SigningKey,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_PROFILE: &str = "UPLIFT_SECURITY_PROFILE";
pub const ENV_PLUGIN_SECRET_KEY: &str = "UPLIFT_PLUGIN_SECRET_KEY";
pub const ENV_CACHE_SECRET_KEY: &str = "UPLIFT_CACHE_SECRET_KEY";
pub const ENV_ALLOWED_DIRS: &str = "UPLIFT_ALLOWED_DIRS";
pub const ENV_BASE_DIR: &str = "UPLIFT_BASE_DIR";
pub const ENV_AUDIT_CAPACITY: &str = "UPLIFT_AUDIT_CAPACITY";

/// Everything needed to construct the validators once at startup
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub profile: SecurityProfile,
    #[serde(skip_serializing)]
    pub plugin_secret_key: Option<String>,
    #[serde(skip_serializing)]
    pub cache_secret_key: Option<String>,
    /// Empty means the working-directory defaults
    pub allowed_directories: Vec<PathBuf>,
    pub base_directory: Option<PathBuf>,
    pub audit_capacity: usize,
    /// Extra command names treated as safe
    pub command_whitelist: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            profile: SecurityProfile::default(),
            plugin_secret_key: None,
            cache_secret_key: None,
            allowed_directories: Vec::new(),
            base_directory: None,
            audit_capacity: DEFAULT_AUDIT_CAPACITY,
            command_whitelist: Vec::new(),
        }
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |k: &Option<String>| k.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("SecurityConfig")
            .field("profile", &self.profile)
            .field("plugin_secret_key", &redact(&self.plugin_secret_key))
            .field("cache_secret_key", &redact(&self.cache_secret_key))
            .field("allowed_directories", &self.allowed_directories)
            .field("base_directory", &self.base_directory)
            .field("audit_capacity", &self.audit_capacity)
            .field("command_whitelist", &self.command_whitelist)
            .finish()
    }
}

impl SecurityConfig {
    pub fn for_profile(profile: SecurityProfile) -> Self {
        Self {
            profile,
            ..Self::default()
        }
    }

    /// Defaults overridden by the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().apply_overrides(|name| env::var(name).ok())
    }

    /// Defaults overridden by `lookup`, which stands in for the environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Self::default().apply_overrides(lookup)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// File values, then environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::from_file(path)?.apply_overrides(|name| env::var(name).ok())?;
        debug!(path = %path.display(), profile = %config.profile, "security config loaded");
        Ok(config)
    }

    pub fn apply_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup(ENV_PROFILE) {
            self.profile = profile.parse()?;
        }
        if let Some(key) = lookup(ENV_PLUGIN_SECRET_KEY).filter(|k| !k.is_empty()) {
            self.plugin_secret_key = Some(key);
        }
        if let Some(key) = lookup(ENV_CACHE_SECRET_KEY).filter(|k| !k.is_empty()) {
            self.cache_secret_key = Some(key);
        }
        if let Some(dirs) = lookup(ENV_ALLOWED_DIRS) {
            self.allowed_directories = env::split_paths(&dirs)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
        }
        if let Some(base) = lookup(ENV_BASE_DIR).filter(|b| !b.is_empty()) {
            self.base_directory = Some(PathBuf::from(base));
        }
        if let Some(capacity) = lookup(ENV_AUDIT_CAPACITY) {
            self.audit_capacity = capacity
                .trim()
                .parse()
                .ok()
                .filter(|c| *c > 0)
                .ok_or_else(|| {
                    ConfigError::invalid_value(ENV_AUDIT_CAPACITY, "expected a positive integer")
                })?;
        }
        Ok(self)
    }

    pub fn plugin_signing_key(&self) -> Result<SigningKey, SecurityError> {
        SigningKey::resolve(
            self.plugin_secret_key.as_deref(),
            ENV_PLUGIN_SECRET_KEY,
            self.profile,
        )
    }

    pub fn cache_signing_key(&self) -> Result<SigningKey, SecurityError> {
        SigningKey::resolve(
            self.cache_secret_key.as_deref(),
            ENV_CACHE_SECRET_KEY,
            self.profile,
        )
    }

    pub fn command_policy(&self) -> CommandPolicy {
        CommandPolicy::for_profile(self.profile).with_whitelisted(self.command_whitelist.iter().cloned())
    }

    pub fn path_policy(&self) -> PathPolicy {
        PathPolicy {
            base_directory: self.base_directory.clone(),
            ..PathPolicy::for_profile(self.profile, self.allowed_directories.clone())
        }
    }

    pub fn plugin_policy(&self) -> PluginPolicy {
        PluginPolicy::for_profile(self.profile)
    }
}
