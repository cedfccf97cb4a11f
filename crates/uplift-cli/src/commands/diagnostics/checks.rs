//! Individual doctor checks
//!
//! Checks read the configuration directly instead of building the validator
//! suite, so a strict profile without keys still gets a full report.

use super::types::CheckResult;
use std::path::Path;
use uplift_core::config::{ENV_ALLOWED_DIRS, ENV_CACHE_SECRET_KEY, ENV_PLUGIN_SECRET_KEY};
use uplift_core::{SecurityConfig, SecurityProfile, SecuritySuite};

/// Result of loading the config file named by `--config`
pub fn check_config_file(path: Option<&Path>, loaded: Result<(), String>) -> CheckResult {
    match (path, loaded) {
        (None, _) => CheckResult::pass("Config file", "none given, using environment"),
        (Some(path), Ok(())) => {
            CheckResult::pass("Config file", format!("loaded {}", path.display()))
        }
        (Some(path), Err(e)) => CheckResult::fail("Config file", e)
            .with_hint(format!("Fix or remove {}", path.display())),
    }
}

pub fn check_profile(profile: SecurityProfile) -> CheckResult {
    match profile {
        SecurityProfile::Strict => CheckResult::pass("Profile", "strict"),
        SecurityProfile::Moderate => CheckResult::warn(
            "Profile",
            "moderate: plugin signatures optional, symlinks followed",
        )
        .with_hint("Use --profile strict in production"),
        SecurityProfile::Permissive => {
            CheckResult::warn("Profile", "permissive: plugin permissions unrestricted")
                .with_hint("Permissive is meant for local development only")
        }
    }
}

/// Whether a secret is configured, and what happens when it is not
pub fn check_signing_key(
    name: &str,
    configured: Option<&str>,
    var: &str,
    profile: SecurityProfile,
) -> CheckResult {
    let configured = configured.is_some_and(|k| !k.is_empty());
    if configured {
        CheckResult::pass(name, format!("configured ({})", var))
    } else if profile.allows_default_key() {
        CheckResult::warn(name, "not configured, using the built-in development key")
            .with_hint(format!("Set {}; development signatures are forgeable", var))
    } else {
        CheckResult::fail(name, format!("not configured; {} refuses to start", profile))
            .with_hint(format!("Set {}", var))
    }
}

pub fn check_allowed_directories(config: &SecurityConfig) -> Vec<CheckResult> {
    if config.allowed_directories.is_empty() {
        return vec![
            CheckResult::pass("Allowed directories", "working-directory defaults")
                .with_hint(format!("Set {} to restrict further", ENV_ALLOWED_DIRS)),
        ];
    }

    config
        .allowed_directories
        .iter()
        .map(|dir| {
            let name = format!("Allowed directory {}", dir.display());
            if dir.is_dir() {
                CheckResult::pass(name, "exists")
            } else if dir.exists() {
                CheckResult::fail(name, "not a directory")
            } else {
                CheckResult::warn(name, "does not exist")
                    .with_hint("Paths under it are accepted once it is created")
            }
        })
        .collect()
}

pub fn check_base_directory(config: &SecurityConfig) -> CheckResult {
    match &config.base_directory {
        None => CheckResult::pass("Base directory", "current working directory"),
        Some(dir) if dir.is_dir() => {
            CheckResult::pass("Base directory", dir.display().to_string())
        }
        Some(dir) => CheckResult::fail(
            "Base directory",
            format!("{} is not a directory", dir.display()),
        ),
    }
}

/// The suite builds with this configuration
pub fn check_suite(config: &SecurityConfig) -> CheckResult {
    match SecuritySuite::from_config(config) {
        Ok(suite) => CheckResult::pass(
            "Validators",
            format!(
                "initialized, {} allowed director{}, audit capacity {}",
                suite.paths().allowed_directories().len(),
                if suite.paths().allowed_directories().len() == 1 {
                    "y"
                } else {
                    "ies"
                },
                suite.audit_capacity()
            ),
        ),
        Err(e) => CheckResult::fail("Validators", e.to_string()),
    }
}

pub fn key_checks(config: &SecurityConfig) -> Vec<CheckResult> {
    vec![
        check_signing_key(
            "Plugin signing key",
            config.plugin_secret_key.as_deref(),
            ENV_PLUGIN_SECRET_KEY,
            config.profile,
        ),
        check_signing_key(
            "Cache signing key",
            config.cache_secret_key.as_deref(),
            ENV_CACHE_SECRET_KEY,
            config.profile,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::diagnostics::types::CheckStatus;

    #[test]
    fn test_missing_key_fails_only_in_strict() {
        let strict = check_signing_key("k", None, ENV_PLUGIN_SECRET_KEY, SecurityProfile::Strict);
        let moderate =
            check_signing_key("k", None, ENV_PLUGIN_SECRET_KEY, SecurityProfile::Moderate);
        let set = check_signing_key(
            "k",
            Some("secret"),
            ENV_PLUGIN_SECRET_KEY,
            SecurityProfile::Strict,
        );

        assert_eq!(strict.status, CheckStatus::Fail);
        assert_eq!(moderate.status, CheckStatus::Warn);
        assert_eq!(set.status, CheckStatus::Pass);
        assert!(strict.hint.unwrap().contains(ENV_PLUGIN_SECRET_KEY));
    }

    #[test]
    fn test_empty_key_counts_as_missing() {
        let r = check_signing_key("k", Some(""), ENV_CACHE_SECRET_KEY, SecurityProfile::Strict);
        assert_eq!(r.status, CheckStatus::Fail);
    }

    #[test]
    fn test_allowed_directory_states() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "").unwrap();

        let mut config = SecurityConfig::default();
        config.allowed_directories = vec![
            dir.path().to_path_buf(),
            file,
            dir.path().join("missing"),
        ];
        let statuses: Vec<_> = check_allowed_directories(&config)
            .into_iter()
            .map(|c| c.status)
            .collect();
        assert_eq!(
            statuses,
            vec![CheckStatus::Pass, CheckStatus::Fail, CheckStatus::Warn]
        );
    }

    #[test]
    fn test_suite_check_reports_missing_strict_key() {
        let config = SecurityConfig::for_profile(SecurityProfile::Strict);
        assert_eq!(check_suite(&config).status, CheckStatus::Fail);

        let config = SecurityConfig::for_profile(SecurityProfile::Permissive);
        assert_eq!(check_suite(&config).status, CheckStatus::Pass);
    }
}
