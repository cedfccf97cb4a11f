//! Command implementations

pub mod check;
pub mod diagnostics;
pub mod exec;
pub mod sign;

use anyhow::{Context, Result};
use colored::*;
use std::path::Path;
use std::process::ExitCode;
use uplift_core::{SecurityConfig, SecurityProfile, SecuritySuite, ValidationOutcome};

/// How a command finished, mapped onto the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    Rejected,
    /// Ran to completion but reported a failure (a failed doctor check, a non-zero child)
    Failed,
}

impl Verdict {
    pub fn exit_code(self) -> ExitCode {
        match self {
            Verdict::Accepted => ExitCode::SUCCESS,
            Verdict::Rejected => ExitCode::from(2),
            Verdict::Failed => ExitCode::from(1),
        }
    }

    fn from_valid(is_valid: bool) -> Self {
        if is_valid {
            Verdict::Accepted
        } else {
            Verdict::Rejected
        }
    }
}

/// Config file (when given) and environment, with the `--profile` flag applied last
pub fn load_config(path: Option<&Path>, profile: Option<SecurityProfile>) -> Result<SecurityConfig> {
    let mut config = match path {
        Some(path) => SecurityConfig::load(path)
            .with_context(|| format!("failed to load security config from {}", path.display()))?,
        None => SecurityConfig::from_env().context("invalid UPLIFT_* environment")?,
    };
    if let Some(profile) = profile {
        config.profile = profile;
    }
    Ok(config)
}

pub fn build_suite(config: &SecurityConfig) -> Result<SecuritySuite> {
    SecuritySuite::from_config(config).context("failed to initialize security validators")
}

/// Print one validator result and turn it into a verdict
pub fn report(outcome: ValidationOutcome, json: bool) -> Result<Verdict> {
    let verdict = Verdict::from_valid(outcome.is_valid());
    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(verdict);
    }

    let (icon, label) = if outcome.is_valid() {
        ("✓".green().bold(), "accepted".green())
    } else {
        ("✗".red().bold(), "rejected".red())
    };
    println!(
        "{} {} {} [{}] {}",
        icon,
        outcome.family().bold(),
        label,
        outcome.risk_label(),
        outcome.reason()
    );

    match &outcome {
        ValidationOutcome::Command(r) => {
            if let Some(sanitized) = &r.sanitized_command {
                println!("    {} {}", "→".dimmed(), sanitized.dimmed());
            }
        }
        ValidationOutcome::Path(r) => {
            if let Some(resolved) = &r.resolved_path {
                println!("    {} {}", "resolved:".dimmed(), resolved.display());
            }
            if let Some(dir) = &r.allowed_directory {
                println!("    {} {}", "under:".dimmed(), dir.display());
            }
        }
        ValidationOutcome::Sql(r) => {
            if let Some(sanitized) = &r.sanitized {
                println!("    {} {}", "sanitized:".dimmed(), sanitized);
            }
        }
        ValidationOutcome::Plugin(r) => {
            println!(
                "    {} signature {}, static analysis {}",
                "·".dimmed(),
                pass_word(r.signature_valid),
                pass_word(r.static_analysis_passed)
            );
            if !r.permissions_required.is_empty() {
                let perms: Vec<_> = r.permissions_required.iter().map(|p| p.as_str()).collect();
                println!("    {} {}", "permissions:".dimmed(), perms.join(", "));
            }
            for pattern in &r.dangerous_patterns {
                println!("    {} {}", "!".yellow(), pattern);
            }
        }
    }
    Ok(verdict)
}

fn pass_word(ok: bool) -> ColoredString {
    if ok { "ok".green() } else { "failed".red() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uplift_core::{CommandRisk, CommandValidation, SqlRisk, SqlValidation};

    #[test]
    fn test_verdict_follows_validity() {
        let accepted: ValidationOutcome =
            CommandValidation::accept(CommandRisk::Safe, "ok", "ls".to_string()).into();
        let rejected: ValidationOutcome =
            SqlValidation::reject(SqlRisk::Dangerous, "contains comment").into();

        assert_eq!(report(accepted, true).unwrap(), Verdict::Accepted);
        assert_eq!(report(rejected, false).unwrap(), Verdict::Rejected);
    }

    #[test]
    fn test_profile_flag_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security.json");
        std::fs::write(&path, r#"{"profile": "strict", "audit_capacity": 50}"#).unwrap();

        let config = load_config(Some(&path), Some(SecurityProfile::Permissive)).unwrap();
        assert_eq!(config.profile, SecurityProfile::Permissive);
        assert_eq!(config.audit_capacity, 50);
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(Some(&dir.path().join("absent.json")), None).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to load security config"));
    }
}
