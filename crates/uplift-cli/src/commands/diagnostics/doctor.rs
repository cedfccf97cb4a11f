//! Doctor command implementation

use super::checks::{
    check_allowed_directories, check_base_directory, check_config_file, check_profile,
    check_suite, key_checks,
};
use super::types::{CheckResult, CheckStatus};
use crate::commands::{Verdict, load_config};
use anyhow::Result;
use colored::*;
use std::path::Path;
use uplift_core::{SecurityConfig, SecurityProfile};

/// Report configuration health; any failed check exits non-zero
pub fn doctor(
    config_file: Option<&Path>,
    profile: Option<SecurityProfile>,
    json: bool,
) -> Result<Verdict> {
    let (config, loaded) = match load_config(config_file, profile) {
        Ok(config) => (config, Ok(())),
        Err(e) => (
            SecurityConfig::for_profile(profile.unwrap_or_default()),
            Err(format!("{:#}", e)),
        ),
    };

    let mut checks = vec![check_config_file(config_file, loaded)];
    checks.push(check_profile(config.profile));
    checks.extend(key_checks(&config));
    checks.push(check_base_directory(&config));
    checks.extend(check_allowed_directories(&config));
    checks.push(check_suite(&config));

    let failed = checks.iter().any(|c| c.status == CheckStatus::Fail);
    if json {
        println!("{}", serde_json::to_string_pretty(&checks)?);
    } else {
        print_report(&checks);
    }

    Ok(if failed {
        Verdict::Failed
    } else {
        Verdict::Accepted
    })
}

fn print_report(checks: &[CheckResult]) {
    println!();
    println!("{}", "Uplift Security Check".bold().underline());
    println!("{}", "=".repeat(50).dimmed());
    println!();

    let mut pass_count = 0;
    let mut warn_count = 0;
    let mut fail_count = 0;

    for check in checks {
        println!("{} {} - {}", check.icon(), check.name.bold(), check.message);

        if let Some(hint) = &check.hint {
            println!("    {} {}", "→".dimmed(), hint.dimmed());
        }

        match check.status {
            CheckStatus::Pass => pass_count += 1,
            CheckStatus::Warn => warn_count += 1,
            CheckStatus::Fail => fail_count += 1,
        }
    }

    println!();
    println!("{}", "-".repeat(50).dimmed());
    println!(
        "Summary: {} passed, {} warnings, {} failed",
        pass_count.to_string().green(),
        warn_count.to_string().yellow(),
        fail_count.to_string().red()
    );
    println!();

    if fail_count > 0 {
        println!(
            "{} {}",
            "✗".red().bold(),
            "Some checks failed. Please fix the issues above.".red()
        );
    } else if warn_count > 0 {
        println!(
            "{} {}",
            "⚠".yellow().bold(),
            "Some checks have warnings. Consider addressing them.".yellow()
        );
    } else {
        println!("{} {}", "✓".green().bold(), "All checks passed.".green());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreadable_config_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();

        let verdict = doctor(Some(&path), Some(SecurityProfile::Permissive), true).unwrap();
        assert_eq!(verdict, Verdict::Failed);
    }

    #[test]
    fn test_strict_without_keys_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security.json");
        let config = serde_json::json!({
            "profile": "strict",
            "allowed_directories": [dir.path()],
            "base_directory": dir.path(),
        });
        std::fs::write(&path, config.to_string()).unwrap();

        let verdict = doctor(Some(&path), None, true).unwrap();
        assert_eq!(verdict, Verdict::Failed);
    }

    #[test]
    fn test_configured_strict_setup_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("security.json");
        let config = serde_json::json!({
            "profile": "strict",
            "plugin_secret_key": "doctor-plugin-key",
            "cache_secret_key": "doctor-cache-key",
            "allowed_directories": [dir.path()],
            "base_directory": dir.path(),
        });
        std::fs::write(&path, config.to_string()).unwrap();

        let verdict = doctor(Some(&path), None, false).unwrap();
        assert_eq!(verdict, Verdict::Accepted);
    }
}
