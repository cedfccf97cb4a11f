//! `uplift sign`: produce a plugin signature with the configured key

use super::Verdict;
use anyhow::{Context, Result};
use colored::*;
use std::fs;
use std::path::Path;
use uplift_core::{PluginSignature, SecuritySuite};

pub fn sign(suite: &SecuritySuite, file: &Path) -> Result<Verdict> {
    let signature = signature_for(suite, file)?;
    if suite.plugins().signer().uses_default_key() {
        eprintln!(
            "{} {}",
            "⚠".yellow().bold(),
            "signed with the built-in development key; set UPLIFT_PLUGIN_SECRET_KEY".yellow()
        );
    }
    println!("{}", signature.to_json()?);
    Ok(Verdict::Accepted)
}

fn signature_for(suite: &SecuritySuite, file: &Path) -> Result<PluginSignature> {
    let code = fs::read_to_string(file)
        .with_context(|| format!("cannot read plugin {}", file.display()))?;
    suite
        .plugins()
        .generate_signature(&code)
        .context("failed to sign plugin")
}
