//! `uplift check`: run one validator and report its decision

use super::{Verdict, report};
use crate::args::CheckTarget;
use anyhow::{Context, Result, bail};
use std::fs;
use uplift_core::{SecuritySuite, ValidationOutcome};

pub fn check(suite: &SecuritySuite, target: &CheckTarget, json: bool) -> Result<Verdict> {
    let outcome: ValidationOutcome = match target {
        CheckTarget::Command { command } => suite.commands().validate(command).into(),
        CheckTarget::Path {
            path,
            mode,
            allow_dirs,
        } => {
            let paths = suite.paths();
            for dir in allow_dirs {
                if !dir.is_dir() {
                    bail!("allowed directory {} is not a directory", dir.display());
                }
                paths
                    .add_allowed_directory(dir)
                    .with_context(|| format!("cannot allow directory {}", dir.display()))?;
            }
            paths.validate(path, *mode).into()
        }
        CheckTarget::Identifier { name, kind } => {
            let mut result = suite.identifiers().validate_identifier(name, *kind);
            if !result.is_valid {
                result.sanitized = suite.identifiers().sanitize_identifier(name, *kind).sanitized;
            }
            result.into()
        }
        CheckTarget::Query { sql } => suite.injections().detect_injection(sql).into(),
        CheckTarget::Plugin { file, signature } => {
            let signature = signature
                .as_deref()
                .map(|path| {
                    fs::read_to_string(path)
                        .with_context(|| format!("cannot read signature {}", path.display()))
                })
                .transpose()?;
            suite
                .plugins()
                .validate_plugin_file_signed_json(file, signature.as_deref())
                .into()
        }
    };
    report(outcome, json)
}
