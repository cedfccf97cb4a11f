//! `uplift exec`: validate a command, then run it through the secure executor

use super::Verdict;
use anyhow::Result;
use colored::*;
use uplift_core::SecuritySuite;
use uplift_tools::{SecureExecutor, ShellSession, ToolError};

pub async fn exec(suite: &SecuritySuite, command: &str, json: bool) -> Result<Verdict> {
    run(&SecureExecutor::from_suite(suite), command, json).await
}

async fn run<S: ShellSession>(
    executor: &SecureExecutor<S>,
    command: &str,
    json: bool,
) -> Result<Verdict> {
    match executor.execute(command).await {
        Ok(output) => {
            if json {
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                print!("{}", output.stdout);
                eprint!("{}", output.stderr);
            }
            Ok(if output.success() {
                Verdict::Accepted
            } else {
                Verdict::Failed
            })
        }
        Err(ToolError::Security(err)) if err.is_security_violation() => {
            if json {
                let body = serde_json::json!({
                    "error": err.error_code(),
                    "reason": err.reason(),
                });
                println!("{}", serde_json::to_string_pretty(&body)?);
            } else {
                eprintln!("{} {}", "✗".red().bold(), err.to_string().red());
            }
            Ok(Verdict::Rejected)
        }
        Err(err) => Err(err.into()),
    }
}
