//! Uplift command-line interface
//!
//! A thin front end over the validators in `uplift-core` and the secure
//! executor in `uplift-tools`. Exit status is 0 when the input is accepted,
//! 2 when it is rejected and 1 on any other error.

mod args;
mod commands;
mod router;

use args::Cli;
use clap::Parser;
use colored::*;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    match router::route(cli).await {
        Ok(verdict) => verdict.exit_code(),
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays parseable
fn init_tracing(verbose: bool, json: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
