//! Command routing logic for CLI

use crate::args::{Cli, Commands};
use crate::commands::{self, Verdict, build_suite, load_config};
use anyhow::Result;
use tracing::debug;
use uplift_core::SecuritySuite;

/// Route CLI commands to their respective handlers
pub async fn route(cli: Cli) -> Result<Verdict> {
    match &cli.command {
        // Doctor reports configuration problems instead of failing on them
        Commands::Doctor => {
            commands::diagnostics::doctor(cli.config.as_deref(), cli.profile, cli.json)
        }
        Commands::Check { target } => commands::check::check(&suite(&cli)?, target, cli.json),
        Commands::Sign { file } => commands::sign::sign(&suite(&cli)?, file),
        Commands::Exec { command } => {
            commands::exec::exec(&suite(&cli)?, command, cli.json).await
        }
    }
}

fn suite(cli: &Cli) -> Result<SecuritySuite> {
    let config = load_config(cli.config.as_deref(), cli.profile)?;
    debug!(profile = %config.profile, "security config resolved");
    build_suite(&config)
}
