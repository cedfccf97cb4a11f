//! CLI argument definitions using clap
//!
//! - uplift check command "ls -la"     # Classify without running
//! - uplift check path ./src/main.rs   # Confinement check
//! - uplift sign plugin.py             # Emit a signature JSON
//! - uplift exec "git status"          # Validate, then run
//! - uplift doctor                     # Report configuration health

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use uplift_core::{AccessMode, IdentifierKind, SecurityProfile};

#[derive(Parser, Debug)]
#[command(name = "uplift")]
#[command(about = "Uplift - validate commands, paths, SQL and plugins before they run")]
#[command(version)]
pub struct Cli {
    /// Security profile (overrides UPLIFT_SECURITY_PROFILE and the config file)
    #[arg(long, global = true)]
    pub profile: Option<SecurityProfile>,

    /// Path to a JSON security configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Emit log lines as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate input without acting on it
    Check {
        #[command(subcommand)]
        target: CheckTarget,
    },

    /// Sign a plugin file with the configured plugin key
    Sign {
        /// Plugin source file
        file: PathBuf,
    },

    /// Validate a shell command and run it when accepted
    Exec {
        /// Command line, passed as a single argument
        command: String,
    },

    /// Check profile, key sourcing and allowed directories
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum CheckTarget {
    /// Classify a shell command
    Command {
        /// Command line, passed as a single argument
        command: String,
    },

    /// Check that a path stays inside the allowed directories
    Path {
        path: PathBuf,

        /// Intended access
        #[arg(long, default_value = "read")]
        mode: AccessMode,

        /// Additional allowed directory (repeatable)
        #[arg(long = "allow-dir")]
        allow_dirs: Vec<PathBuf>,
    },

    /// Validate a SQL identifier
    Identifier {
        name: String,

        /// What the identifier names
        #[arg(long, default_value = "table")]
        kind: IdentifierKind,
    },

    /// Scan a SQL string for injection patterns
    Query { sql: String },

    /// Run static analysis and signature checks on a plugin file
    Plugin {
        file: PathBuf,

        /// JSON signature file produced by `uplift sign`
        #[arg(long)]
        signature: Option<PathBuf>,
    },
}
