//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// packsync - Inspect and rebuild the launcher package sync cache
#[derive(Parser, Debug)]
#[command(name = "packsync")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server configuration file; relative paths inside it resolve against
    /// its directory
    #[arg(short, long, global = true, env = "PACKSYNC_CONFIG", default_value = "packsync.toml")]
    pub config: PathBuf,

    /// The command to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Run one sync pass: refresh rules, rebuild stale packages, persist
    ///
    /// Examples:
    ///   packsync check            # Rebuild changed rules only
    ///   packsync check --force    # Re-walk every package
    Check {
        /// Re-walk every package even when its rule is unchanged
        #[arg(long)]
        force: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// List cached packages
    List,

    /// Print the client payload of a package
    Show {
        /// Package name
        pack: String,
    },

    /// Conditional check as a launcher performs it
    Query {
        /// Package name
        pack: String,

        /// Fingerprint the launcher already holds
        #[arg(short, long)]
        fingerprint: Option<String>,
    },

    /// Show the effective server configuration
    Config {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
