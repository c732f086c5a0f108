//! packsync
//!
//! Operator command-line interface for the launcher package sync cache.

mod cli;
mod commands;
mod context;
mod error;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::ServerContext;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;
    let ctx = ServerContext::load(&cwd, &cli.config)?;

    let filter = if cli.verbose {
        "debug"
    } else {
        ctx.config.logging.filter.as_str()
    };
    sync_core::logging::init(filter)?;
    tracing::debug!("Verbose mode enabled");

    execute_command(&ctx, cli.command)
}

fn execute_command(ctx: &ServerContext, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Check { force, json } => commands::run_check(ctx, force, json),
        Commands::List => commands::run_list(ctx),
        Commands::Show { pack } => commands::run_show(ctx, &pack),
        Commands::Query { pack, fingerprint } => commands::run_query(ctx, &pack, fingerprint.as_deref()),
        Commands::Config { json } => commands::run_config(ctx, json),
    }
}
