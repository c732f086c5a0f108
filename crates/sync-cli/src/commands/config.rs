//! Configuration display command

use colored::Colorize;

use crate::context::ServerContext;
use crate::error::Result;

/// Display the effective server configuration with resolved paths.
pub fn run_config(ctx: &ServerContext, json: bool) -> Result<()> {
    let config = &ctx.config;

    if json {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let found = if ctx.config_path.exists() {
        "".normal()
    } else {
        " (not found, using defaults)".yellow()
    };

    println!("{}", "Server Configuration".bold());
    println!();
    println!("  {:<14} {}{}", "Config:".dimmed(), ctx.config_path, found);
    println!("  {:<14} {:?}", "Rule source:".dimmed(), config.sync.source);
    println!("  {:<14} {}", "Rules:".dimmed(), ctx.resolve(&config.sync.rules_file));
    println!("  {:<14} {}", "Cache:".dimmed(), ctx.resolve(&config.sync.cache_file));
    println!("  {:<14} {}", "Files:".dimmed(), ctx.resolve(&config.sync.file_base_path));
    println!("  {:<14} {}", "Rule store:".dimmed(), ctx.resolve(&config.sync.store_file));
    println!();
    println!(
        "  {:<14} {} calls / {} ms",
        "Call limit:".dimmed(),
        config.call_limit.count,
        config.call_limit.window_ms
    );
    println!(
        "  {:<14} every {} ms",
        "Cache clear:".dimmed(),
        config.status_cache.clear_interval_ms
    );
    println!("  {:<14} {}", "Log filter:".dimmed(), config.logging.filter);
    Ok(())
}
