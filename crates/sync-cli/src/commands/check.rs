//! Sync pass command

use colored::Colorize;
use sync_core::CancelFlag;

use crate::context::ServerContext;
use crate::error::Result;

/// Run one pass of the sync pipeline and report what it touched.
pub fn run_check(ctx: &ServerContext, force: bool, json: bool) -> Result<()> {
    let engine = ctx.engine()?;
    let cancel = CancelFlag::new();
    let report = if force {
        engine.rebuild_all(&cancel)?
    } else {
        engine.check_sync_cache(&cancel)?
    };

    if json {
        let output = serde_json::json!({
            "built": report.built,
            "failed": report.failed,
            "unchanged": report.unchanged,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", "Sync pass complete".bold());
    println!();
    for name in &report.built {
        println!("  {} {}", "+".green(), name.cyan());
    }
    for name in &report.failed {
        println!("  {} {} ({})", "!".red(), name.cyan(), "failed".red());
    }
    println!();
    println!(
        "{} built, {} failed, {} unchanged",
        report.built.len(),
        report.failed.len(),
        report.unchanged
    );
    println!("{}:  {}", "Cache".dimmed(), engine.snapshot_path());
    Ok(())
}
