//! Package inspection commands

use colored::Colorize;
use sync_core::PackageResponse;

use crate::context::ServerContext;
use crate::error::Result;

const SHORT_FINGERPRINT: usize = 12;

/// List every cached package with its readiness and fingerprint.
pub fn run_list(ctx: &ServerContext) -> Result<()> {
    let engine = ctx.inspect()?;
    let names = engine.package_names();

    println!("{}", "Cached Packages".bold());
    println!();
    if names.is_empty() {
        println!("  {} (run {} to build)", "None".dimmed(), "packsync check".cyan());
        return Ok(());
    }

    for name in names {
        let Some(package) = engine.package(&name) else {
            continue;
        };
        let state = if package.init {
            "ready".green()
        } else {
            "pending".yellow()
        };
        let fingerprint = package.md5.get(..SHORT_FINGERPRINT).unwrap_or(&package.md5);
        println!(
            "  {:<20} {:<8} {:<12} {}",
            name.cyan(),
            state,
            fingerprint.dimmed(),
            package.base_path
        );
    }
    Ok(())
}

/// Print the client payload of `pack` as pretty JSON.
pub fn run_show(ctx: &ServerContext, pack: &str) -> Result<()> {
    let engine = ctx.inspect()?;
    let view = engine.client_view(pack)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

/// Answer a conditional check for `pack` against `fingerprint`.
pub fn run_query(ctx: &ServerContext, pack: &str, fingerprint: Option<&str>) -> Result<()> {
    let engine = ctx.inspect()?;
    match engine.check_package(pack, fingerprint)? {
        PackageResponse::NotModified => println!("{}", "not modified".green()),
        PackageResponse::Full(view) => println!("{}", serde_json::to_string(&view)?),
    }
    Ok(())
}
