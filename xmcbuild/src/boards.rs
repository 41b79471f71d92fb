use anyhow::{Context, Result};
use board::BoardRegistry;
use colored::Colorize;
use std::path::Path;

/// List the boards found in `dir`.
pub fn run(dir: &Path) -> Result<()> {
    let registry = BoardRegistry::open(dir)
        .with_context(|| format!("Failed to load boards from {}", dir.display()))?;

    println!("{}", format!("📋 Boards in {}", dir.display()).cyan().bold());
    if registry.ids().next().is_none() {
        println!("   {}", "(none)".dimmed());
        return Ok(());
    }
    for id in registry.ids() {
        let board = registry.get(id)?;
        println!(
            "   {} {} {}",
            format!("{id:<24}").bold(),
            board.name,
            format!("({})", board.build.cpu).dimmed()
        );
    }
    Ok(())
}
