use anyhow::{Context, Result};
use builder::ToolCommand;
use colored::Colorize;
use std::process::Output;

/// Run `cmd` capturing its output; on failure print stderr and bail.
pub fn capture(cmd: &ToolCommand, what: &str) -> Result<Output> {
    tracing::debug!(command = %cmd, "running");
    let output = cmd
        .to_command()
        .output()
        .with_context(|| format!("Failed to run {}. Is it installed and on PATH?", cmd.program))?;

    if !output.status.success() {
        eprintln!("{}", format!("✗ {what} failed").red().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&output.stderr));
        anyhow::bail!("{what} failed");
    }
    Ok(output)
}

/// Run `cmd` with inherited stdio, for long-running tools like uploaders.
pub fn stream(cmd: &ToolCommand, what: &str) -> Result<()> {
    tracing::debug!(command = %cmd, "running");
    let status = cmd
        .to_command()
        .status()
        .with_context(|| format!("Failed to run {}. Is it installed and on PATH?", cmd.program))?;

    if !status.success() {
        eprintln!();
        eprintln!("{}", format!("✗ {what} failed").red().bold());
        anyhow::bail!("{what} failed");
    }
    Ok(())
}
