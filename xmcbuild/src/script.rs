use anyhow::{Context, Result};
use colored::Colorize;

use crate::project::Project;
use crate::run;

/// Write the J-Link commander script without building anything.
pub fn run(project: &mut Project) -> Result<()> {
    let board = project
        .board
        .as_ref()
        .context("No board configured; pass --board or set `board` in xmcbuild.toml")?;
    builder::jlink::device(board)?;

    run::refresh_jlink_script(project)?;
    let script = project
        .env
        .upload
        .jlink_script
        .as_ref()
        .context("Upload protocol is not `jlink`; no commander script is used")?;

    println!("{}", format!("✓ Wrote {}", script.display()).green());
    Ok(())
}
