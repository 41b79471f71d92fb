//! Target dispatch: expand the requested targets and run them in order.

use anyhow::{Context, Result};
use builder::targets::{self, Target};
use builder::{jlink, HexRule};
use colored::Colorize;
use std::path::PathBuf;
use std::time::Instant;

use crate::build::{self, FIRMWARE};
use crate::project::Project;
use crate::{size, upload};

/// Parse target names; `program` stays in `names` so upload preparation sees it.
pub fn parse_targets(names: &[String]) -> Result<Vec<Target>> {
    names
        .iter()
        .map(|name| Target::from_name(name).map_err(anyhow::Error::from))
        .collect()
}

/// Paths of the firmware artifacts for this project.
pub fn artifacts(project: &Project) -> (PathBuf, PathBuf) {
    let elf = project.env.program_path(FIRMWARE);
    let hex = HexRule::HEX.target(&project.env.build_dir, FIRMWARE);
    (elf, hex)
}

/// Regenerate the J-Link commander script for the hex image.
///
/// Only meaningful when uploading through J-Link with a board that names its
/// device; otherwise this is a no-op.
pub fn refresh_jlink_script(project: &mut Project) -> Result<()> {
    if !project.uses_jlink() {
        return Ok(());
    }
    let has_device = project
        .board
        .as_ref()
        .is_some_and(|board| jlink::device(board).is_ok());
    if !has_device {
        return Ok(());
    }
    let (_, hex) = artifacts(project);
    let script = jlink::write_script(&project.env.build_dir, &hex)?;
    project.env.upload.jlink_script = Some(script);
    Ok(())
}

/// Build `names` (the defaults when empty).
pub fn run(project: &mut Project, names: &[String]) -> Result<()> {
    let requested = parse_targets(names)?;
    let order = targets::plan(&requested);
    tracing::debug!(
        targets = %order.iter().map(|t| t.name()).collect::<Vec<_>>().join(" "),
        "build order"
    );

    let start = Instant::now();
    refresh_jlink_script(project)?;

    let (elf, hex) = artifacts(project);
    for target in order {
        match target {
            Target::Program => {
                build::program(project)?;
            }
            Target::Hex => build::hex(project, &elf, &hex)?,
            Target::Size => size::run(project, &elf)?,
            Target::Upload => upload::run(project, &hex, names)
                .with_context(|| format!("Failed to upload {}", hex.display()))?,
        }
    }

    println!();
    println!(
        "{}",
        format!("✓ Done in {:.2}s", start.elapsed().as_secs_f64())
            .green()
            .bold()
    );
    Ok(())
}
