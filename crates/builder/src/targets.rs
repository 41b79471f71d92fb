//! Build targets and the order they run in.
//!
//! | target     | produces              | depends on | always build |
//! |------------|-----------------------|------------|--------------|
//! | `buildprog`| `<build>/firmware.elf`| -          | no           |
//! | `hex`      | `<build>/firmware.hex`| `buildprog`| no           |
//! | `size`     | size report           | `buildprog`| yes          |
//! | `upload`   | flashed device        | `hex`      | yes          |
//!
//! With no target requested, `hex` and `size` run.

use std::path::Path;
use std::time::SystemTime;

use crate::upload::PROGRAM_TARGET;

/// A registered build target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Target {
    /// Compile and link the firmware ELF.
    Program,
    /// Convert the ELF to Intel HEX.
    Hex,
    /// Print flash/RAM usage.
    Size,
    /// Flash the device.
    Upload,
}

/// Unknown target name on the command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown target `{0}` (expected buildprog, hex, size, upload or program)")]
pub struct UnknownTarget(pub String);

impl Target {
    /// Every target, in registration order.
    pub const ALL: [Self; 4] = [Self::Program, Self::Hex, Self::Size, Self::Upload];

    /// Targets built when none is requested.
    pub const DEFAULTS: [Self; 2] = [Self::Hex, Self::Size];

    /// Command-line name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Program => "buildprog",
            Self::Hex => "hex",
            Self::Size => "size",
            Self::Upload => "upload",
        }
    }

    /// Parse a command-line name.
    ///
    /// `program` is an upload through the debug probe that skips serial
    /// upload preparation, so it maps to [`Target::Upload`].
    pub fn from_name(name: &str) -> Result<Self, UnknownTarget> {
        match name {
            "buildprog" | "elf" => Ok(Self::Program),
            "hex" => Ok(Self::Hex),
            "size" => Ok(Self::Size),
            "upload" | PROGRAM_TARGET => Ok(Self::Upload),
            other => Err(UnknownTarget(other.to_owned())),
        }
    }

    /// Size and upload are never considered up to date.
    pub fn always_build(self) -> bool {
        matches!(self, Self::Size | Self::Upload)
    }

    /// Direct prerequisites.
    pub fn dependencies(self) -> &'static [Self] {
        match self {
            Self::Program => &[],
            Self::Hex | Self::Size => &[Self::Program],
            Self::Upload => &[Self::Hex],
        }
    }
}

/// Expand `requested` into an execution order: prerequisites first, each
/// target once. An empty request builds [`Target::DEFAULTS`].
pub fn plan(requested: &[Target]) -> Vec<Target> {
    fn visit(target: Target, order: &mut Vec<Target>) {
        if order.contains(&target) {
            return;
        }
        for dep in target.dependencies() {
            visit(*dep, order);
        }
        order.push(target);
    }

    let roots: &[Target] = if requested.is_empty() {
        &Target::DEFAULTS
    } else {
        requested
    };
    let mut order = Vec::new();
    for target in roots {
        visit(*target, &mut order);
    }
    order
}

fn modified(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Whether `target` must run to produce `output` from `inputs`.
///
/// Always-build targets always run; others run when the output is missing or
/// older than any input.
pub fn needs_rebuild(target: Target, output: &Path, inputs: &[&Path]) -> bool {
    if target.always_build() {
        return true;
    }
    let Some(built) = modified(output) else {
        return true;
    };
    inputs
        .iter()
        .any(|input| modified(input).map_or(true, |changed| changed > built))
}
