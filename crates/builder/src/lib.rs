//! Firmware build environment and upload sequencing for ARM XMC boards.
//!
//! # Architecture Layers
//!
//! ```text
//! xmcbuild (CLI: project config, target runner)
//!         ↓
//! builder (this crate: environment, board flags, hex rule, upload plan)
//!         ↓
//! board (manifests)          arm-none-eabi-*, JLinkExe, serial ports, sysfs GPIO
//! ```
//!
//! # Modules
//!
//! - [`env`]: `BuildEnv` and tool command rendering
//! - [`configure`]: base `arm-none-eabi` environment
//! - [`board_flags`]: CPU flags, math defines, linker script
//! - [`hex`]: ELF → Intel HEX rule
//! - [`upload`]: upload preparation plan and execution
//! - [`gpio`]: sysfs GPIO reset pulse
//! - [`serial`]: port enumeration, flush, 1200-bps touch
//! - [`jlink`]: J-Link commander script
//! - [`targets`]: target registry and execution order
//!
//! # Example
//!
//! ```no_run
//! use builder::{board_flags, configure};
//! use board::BoardRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let boards = BoardRegistry::open(std::path::Path::new("boards"))?;
//! let mut env = configure::configure(".xmcbuild/xmc4700", "framework-arduinoxmc");
//! board_flags::augment(&mut env, boards.get("xmc4700_relax_kit")?)?;
//! configure::finalize(&mut env);
//! # Ok(())
//! # }
//! ```

// ── Lint policy ─────────────────────────────────────────────────────────────
#![deny(clippy::unwrap_used)] // no .unwrap() in production code
#![deny(clippy::expect_used)] // no .expect() in production code
#![deny(clippy::panic)] // no panic!() in production code
#![deny(unused_must_use)]
// all Results must be handled
// ────────────────────────────────────────────────────────────────────────────
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
// Struct fields of the environment are self-describing.
#![allow(missing_docs)]

pub mod board_flags;
pub mod command;
pub mod configure;
pub mod env;
pub mod gpio;
pub mod hex;
pub mod jlink;
pub mod mocks;
pub mod serial;
pub mod targets;
pub mod upload;

pub use board_flags::{augment, AugmentError, MathLibrary};
pub use command::ToolCommand;
pub use configure::{configure, finalize};
pub use env::{BuildEnv, Define, Flags, Toolchain, UploadSettings};
pub use gpio::{reset_pin, ResetLine, SysfsGpio};
pub use hex::HexRule;
pub use serial::{PortInfo, PortProbe, SerialError, SystemPorts};
pub use targets::{plan, Target};
pub use upload::{execute, prepare, PreparedUpload, ResetStep, UploadContext, UploadError, UploadPlan};
