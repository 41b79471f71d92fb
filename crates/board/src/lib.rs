//! Board manifests for ARM XMC targets.
//!
//! A board is described by one JSON file per identifier (`<boards_dir>/<id>.json`)
//! carrying its CPU, debug-probe and upload metadata:
//!
//! ```json
//! {
//!   "name": "XMC4700 Relax Kit",
//!   "build": { "cpu": "cortex-m4", "family": "XMC4700", "variant": "XMC4700", "f_cpu": "144000000L" },
//!   "debug": { "jlink_device": "XMC4700-2048" },
//!   "upload": { "protocol": "jlink", "maximum_size": 2048000 }
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`]: `BoardConfig` record and dotted-key lookup
//! - [`upload`]: `UploadOptions` toggles read by upload preparation
//! - [`registry`]: `BoardRegistry` directory loader

#![deny(clippy::unwrap_used)]
#![deny(clippy::panic)]
#![deny(clippy::expect_used)]

pub mod config;
pub mod registry;
pub mod upload;

pub use config::{BoardConfig, BuildSection, DebugSection};
pub use registry::BoardRegistry;
pub use upload::{ExtraFlags, UploadOptions};

use std::path::PathBuf;

/// Error type for loading and looking up board manifests.
#[derive(Debug, thiserror::Error)]
pub enum BoardError {
    /// No manifest is registered under this identifier.
    #[error("unknown board `{id}`")]
    NotFound {
        /// The identifier that was requested.
        id: String,
    },
    /// A manifest or the boards directory could not be read.
    #[error("failed to read {}", path.display())]
    Io {
        /// File or directory being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A manifest is not valid JSON or misses a required field.
    #[error("invalid board manifest {}", path.display())]
    Parse {
        /// Manifest path (empty when parsed from a string).
        path: PathBuf,
        /// Underlying decode error.
        #[source]
        source: serde_json::Error,
    },
}
