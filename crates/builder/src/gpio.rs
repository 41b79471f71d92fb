//! Hardware reset through the Linux sysfs GPIO interface.
//!
//! Boards mounted on a Raspberry Pi have their reset line wired to a host GPIO.
//! A reset is a single high pulse:
//!
//! ```text
//! export <pin> → direction=out → value=1 → sleep 100 ms → value=0 → unexport <pin>
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default sysfs GPIO root.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

/// How long the reset line is held high.
pub const RESET_PULSE: Duration = Duration::from_millis(100);

/// Reset pin for boards that are reset by a host GPIO; `None` for all others.
pub fn reset_pin(board_id: &str) -> Option<u8> {
    match board_id {
        "raspduino" => Some(18),
        "sleepypi" => Some(22),
        "emonpi" => Some(4),
        _ => None,
    }
}

/// Error writing a GPIO control file.
#[derive(Debug, thiserror::Error)]
#[error("failed to write `{value}` to {}", path.display())]
pub struct GpioError {
    /// Control file path.
    pub path: PathBuf,
    /// Value being written.
    pub value: String,
    /// Underlying I/O error.
    #[source]
    pub source: std::io::Error,
}

/// Something that can pulse a board's reset line.
pub trait ResetLine {
    /// Drive `pin` high for `hold`, then low, and release it.
    fn pulse(&self, pin: u8, hold: Duration) -> Result<(), GpioError>;
}

/// Sysfs GPIO controller rooted at [`SYSFS_GPIO_ROOT`] or a test directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysfsGpio {
    root: PathBuf,
}

impl Default for SysfsGpio {
    fn default() -> Self {
        Self::new(SYSFS_GPIO_ROOT)
    }
}

impl SysfsGpio {
    /// Controller rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Sysfs root in use.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn pin_file(&self, pin: u8, name: &str) -> PathBuf {
        self.root.join(format!("gpio{pin}")).join(name)
    }

    fn write(&self, path: &Path, value: impl ToString) -> Result<(), GpioError> {
        let value = value.to_string();
        tracing::trace!(path = %path.display(), value = %value, "sysfs write");
        fs::write(path, &value).map_err(|source| GpioError {
            path: path.to_path_buf(),
            value,
            source,
        })
    }
}

impl ResetLine for SysfsGpio {
    fn pulse(&self, pin: u8, hold: Duration) -> Result<(), GpioError> {
        tracing::info!(pin, hold_ms = %hold.as_millis(), "pulsing reset line");
        self.write(&self.root.join("export"), pin)?;
        self.write(&self.pin_file(pin, "direction"), "out")?;
        self.write(&self.pin_file(pin, "value"), 1)?;
        std::thread::sleep(hold);
        self.write(&self.pin_file(pin, "value"), 0)?;
        self.write(&self.root.join("unexport"), pin)
    }
}
