//! SEGGER J-Link commander script and upload command.

use std::fs;
use std::path::{Path, PathBuf};

use board::BoardConfig;

use crate::command::ToolCommand;

/// File name of the generated commander script inside the build directory.
pub const SCRIPT_NAME: &str = "upload.jlink";

/// Flash base address the image is loaded at.
pub const FLASH_BASE: u32 = 0x0800_0000;

/// SWD clock in kHz.
pub const SWD_SPEED_KHZ: u32 = 4000;

/// Debug-probe failures.
#[derive(Debug, thiserror::Error)]
pub enum JlinkError {
    /// The board manifest has no `debug.jlink_device`.
    #[error("board has no `debug.jlink_device`; cannot upload with J-Link")]
    MissingDevice,
    /// The script could not be written.
    #[error("failed to write J-Link script {}", path.display())]
    Write {
        /// Script or directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

/// Commander script for `hex`: reset, load at flash base, run, go, exit.
pub fn script_contents(hex: &Path) -> String {
    let commands = [
        "setbmi 3".to_owned(),
        format!("loadbin {},{FLASH_BASE:#010x}", hex.display()),
        "r".to_owned(),
        "g".to_owned(),
        "exit".to_owned(),
    ];
    commands.join("\n")
}

/// Write the commander script into `build_dir`, replacing any previous one.
pub fn write_script(build_dir: &Path, hex: &Path) -> Result<PathBuf, JlinkError> {
    fs::create_dir_all(build_dir).map_err(|source| JlinkError::Write {
        path: build_dir.to_path_buf(),
        source,
    })?;
    let path = build_dir.join(SCRIPT_NAME);
    fs::write(&path, script_contents(hex)).map_err(|source| JlinkError::Write {
        path: path.clone(),
        source,
    })?;
    tracing::debug!(script = %path.display(), "wrote J-Link commander script");
    Ok(path)
}

/// J-Link commander executable for the host OS.
pub fn uploader_name() -> &'static str {
    if cfg!(windows) {
        "JLink.exe"
    } else {
        "JLinkExe"
    }
}

/// Fixed connection arguments for `device`.
pub fn uploader_flags(device: &str) -> Vec<String> {
    vec![
        "-device".to_owned(),
        device.to_owned(),
        "-speed".to_owned(),
        SWD_SPEED_KHZ.to_string(),
        "-if".to_owned(),
        "swd".to_owned(),
        "-autoconnect".to_owned(),
        "1".to_owned(),
    ]
}

/// Device name from the board manifest.
pub fn device(board: &BoardConfig) -> Result<&str, JlinkError> {
    board
        .debug
        .jlink_device
        .as_deref()
        .ok_or(JlinkError::MissingDevice)
}

/// `<uploader> -device <id> -speed 4000 -if swd -autoconnect 1 -CommanderScript <script>`
pub fn upload_command(uploader: &str, flags: &[String], script: &Path) -> ToolCommand {
    ToolCommand::new(uploader)
        .args(flags.iter().cloned())
        .arg("-CommanderScript")
        .path(script)
}
