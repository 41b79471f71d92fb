//! Upload section of a board manifest.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

/// Board-declared upload behaviour.
///
/// Booleans stay `Option` so that an absent toggle and an explicit `false`
/// can be told apart; upload preparation treats "no options at all"
/// differently from "options without `require_upload_port`".
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct UploadOptions {
    /// Default upload protocol (`jlink`, `serial`, ...).
    #[serde(default)]
    pub protocol: Option<String>,
    /// Default baud rate for serial uploaders.
    #[serde(default)]
    pub speed: Option<u32>,
    /// Flash size in bytes, reported by the size target.
    #[serde(default)]
    pub maximum_size: Option<u64>,
    /// RAM size in bytes, reported by the size target.
    #[serde(default)]
    pub maximum_ram_size: Option<u64>,
    /// Autodetect the upload port before flashing.
    #[serde(default)]
    pub require_upload_port: Option<bool>,
    /// Open the port at 1200 baud to kick the bootloader.
    #[serde(default)]
    pub use_1200bps_touch: Option<bool>,
    /// After the touch, wait for a new serial port to show up.
    #[serde(default)]
    pub wait_for_upload_port: Option<bool>,
    /// Extra uploader arguments.
    #[serde(default)]
    pub extra_flags: Option<ExtraFlags>,
    /// Skip flushing the serial buffer before upload.
    #[serde(default)]
    pub disable_flushing: Option<bool>,
    /// Keys not modelled above (`protocols`, `offset_address`, ...). They
    /// still count towards [`UploadOptions::is_empty`].
    #[serde(flatten)]
    pub other: BTreeMap<String, Value>,
}

impl UploadOptions {
    /// `true` when the manifest declared no upload key at all, known or not.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the port must be autodetected. Absent means `false`.
    pub fn requires_upload_port(&self) -> bool {
        self.require_upload_port.unwrap_or(false)
    }

    /// Whether a 1200-bps touch is requested.
    pub fn uses_1200bps_touch(&self) -> bool {
        self.use_1200bps_touch.unwrap_or(false)
    }

    /// Whether to wait for a re-enumerated port after the touch.
    pub fn waits_for_upload_port(&self) -> bool {
        self.wait_for_upload_port.unwrap_or(false)
    }

    /// Whether flushing the serial buffer is disabled.
    pub fn flushing_disabled(&self) -> bool {
        self.disable_flushing.unwrap_or(false)
    }

    /// Extra flags as uploader arguments, empty when none are declared.
    pub fn extra_args(&self) -> Vec<String> {
        self.extra_flags
            .as_ref()
            .map(ExtraFlags::to_args)
            .unwrap_or_default()
    }
}

/// `extra_flags` may be written as a single command-line string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ExtraFlags {
    /// `"extra_flags": "-e -w"`
    Line(String),
    /// `"extra_flags": ["-e", "-w"]`
    List(Vec<String>),
}

impl ExtraFlags {
    /// Split into individual arguments.
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::Line(line) => line.split_whitespace().map(str::to_owned).collect(),
            Self::List(list) => list.clone(),
        }
    }
}
