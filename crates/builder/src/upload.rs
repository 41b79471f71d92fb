//! Upload preparation.
//!
//! Runs once per upload, before the uploader is invoked. [`prepare`] is a pure
//! decision over an [`UploadContext`]; [`execute`] then carries out the
//! side effects the plan asks for (port autodetection, GPIO reset pulse or
//! serial handshake) and yields the final uploader flags and port.
//!
//! ```text
//! program requested? ── yes ──▶ Bypassed
//!        │ no
//! resolve options ─▶ POLICY rules (legacy usb, speed, extra flags, no-erase)
//!        │
//! options present and port not required? ── yes ──▶ NoPort
//!        │ no
//! autodetect port, -P <port>
//!        ├── GPIO-reset board ──▶ pulse reset pin
//!        └── other boards ──────▶ flush? → touch 1200? → wait for new port?
//! ```

use std::time::Duration;

use board::UploadOptions;

use crate::gpio::{reset_pin, GpioError, ResetLine, RESET_PULSE};
use crate::serial::{PortProbe, SerialError, TOUCH_BAUD};

/// Target name that bypasses upload preparation entirely.
pub const PROGRAM_TARGET: &str = "program";

/// Port prefix of network-attached uploaders; never flushed.
pub const NETWORK_PORT_PREFIX: &str = "net:";

/// Inputs to upload preparation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadContext {
    /// Targets named on the command line.
    pub requested_targets: Vec<String>,
    /// Configured board identifier.
    pub board_id: Option<String>,
    /// Board upload options; `None` when no board is configured.
    pub options: Option<UploadOptions>,
    /// Upload protocol.
    pub protocol: String,
    /// Configured upload speed.
    pub speed: Option<u32>,
}

/// Working state the policy rules act on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Effective upload options.
    pub options: UploadOptions,
    /// Effective upload speed.
    pub speed: Option<u32>,
    /// Uploader flags accumulated so far.
    pub flags: Vec<String>,
}

/// One ordered step of flag accumulation.
#[derive(Clone, Copy)]
pub struct PolicyRule {
    /// Rule name, for logs.
    pub name: &'static str,
    /// Mutates the resolution when the rule applies.
    pub apply: fn(&UploadContext, &mut Resolution),
}

/// Flag accumulation rules, applied in this order.
///
/// `legacy-usb` runs first so that clearing the speed suppresses `-b`.
pub const POLICY: &[PolicyRule] = &[
    PolicyRule {
        name: "legacy-usb",
        apply: legacy_usb,
    },
    PolicyRule {
        name: "speed",
        apply: speed_flag,
    },
    PolicyRule {
        name: "extra-flags",
        apply: extra_flags,
    },
    PolicyRule {
        name: "no-erase",
        apply: no_erase,
    },
];

// Old projects used `usb...` protocols; those uploaders find the device
// themselves and take no baud rate.
fn legacy_usb(ctx: &UploadContext, res: &mut Resolution) {
    if ctx.protocol.contains("usb") {
        res.options.require_upload_port = Some(false);
        res.speed = None;
    }
}

fn speed_flag(_: &UploadContext, res: &mut Resolution) {
    if let Some(speed) = res.speed {
        res.flags.push("-b".to_owned());
        res.flags.push(speed.to_string());
    }
}

fn extra_flags(_: &UploadContext, res: &mut Resolution) {
    let extra = res.options.extra_args();
    res.flags.extend(extra);
}

fn no_erase(_: &UploadContext, res: &mut Resolution) {
    res.flags.push("-D".to_owned());
}

/// How the board is put into upload mode once the port is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetStep {
    /// Pulse a host GPIO wired to the board's reset line.
    GpioPulse {
        /// sysfs GPIO number.
        pin: u8,
    },
    /// Serial-port handshake.
    SerialHandshake {
        /// Flush the buffer first (skipped anyway for `net:` ports).
        flush: bool,
        /// Open the port at 1200 baud to reset into the bootloader.
        touch_1200bps: bool,
        /// Replace the port with the one that appears after the touch.
        wait_for_new_port: bool,
    },
}

/// Outcome of [`prepare`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadPlan {
    /// `program` was requested; nothing to prepare.
    Bypassed,
    /// Flags are final; the uploader needs no port.
    NoPort {
        /// Uploader flags.
        flags: Vec<String>,
    },
    /// Detect a port, append `-P <port>`, then reset the board.
    WithPort {
        /// Uploader flags before `-P`.
        flags: Vec<String>,
        /// Board reset strategy.
        reset: ResetStep,
    },
}

impl UploadPlan {
    /// Flags decided so far (`-P` not included).
    pub fn flags(&self) -> &[String] {
        match self {
            Self::Bypassed => &[],
            Self::NoPort { flags } | Self::WithPort { flags, .. } => flags,
        }
    }
}

/// Decide flags and reset strategy without touching any device.
pub fn prepare(ctx: &UploadContext) -> UploadPlan {
    if ctx.requested_targets.iter().any(|t| t == PROGRAM_TARGET) {
        tracing::debug!("`program` requested, skipping upload preparation");
        return UploadPlan::Bypassed;
    }

    let mut res = Resolution {
        options: ctx.options.clone().unwrap_or_default(),
        speed: ctx.speed,
        flags: Vec::new(),
    };
    for rule in POLICY {
        (rule.apply)(ctx, &mut res);
        tracing::trace!(rule = rule.name, flags = %res.flags.join(" "), "applied upload rule");
    }

    if !res.options.is_empty() && !res.options.requires_upload_port() {
        return UploadPlan::NoPort { flags: res.flags };
    }

    let reset = match ctx.board_id.as_deref().and_then(reset_pin) {
        Some(pin) => ResetStep::GpioPulse { pin },
        None => ResetStep::SerialHandshake {
            flush: !res.options.flushing_disabled(),
            touch_1200bps: res.options.uses_1200bps_touch(),
            wait_for_new_port: res.options.waits_for_upload_port(),
        },
    };
    UploadPlan::WithPort {
        flags: res.flags,
        reset,
    }
}

/// Upload preparation failures.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// Serial enumeration, flush, touch or wait failed.
    #[error(transparent)]
    Serial(#[from] SerialError),
    /// The GPIO reset pulse failed.
    #[error(transparent)]
    Gpio(#[from] GpioError),
}

/// Final uploader flags and port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreparedUpload {
    /// Uploader flags, including `-P <port>` when a port was required.
    pub flags: Vec<String>,
    /// Port to upload through.
    pub port: Option<String>,
}

/// Carry out `plan`.
///
/// `port` is the configured upload port; `port_wait` bounds the wait for a
/// re-enumerated port after a 1200-bps touch.
pub fn execute(
    plan: UploadPlan,
    port: Option<&str>,
    ports: &mut dyn PortProbe,
    reset_line: &dyn ResetLine,
    port_wait: Duration,
) -> Result<PreparedUpload, UploadError> {
    let configured = port.map(str::to_owned);
    let (mut flags, reset) = match plan {
        UploadPlan::Bypassed => {
            return Ok(PreparedUpload {
                flags: Vec::new(),
                port: configured,
            })
        }
        UploadPlan::NoPort { flags } => {
            return Ok(PreparedUpload {
                flags,
                port: configured,
            })
        }
        UploadPlan::WithPort { flags, reset } => (flags, reset),
    };

    let mut upload_port = ports.autodetect(port)?;

    match reset {
        ResetStep::GpioPulse { pin } => reset_line.pulse(pin, RESET_PULSE)?,
        ResetStep::SerialHandshake {
            flush,
            touch_1200bps,
            wait_for_new_port,
        } => {
            if flush && !upload_port.starts_with(NETWORK_PORT_PREFIX) {
                ports.flush(&upload_port)?;
            }
            let before = ports.list()?;
            if touch_1200bps {
                ports.touch(&upload_port, TOUCH_BAUD)?;
            }
            if wait_for_new_port {
                upload_port = ports.wait_for_new_port(&before, &upload_port, port_wait)?;
            }
        }
    }

    flags.push("-P".to_owned());
    flags.push(upload_port.clone());
    Ok(PreparedUpload {
        flags,
        port: Some(upload_port),
    })
}
