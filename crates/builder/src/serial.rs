//! Serial-port facility: enumeration, buffer flush, 1200-bps touch, port wait
//! and upload-port autodetection.

use std::time::Duration;

/// Poll interval while waiting for a re-enumerated port.
pub const PORT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Default bound on [`PortProbe::wait_for_new_port`].
pub const DEFAULT_PORT_WAIT: Duration = Duration::from_secs(5);

/// Baud rate of the bootloader "touch".
pub const TOUCH_BAUD: u32 = 1200;

/// One enumerated serial port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device path or name (`/dev/ttyACM0`, `COM3`).
    pub name: String,
    /// Whether the port sits behind a USB device.
    pub usb: bool,
}

impl PortInfo {
    /// A USB serial port.
    pub fn usb(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usb: true,
        }
    }

    /// A port of unknown or on-board kind.
    pub fn other(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            usb: false,
        }
    }
}

/// Serial facility failures.
#[derive(Debug, thiserror::Error)]
pub enum SerialError {
    /// Enumeration returned nothing usable and no port was configured.
    #[error("no serial port found; set `upload.port` or pass --upload-port")]
    NoPort,
    /// Neither a new port nor the original one showed up in time.
    #[error("couldn't find a board on port `{port}` after {} ms", waited.as_millis())]
    Timeout {
        /// Port the upload was configured for.
        port: String,
        /// How long we waited.
        waited: Duration,
    },
    /// The OS serial layer failed.
    #[error("serial port `{port}` failed")]
    Port {
        /// Port being accessed (empty for enumeration).
        port: String,
        /// Error reported by the serial layer.
        #[source]
        source: serialport::Error,
    },
}

/// Serial operations upload preparation relies on.
///
/// `list`, `flush`, `touch` and `sleep` talk to the OS; `autodetect` and
/// `wait_for_new_port` are built on top of them.
pub trait PortProbe {
    /// Currently present serial ports.
    fn list(&self) -> Result<Vec<PortInfo>, SerialError>;

    /// Discard pending data and toggle DTR/RTS.
    fn flush(&mut self, port: &str) -> Result<(), SerialError>;

    /// Open `port` at `baud` and close it again.
    fn touch(&mut self, port: &str, baud: u32) -> Result<(), SerialError>;

    /// Block the caller.
    fn sleep(&mut self, duration: Duration) {
        std::thread::sleep(duration);
    }

    /// Keep `configured` when set, else pick the first USB port, else the
    /// first port of any kind.
    fn autodetect(&self, configured: Option<&str>) -> Result<String, SerialError> {
        if let Some(port) = configured.filter(|p| !p.is_empty()) {
            return Ok(port.to_owned());
        }
        let ports = self.list()?;
        let chosen = ports
            .iter()
            .find(|p| p.usb)
            .or_else(|| ports.first())
            .ok_or(SerialError::NoPort)?;
        tracing::info!(port = %chosen.name, "auto-detected upload port");
        Ok(chosen.name.clone())
    }

    /// Poll until a port not in `before` appears.
    ///
    /// The baseline moves with each poll, so a port that disappears and
    /// comes back counts as new. When nothing new shows up within `timeout`
    /// and `original` is still present it is used; otherwise the wait fails.
    fn wait_for_new_port(
        &mut self,
        before: &[PortInfo],
        original: &str,
        timeout: Duration,
    ) -> Result<String, SerialError> {
        let mut known: Vec<String> = before.iter().map(|p| p.name.clone()).collect();
        let mut waited = Duration::ZERO;
        while waited < timeout {
            let now: Vec<String> = self.list()?.into_iter().map(|p| p.name).collect();
            if let Some(fresh) = now.iter().find(|name| !known.contains(name)) {
                tracing::info!(port = %fresh, "new serial port appeared");
                return Ok(fresh.clone());
            }
            known = now;
            self.sleep(PORT_POLL_INTERVAL);
            waited = waited.saturating_add(PORT_POLL_INTERVAL);
        }

        if self.list()?.iter().any(|p| p.name == original) {
            tracing::debug!(port = original, "no new port, keeping the original");
            return Ok(original.to_owned());
        }
        Err(SerialError::Timeout {
            port: original.to_owned(),
            waited,
        })
    }
}

/// Host serial ports through the `serialport` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

fn port_error(port: &str) -> impl Fn(serialport::Error) -> SerialError + '_ {
    move |source| SerialError::Port {
        port: port.to_owned(),
        source,
    }
}

impl PortProbe for SystemPorts {
    fn list(&self) -> Result<Vec<PortInfo>, SerialError> {
        let ports = serialport::available_ports().map_err(port_error(""))?;
        Ok(ports
            .into_iter()
            .map(|p| PortInfo {
                usb: matches!(p.port_type, serialport::SerialPortType::UsbPort(_))
                    || looks_like_usb(&p.port_name),
                name: p.port_name,
            })
            .collect())
    }

    fn flush(&mut self, port: &str) -> Result<(), SerialError> {
        tracing::debug!(port, "flushing serial buffer");
        let mut handle = serialport::new(port, 9600)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(port_error(port))?;
        handle
            .clear(serialport::ClearBuffer::All)
            .map_err(port_error(port))?;
        handle
            .write_data_terminal_ready(false)
            .map_err(port_error(port))?;
        handle.write_request_to_send(false).map_err(port_error(port))?;
        self.sleep(Duration::from_millis(100));
        handle
            .write_data_terminal_ready(true)
            .map_err(port_error(port))?;
        handle.write_request_to_send(true).map_err(port_error(port))?;
        Ok(())
    }

    fn touch(&mut self, port: &str, baud: u32) -> Result<(), SerialError> {
        tracing::info!(port, baud, "touching serial port");
        let mut handle = serialport::new(port, baud)
            .timeout(Duration::from_millis(100))
            .open()
            .map_err(port_error(port))?;
        handle
            .write_data_terminal_ready(false)
            .map_err(port_error(port))?;
        drop(handle);
        // the bootloader needs a moment to re-enumerate
        self.sleep(Duration::from_millis(400));
        Ok(())
    }
}

/// Without udev the port type is often unknown; fall back to device names.
fn looks_like_usb(name: &str) -> bool {
    ["ttyACM", "ttyUSB", "usbmodem", "usbserial"]
        .iter()
        .any(|marker| name.contains(marker))
}
