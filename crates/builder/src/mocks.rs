//! Mock implementations for testing
//!
//! In-memory [`PortProbe`] and [`ResetLine`] doubles that record every call,
//! for unit and integration tests of upload preparation.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use crate::gpio::{GpioError, ResetLine};
use crate::serial::{PortInfo, PortProbe, SerialError};

/// A call observed by [`MockPorts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PortCall {
    /// `flush(port)`
    Flush(String),
    /// `touch(port, baud)`
    Touch(String, u32),
}

/// Mock serial facility
///
/// `list` answers from a script of port lists, one per call; the last entry
/// repeats once the script runs out.
#[derive(Debug, Default)]
pub struct MockPorts {
    script: RefCell<VecDeque<Vec<PortInfo>>>,
    last: RefCell<Vec<PortInfo>>,
    calls: Vec<PortCall>,
    slept: Duration,
}

impl MockPorts {
    /// Always report `ports`.
    pub fn new(ports: Vec<PortInfo>) -> Self {
        Self {
            last: RefCell::new(ports),
            ..Self::default()
        }
    }

    /// Report each list in turn.
    pub fn scripted(lists: Vec<Vec<PortInfo>>) -> Self {
        Self {
            script: RefCell::new(lists.into()),
            ..Self::default()
        }
    }

    /// Flush/touch calls so far.
    pub fn calls(&self) -> &[PortCall] {
        &self.calls
    }

    /// Total simulated sleep.
    pub fn slept(&self) -> Duration {
        self.slept
    }
}

impl PortProbe for MockPorts {
    fn list(&self) -> Result<Vec<PortInfo>, SerialError> {
        if let Some(next) = self.script.borrow_mut().pop_front() {
            *self.last.borrow_mut() = next;
        }
        Ok(self.last.borrow().clone())
    }

    fn flush(&mut self, port: &str) -> Result<(), SerialError> {
        self.calls.push(PortCall::Flush(port.to_owned()));
        Ok(())
    }

    fn touch(&mut self, port: &str, baud: u32) -> Result<(), SerialError> {
        self.calls.push(PortCall::Touch(port.to_owned(), baud));
        Ok(())
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept = self.slept.saturating_add(duration);
    }
}

/// Mock reset line
#[derive(Debug, Default)]
pub struct MockResetLine {
    pulses: RefCell<Vec<(u8, Duration)>>,
}

impl MockResetLine {
    /// Create a reset line with no recorded pulses.
    pub fn new() -> Self {
        Self::default()
    }

    /// `(pin, hold)` of every pulse so far.
    pub fn pulses(&self) -> Vec<(u8, Duration)> {
        self.pulses.borrow().clone()
    }
}

impl ResetLine for MockResetLine {
    fn pulse(&self, pin: u8, hold: Duration) -> Result<(), GpioError> {
        self.pulses.borrow_mut().push((pin, hold));
        Ok(())
    }
}
