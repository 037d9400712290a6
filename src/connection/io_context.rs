//! Per-direction in-flight transfer state.
//!
//! Each open connection carries one context for reads and one for writes.
//! A context gates exactly one transfer at a time and moves through
//! `Idle -> Pending -> Completed | TimedOut`; a transfer that completes on
//! issue skips `Pending`.

use crate::port::{PortError, SerialPortAdapter, Transfer};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Read,
    Write,
}

/// Where the last transfer in this direction ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoState {
    Idle,
    Pending,
    Completed(usize),
    TimedOut,
}

/// Result of driving one transfer to the end of its bounded wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The transfer finished. `deferred` is set when it went through a wait.
    Completed { bytes: usize, deferred: bool },
    /// The bounded wait elapsed first.
    TimedOut,
}

#[derive(Debug)]
pub struct IoContext {
    direction: Direction,
    timeout: Duration,
    state: IoState,
    offset: u64,
}

impl IoContext {
    pub fn new(direction: Direction, timeout: Duration) -> Self {
        Self {
            direction,
            timeout,
            state: IoState::Idle,
            offset: 0,
        }
    }

    /// Upper bound on a wait for a pending transfer.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn state(&self) -> IoState {
        self.state
    }

    /// Total bytes moved by completed transfers in this direction.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Issue a read and, if it is pending, wait for it.
    pub fn read(
        &mut self,
        device: &mut dyn SerialPortAdapter,
        buffer: &mut [u8],
    ) -> Result<Outcome, PortError> {
        debug_assert_eq!(self.direction, Direction::Read);
        let issued = self.guard(device.begin_read(buffer))?;
        match issued {
            Transfer::Complete(n) => Ok(self.complete(n, false)),
            Transfer::Pending => {
                let waited = self.guard(device.finish_read(buffer, self.timeout))?;
                Ok(self.settle(waited))
            }
        }
    }

    /// Issue a write and, if it is pending, wait for it.
    pub fn write(
        &mut self,
        device: &mut dyn SerialPortAdapter,
        data: &[u8],
    ) -> Result<Outcome, PortError> {
        debug_assert_eq!(self.direction, Direction::Write);
        let issued = self.guard(device.begin_write(data))?;
        match issued {
            Transfer::Complete(n) => Ok(self.complete(n, false)),
            Transfer::Pending => {
                let waited = self.guard(device.finish_write(data, self.timeout))?;
                Ok(self.settle(waited))
            }
        }
    }

    /// Mark the context in flight, or back to idle if the device refused.
    fn guard<T>(&mut self, result: Result<T, PortError>) -> Result<T, PortError> {
        self.state = if result.is_ok() {
            IoState::Pending
        } else {
            IoState::Idle
        };
        result
    }

    fn settle(&mut self, waited: Option<usize>) -> Outcome {
        match waited {
            Some(n) => self.complete(n, true),
            None => {
                tracing::debug!(direction = ?self.direction, timeout = ?self.timeout, "transfer wait elapsed");
                self.state = IoState::TimedOut;
                Outcome::TimedOut
            }
        }
    }

    fn complete(&mut self, bytes: usize, deferred: bool) -> Outcome {
        self.state = IoState::Completed(bytes);
        self.offset += bytes as u64;
        Outcome::Completed { bytes, deferred }
    }
}
