//! Caller-facing error taxonomy.
//!
//! None of these are fatal. "Nothing to read" and short reads are ordinary
//! outcomes of the non-blocking design and are flagged by
//! [`ReadError::is_transient`] so a polling loop can simply try again later.

use crate::port::PortError;
use std::time::Duration;
use thiserror::Error;

/// Why [`Connection::open`](crate::Connection::open) failed.
#[derive(Debug, Error)]
pub enum OpenError {
    /// Rejected before touching the OS.
    #[error("Invalid port identifier: {0}")]
    InvalidPort(String),

    #[error("Invalid baud rate: {0}")]
    InvalidBaud(u32),

    /// This connection already holds a device; close it first.
    #[error("Connection already open on port {port}")]
    AlreadyOpen { port: String },

    /// The OS could not open or configure the device.
    #[error("Device {device} unavailable: {source}")]
    DeviceUnavailable {
        device: String,
        #[source]
        source: PortError,
    },
}

/// Why a read produced no frame.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("Connection is not open")]
    NotOpen,

    /// Nothing is queued at the device right now.
    #[error("No data available")]
    NothingAvailable,

    /// A fixed-width read got fewer bytes than it needs.
    #[error("Expected {expected} bytes, got {actual}")]
    InsufficientData { expected: usize, actual: usize },

    /// The device reported a hard I/O failure.
    #[error("Read failed: {0}")]
    TransferFailed(#[source] PortError),
}

impl ReadError {
    /// True for outcomes that just mean "try again later".
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::NothingAvailable | Self::InsufficientData { .. })
    }
}

/// Why a write was not accepted.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Connection is not open")]
    NotOpen,

    /// The device did not finish the write within the bounded wait.
    #[error("Write timed out after {0:?}")]
    WriteTimedOut(Duration),

    /// The device reported a hard I/O failure.
    #[error("Write failed: {0}")]
    TransferFailed(#[source] PortError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_error_display() {
        let err = OpenError::AlreadyOpen { port: "3".into() };
        assert_eq!(err.to_string(), "Connection already open on port 3");

        let err = OpenError::DeviceUnavailable {
            device: "COM3".into(),
            source: PortError::not_found("COM3"),
        };
        assert_eq!(
            err.to_string(),
            "Device COM3 unavailable: Serial device not found: COM3"
        );
    }

    #[test]
    fn test_transient_reads() {
        assert!(ReadError::NothingAvailable.is_transient());
        assert!(ReadError::InsufficientData {
            expected: 4,
            actual: 1
        }
        .is_transient());
        assert!(!ReadError::NotOpen.is_transient());
        assert!(!ReadError::TransferFailed(PortError::not_found("COM4")).is_transient());
    }

    #[test]
    fn test_write_timeout_display() {
        let err = WriteError::WriteTimedOut(Duration::from_secs(1));
        assert_eq!(err.to_string(), "Write timed out after 1s");
    }
}
