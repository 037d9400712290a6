//! Device-level error types.
//!
//! These describe what went wrong talking to the OS device. The framing layer
//! wraps them in its own caller-facing errors (see [`crate::error`]).

use thiserror::Error;

/// Errors raised by a [`SerialPortAdapter`](super::SerialPortAdapter) or [`PortOpener`](super::PortOpener).
#[derive(Debug, Error)]
pub enum PortError {
    /// The device does not exist.
    #[error("Serial device not found: {0}")]
    NotFound(String),

    /// An I/O error occurred during a transfer.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device rejected its line configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A serialport-specific error occurred.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
}

impl PortError {
    pub fn not_found(device: impl Into<String>) -> Self {
        Self::NotFound(device.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Whether an I/O error only means "not finished yet".
    ///
    /// `serialport` reports an unfinished transfer as `TimedOut`; non-blocking
    /// descriptors report `WouldBlock`.
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::Io(e) if matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::Interrupted
            )
        )
    }
}
