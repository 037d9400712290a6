//! Core traits for the device backend.
//!
//! `SerialPortAdapter` models a device that accepts overlapped transfers: a
//! transfer is issued, and either completes right away or is reported as
//! pending and later awaited for a bounded time. Real devices and the mock
//! both implement it so the connection layer never knows which one it drives.

use super::error::PortError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timeout a single issued transfer may take before it is reported as pending.
pub const DEFAULT_ISSUE_TIMEOUT: Duration = Duration::from_millis(10);

/// Line parameters applied when a device is opened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortConfiguration {
    /// Baud rate (bits per second).
    pub baud_rate: u32,

    /// Number of data bits (5, 6, 7, or 8).
    pub data_bits: DataBits,

    /// Flow control mode.
    pub flow_control: FlowControl,

    /// Parity checking mode.
    pub parity: Parity,

    /// Number of stop bits.
    pub stop_bits: StopBits,

    /// How long one issued transfer may take before it counts as pending.
    pub issue_timeout: Duration,
}

impl Default for PortConfiguration {
    fn default() -> Self {
        Self {
            baud_rate: 9600,
            data_bits: DataBits::Eight,
            flow_control: FlowControl::None,
            parity: Parity::None,
            stop_bits: StopBits::One,
            issue_timeout: DEFAULT_ISSUE_TIMEOUT,
        }
    }
}

impl PortConfiguration {
    /// 8N1, no flow control, at the given baud rate.
    pub fn with_baud(baud_rate: u32) -> Self {
        Self {
            baud_rate,
            ..Self::default()
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl From<DataBits> for serialport::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Five => serialport::DataBits::Five,
            DataBits::Six => serialport::DataBits::Six,
            DataBits::Seven => serialport::DataBits::Seven,
            DataBits::Eight => serialport::DataBits::Eight,
        }
    }
}

/// Flow control modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for serialport::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => serialport::FlowControl::None,
            FlowControl::Software => serialport::FlowControl::Software,
            FlowControl::Hardware => serialport::FlowControl::Hardware,
        }
    }
}

/// Parity checking modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for serialport::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => serialport::Parity::None,
            Parity::Odd => serialport::Parity::Odd,
            Parity::Even => serialport::Parity::Even,
        }
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for serialport::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => serialport::StopBits::One,
            StopBits::Two => serialport::StopBits::Two,
        }
    }
}

/// Immediate outcome of issuing a transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transfer {
    /// Finished; this many bytes moved.
    Complete(usize),
    /// Accepted by the device but not finished yet.
    Pending,
}

/// Overlapped-style transfer primitives for one open device.
///
/// A `begin_*` call that returns [`Transfer::Pending`] must be followed by the
/// matching `finish_*` call with the same buffer before another transfer in
/// that direction is issued.
pub trait SerialPortAdapter: Send + std::fmt::Debug {
    /// Name of the device this adapter was opened on.
    fn name(&self) -> &str;

    /// Bytes currently queued in the receive buffer.
    fn bytes_to_read(&self) -> Result<usize, PortError>;

    /// Issue a read into `buffer`.
    fn begin_read(&mut self, buffer: &mut [u8]) -> Result<Transfer, PortError>;

    /// Wait up to `timeout` for a pending read. `Ok(None)` means the wait elapsed.
    fn finish_read(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<usize>, PortError>;

    /// Issue a write of `data`.
    fn begin_write(&mut self, data: &[u8]) -> Result<Transfer, PortError>;

    /// Wait up to `timeout` for a pending write. `Ok(None)` means the wait elapsed.
    fn finish_write(&mut self, data: &[u8], timeout: Duration)
        -> Result<Option<usize>, PortError>;
}

/// Opens devices by name. A [`Connection`](crate::Connection) owns one.
pub trait PortOpener: Send + std::fmt::Debug {
    fn open(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError>;
}
