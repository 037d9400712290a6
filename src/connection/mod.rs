//! Device ownership and timeout-bounded byte transfer.
//!
//! A [`Connection`] is either closed or holds exactly one open device
//! together with its read and write [`IoContext`]s. The three are acquired
//! and released as one bundle, so a failed open or a dropped connection can
//! never leak a handle.
//!
//! Every read is advisory: it returns what is queued right now, never waits
//! when nothing is queued, and waits at most the read timeout for a transfer
//! the device reports as pending. Writes are single-attempt: a partial write
//! is reported as success with the accepted byte count and is not retried.

pub mod io_context;

pub use io_context::{Direction, IoContext, IoState, Outcome};

use crate::config::SerialConfig;
use crate::error::{OpenError, ReadError, WriteError};
use crate::port::{
    PortConfiguration, PortId, PortOpener, SerialPortAdapter, SystemOpener,
    DEFAULT_DEVICE_PREFIX, DEFAULT_ISSUE_TIMEOUT,
};
use std::time::Duration;

/// Upper bound on waiting for a pending read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(2000);
/// Upper bound on waiting for a pending write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(1000);
/// Chunk size used by [`Connection::flush`].
pub const DEFAULT_FLUSH_CHUNK: usize = 8192;

/// Timing and naming knobs for a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub issue_timeout: Duration,
    pub flush_chunk: usize,
    /// Prefix for numbered ports on platforms without COM names.
    pub device_prefix: String,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            issue_timeout: DEFAULT_ISSUE_TIMEOUT,
            flush_chunk: DEFAULT_FLUSH_CHUNK,
            device_prefix: DEFAULT_DEVICE_PREFIX.to_string(),
        }
    }
}

impl From<&SerialConfig> for ConnectionSettings {
    fn from(config: &SerialConfig) -> Self {
        Self {
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
            issue_timeout: config.issue_timeout(),
            flush_chunk: config.flush_chunk.max(1),
            device_prefix: config.device_prefix.clone(),
        }
    }
}

/// The device handle and its two transfer contexts, owned together.
#[derive(Debug)]
struct OpenDevice {
    device: Box<dyn SerialPortAdapter>,
    read: IoContext,
    write: IoContext,
}

impl OpenDevice {
    fn new(device: Box<dyn SerialPortAdapter>, settings: &ConnectionSettings) -> Self {
        Self {
            device,
            read: IoContext::new(Direction::Read, settings.read_timeout),
            write: IoContext::new(Direction::Write, settings.write_timeout),
        }
    }
}

impl Drop for OpenDevice {
    fn drop(&mut self) {
        tracing::debug!(
            device = self.device.name(),
            bytes_read = self.read.offset(),
            bytes_written = self.write.offset(),
            "releasing serial device"
        );
    }
}

/// Single-owner serial connection.
///
/// Operations must be serialized by the caller; there is one read context
/// and one write context, and each assumes a single transfer in flight.
#[derive(Debug)]
pub struct Connection {
    opener: Box<dyn PortOpener>,
    settings: ConnectionSettings,
    open: Option<OpenDevice>,
    port: Option<PortId>,
    baud: Option<u32>,
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl Connection {
    /// A closed connection that opens real devices.
    pub fn new() -> Self {
        Self::with_opener(SystemOpener)
    }

    /// A closed connection that opens devices through `opener`.
    pub fn with_opener(opener: impl PortOpener + 'static) -> Self {
        Self {
            opener: Box::new(opener),
            settings: ConnectionSettings::default(),
            open: None,
            port: None,
            baud: None,
        }
    }

    /// Replace the timing settings. Takes effect on the next open.
    pub fn with_settings(mut self, settings: ConnectionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// Open and configure `port` at `baud`.
    ///
    /// Fails without side effects if the identifier is malformed, if this
    /// connection already holds a device, or if the OS refuses the device.
    pub fn open(&mut self, port: impl Into<PortId>, baud: u32) -> Result<(), OpenError> {
        let port = port.into();

        if let Err(e) = port.validate() {
            tracing::error!(%port, error = %e, "invalid port identifier");
            return Err(OpenError::InvalidPort(e.to_string()));
        }
        if self.open.is_some() {
            let current = self
                .port
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            tracing::warn!(current = %current, requested = %port, "connection already open");
            return Err(OpenError::AlreadyOpen { port: current });
        }
        if baud == 0 {
            tracing::error!(%port, "baud rate must be positive");
            return Err(OpenError::InvalidBaud(baud));
        }

        let device_name = port.device_name(&self.settings.device_prefix);
        let config = PortConfiguration {
            issue_timeout: self.settings.issue_timeout,
            ..PortConfiguration::with_baud(baud)
        };

        let device = self.opener.open(&device_name, &config).map_err(|source| {
            tracing::error!(device = %device_name, error = %source, "failed to open serial device");
            OpenError::DeviceUnavailable {
                device: device_name.clone(),
                source,
            }
        })?;

        self.open = Some(OpenDevice::new(device, &self.settings));
        self.port = Some(port);
        self.baud = Some(baud);
        tracing::info!(device = %device_name, baud, "serial connection open");
        Ok(())
    }

    /// Release the device. Does nothing if already closed.
    pub fn close(&mut self) {
        if let Some(open) = self.open.take() {
            tracing::info!(device = open.device.name(), "serial connection closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    /// Identifier of the most recent successful open.
    pub fn port(&self) -> Option<&PortId> {
        self.port.as_ref()
    }

    /// Baud rate of the most recent successful open.
    pub fn baud(&self) -> Option<u32> {
        self.baud
    }

    /// OS name of the open device.
    pub fn device_name(&self) -> Option<&str> {
        self.open.as_ref().map(|open| open.device.name())
    }

    pub fn read_context(&self) -> Option<&IoContext> {
        self.open.as_ref().map(|open| &open.read)
    }

    pub fn write_context(&self) -> Option<&IoContext> {
        self.open.as_ref().map(|open| &open.write)
    }

    /// Bytes queued at the device.
    pub fn bytes_queued(&self) -> Result<usize, ReadError> {
        let open = self.open.as_ref().ok_or(ReadError::NotOpen)?;
        open.device
            .bytes_to_read()
            .map_err(ReadError::TransferFailed)
    }

    /// Read what is queued, up to `buffer.len()` bytes.
    ///
    /// `Ok(0)` means nothing is queued, or a pending transfer did not finish
    /// within the read timeout. Neither is an error.
    pub fn read_into(&mut self, buffer: &mut [u8]) -> Result<usize, ReadError> {
        let open = self.open.as_mut().ok_or(ReadError::NotOpen)?;

        let queued = open
            .device
            .bytes_to_read()
            .map_err(ReadError::TransferFailed)?;
        if queued == 0 || buffer.is_empty() {
            return Ok(0);
        }

        let want = queued.min(buffer.len());
        match open.read.read(open.device.as_mut(), &mut buffer[..want]) {
            Ok(Outcome::Completed { bytes, deferred }) => {
                if deferred {
                    tracing::trace!(device = open.device.name(), bytes, "read completed after wait");
                }
                Ok(bytes)
            }
            Ok(Outcome::TimedOut) => Ok(0),
            Err(e) => {
                tracing::warn!(device = open.device.name(), error = %e, "read failed");
                Err(ReadError::TransferFailed(e))
            }
        }
    }

    /// Read what is queued, up to `max_bytes`.
    pub fn read_available(&mut self, max_bytes: usize) -> Result<Vec<u8>, ReadError> {
        let mut buffer = vec![0u8; max_bytes];
        let n = self.read_into(&mut buffer)?;
        buffer.truncate(n);
        Ok(buffer)
    }

    /// Issue one write of `data` and return how many bytes the device accepted.
    ///
    /// A short count is not retried; callers that need every byte delivered
    /// must compare it against `data.len()` and send the rest themselves.
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        let open = self.open.as_mut().ok_or(WriteError::NotOpen)?;
        if data.is_empty() {
            return Ok(0);
        }

        match open.write.write(open.device.as_mut(), data) {
            Ok(Outcome::Completed { bytes, deferred }) => {
                if deferred {
                    tracing::trace!(device = open.device.name(), bytes, "write completed after wait");
                }
                if bytes < data.len() {
                    tracing::debug!(
                        device = open.device.name(),
                        accepted = bytes,
                        requested = data.len(),
                        "partial write"
                    );
                }
                Ok(bytes)
            }
            Ok(Outcome::TimedOut) => {
                let timeout = open.write.timeout();
                tracing::warn!(device = open.device.name(), ?timeout, "write timed out");
                Err(WriteError::WriteTimedOut(timeout))
            }
            Err(e) => {
                tracing::warn!(device = open.device.name(), error = %e, "write failed");
                Err(WriteError::TransferFailed(e))
            }
        }
    }

    /// Drain and discard everything queued. Returns the number of bytes dropped.
    pub fn flush(&mut self) -> usize {
        let mut chunk = vec![0u8; self.settings.flush_chunk.max(1)];
        let mut discarded = 0;
        loop {
            match self.read_into(&mut chunk) {
                Ok(0) | Err(_) => break,
                Ok(n) => discarded += n,
            }
        }
        if discarded > 0 {
            tracing::debug!(discarded, "flushed receive backlog");
        }
        discarded
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}
