//! Real serial devices through the `serialport` crate.
//!
//! The device runs with a short issue timeout. A transfer that does not
//! finish within it is reported as [`Transfer::Pending`]; finishing it means
//! re-issuing with the caller's bounded timeout, after which the issue
//! timeout is restored.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter, Transfer};
use std::io::{Read, Write};
use std::time::Duration;

/// Synchronous serial device wrapping `serialport::SerialPort`.
pub struct SyncSerialPort {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    issue_timeout: Duration,
}

impl SyncSerialPort {
    /// Open a device with the given line configuration.
    ///
    /// # Example
    /// ```no_run
    /// use duino_link::port::{PortConfiguration, SyncSerialPort};
    ///
    /// let port = SyncSerialPort::open("/dev/ttyACM0", &PortConfiguration::with_baud(9600))?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn open(device: &str, config: &PortConfiguration) -> Result<Self, PortError> {
        let port = serialport::new(device, config.baud_rate)
            .data_bits(config.data_bits.into())
            .flow_control(config.flow_control.into())
            .parity(config.parity.into())
            .stop_bits(config.stop_bits.into())
            .timeout(config.issue_timeout)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => PortError::not_found(device),
                serialport::ErrorKind::InvalidInput => PortError::config(e.to_string()),
                _ => PortError::Serial(e),
            })?;

        tracing::debug!(device, baud = config.baud_rate, "serial device opened");

        Ok(Self {
            port,
            name: device.to_string(),
            issue_timeout: config.issue_timeout,
        })
    }

    fn with_timeout<T>(
        &mut self,
        timeout: Duration,
        op: impl FnOnce(&mut dyn serialport::SerialPort) -> std::io::Result<T>,
    ) -> Result<Option<T>, PortError> {
        self.port.set_timeout(timeout)?;
        let result = op(&mut *self.port);
        let restored = self.port.set_timeout(self.issue_timeout);
        waited(&self.name, result, restored)
    }
}

/// Classify the result of a bounded wait. A failure to restore the issue
/// timeout is logged and never overrides bytes that already moved.
fn waited<T>(
    device: &str,
    result: std::io::Result<T>,
    restored: serialport::Result<()>,
) -> Result<Option<T>, PortError> {
    if let Err(e) = restored {
        tracing::warn!(device, error = %e, "failed to restore issue timeout");
    }

    match result {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            let err = PortError::Io(e);
            if err.is_pending() {
                Ok(None)
            } else {
                Err(err)
            }
        }
    }
}

fn issued(result: std::io::Result<usize>) -> Result<Transfer, PortError> {
    match result {
        Ok(n) => Ok(Transfer::Complete(n)),
        Err(e) => {
            let err = PortError::Io(e);
            if err.is_pending() {
                Ok(Transfer::Pending)
            } else {
                Err(err)
            }
        }
    }
}

impl SerialPortAdapter for SyncSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        Ok(self.port.bytes_to_read()? as usize)
    }

    fn begin_read(&mut self, buffer: &mut [u8]) -> Result<Transfer, PortError> {
        issued(self.port.read(buffer))
    }

    fn finish_read(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<usize>, PortError> {
        self.with_timeout(timeout, |port| port.read(buffer))
    }

    fn begin_write(&mut self, data: &[u8]) -> Result<Transfer, PortError> {
        issued(self.port.write(data))
    }

    fn finish_write(
        &mut self,
        data: &[u8],
        timeout: Duration,
    ) -> Result<Option<usize>, PortError> {
        self.with_timeout(timeout, |port| port.write(data))
    }
}

impl std::fmt::Debug for SyncSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSerialPort")
            .field("name", &self.name)
            .field("baud_rate", &self.port.baud_rate().ok())
            .field("issue_timeout", &self.issue_timeout)
            .finish()
    }
}

/// Opens real devices.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl PortOpener for SystemOpener {
    fn open(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        Ok(Box::new(SyncSerialPort::open(device, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_not_found_error() {
        let result = SyncSerialPort::open(
            "/dev/nonexistent_port_12345",
            &PortConfiguration::default(),
        );

        match result {
            Err(PortError::NotFound(name)) => assert!(name.contains("nonexistent")),
            Err(PortError::Serial(_)) | Err(PortError::Io(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
            Ok(port) => panic!("opened a nonexistent device: {port:?}"),
        }
    }

    #[test]
    fn test_system_opener_surfaces_failure() {
        let result = SystemOpener.open("/dev/nonexistent_port_12345", &PortConfiguration::default());
        assert!(result.is_err());
    }

    #[test]
    fn test_completed_wait_survives_failed_restore() {
        let restore_failed = Err(serialport::Error::new(
            serialport::ErrorKind::Unknown,
            "ioctl failed",
        ));
        assert_eq!(waited("COM3", Ok(7usize), restore_failed).unwrap(), Some(7));

        let restore_failed = Err(serialport::Error::new(
            serialport::ErrorKind::Unknown,
            "ioctl failed",
        ));
        let elapsed: std::io::Result<usize> = Err(std::io::ErrorKind::TimedOut.into());
        assert_eq!(waited("COM3", elapsed, restore_failed).unwrap(), None);

        let broken: std::io::Result<usize> = Err(std::io::ErrorKind::BrokenPipe.into());
        assert!(waited("COM3", broken, Ok(())).is_err());
    }

    #[test]
    fn test_issued_classification() {
        assert_eq!(issued(Ok(3)).unwrap(), Transfer::Complete(3));
        assert_eq!(
            issued(Err(std::io::ErrorKind::TimedOut.into())).unwrap(),
            Transfer::Pending
        );
        assert!(issued(Err(std::io::ErrorKind::BrokenPipe.into())).is_err());
    }
}
