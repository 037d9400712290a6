//! In-memory serial device for tests and demos.
//!
//! `MockSerialPort` keeps a receive queue and a write log behind a shared
//! lock, so a test can hold one handle while the connection owns another.
//! Writes can be routed back into the same queue ([`MockSerialPort::loopback`])
//! or into a peer's queue ([`MockSerialPort::pair`], a null-modem cable).
//!
//! Pending transfers, bounded-wait timeouts, short writes and hard failures
//! can be scripted per direction.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter, Transfer};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Weak};
use std::time::Duration;

/// How a scripted pending transfer ends once it is awaited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// The wait succeeds and the transfer completes.
    OnWait,
    /// The wait elapses without completion.
    Never,
}

#[derive(Debug, Default)]
enum Sink {
    /// Written bytes are only logged.
    #[default]
    None,
    /// Written bytes appear in this port's own receive queue.
    Loopback,
    /// Written bytes appear in the peer's receive queue.
    Peer(Weak<Mutex<MockPortState>>),
}

#[derive(Debug, Default)]
struct Direction {
    scripted: VecDeque<Completion>,
    in_flight: Option<Completion>,
    fail_next: bool,
    waits: Vec<Duration>,
}

impl Direction {
    fn issue(&mut self) -> Result<Option<Completion>, PortError> {
        if std::mem::take(&mut self.fail_next) {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "scripted device failure",
            )));
        }
        let next = self.scripted.pop_front();
        self.in_flight = next;
        Ok(next)
    }

    fn await_in_flight(&mut self, timeout: Duration) -> Result<Completion, PortError> {
        self.waits.push(timeout);
        self.in_flight
            .take()
            .ok_or_else(|| PortError::config("no transfer in flight"))
    }
}

#[derive(Debug, Default)]
struct MockPortState {
    read_queue: VecDeque<u8>,
    write_log: Vec<Vec<u8>>,
    reads: Direction,
    writes: Direction,
    next_write_limit: Option<usize>,
    sink: Sink,
    open_handles: usize,
    times_opened: usize,
}

impl MockPortState {
    fn take_into(&mut self, buffer: &mut [u8]) -> usize {
        let n = buffer.len().min(self.read_queue.len());
        for (slot, byte) in buffer.iter_mut().zip(self.read_queue.drain(..n)) {
            *slot = byte;
        }
        n
    }
}

/// Mock serial device.
///
/// # Example
/// ```
/// use duino_link::port::{MockSerialPort, SerialPortAdapter, Transfer};
///
/// let mut port = MockSerialPort::new("MOCK0");
/// port.enqueue_read(b"Hello");
///
/// let mut buffer = [0u8; 8];
/// assert_eq!(port.begin_read(&mut buffer).unwrap(), Transfer::Complete(5));
/// assert_eq!(&buffer[..5], b"Hello");
///
/// port.begin_write(b"ACK").unwrap();
/// assert_eq!(port.write_log(), vec![b"ACK".to_vec()]);
/// ```
pub struct MockSerialPort {
    name: String,
    state: Arc<Mutex<MockPortState>>,
    /// Set on the instance handed out by [`MockOpener`]; dropping it releases the device.
    owned: bool,
}

impl MockSerialPort {
    /// A device whose writes go nowhere but the write log.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: Arc::new(Mutex::new(MockPortState::default())),
            owned: false,
        }
    }

    /// A device with TX wired to its own RX.
    pub fn loopback(name: impl Into<String>) -> Self {
        let port = Self::new(name);
        port.state.lock().sink = Sink::Loopback;
        port
    }

    /// Two devices joined by a null-modem cable: each one's writes arrive at the other.
    pub fn pair(a: impl Into<String>, b: impl Into<String>) -> (Self, Self) {
        let left = Self::new(a);
        let right = Self::new(b);
        left.state.lock().sink = Sink::Peer(Arc::downgrade(&right.state));
        right.state.lock().sink = Sink::Peer(Arc::downgrade(&left.state));
        (left, right)
    }

    /// Append bytes to the receive queue.
    pub fn enqueue_read(&self, data: &[u8]) {
        self.state.lock().read_queue.extend(data);
    }

    /// Every buffer written so far, in order.
    pub fn write_log(&self) -> Vec<Vec<u8>> {
        self.state.lock().write_log.clone()
    }

    /// All written bytes concatenated.
    pub fn written(&self) -> Vec<u8> {
        self.state.lock().write_log.concat()
    }

    /// Bytes waiting in the receive queue.
    pub fn available_bytes(&self) -> usize {
        self.state.lock().read_queue.len()
    }

    /// Make the next issued read report pending, ending as `completion`.
    pub fn defer_next_read(&self, completion: Completion) {
        self.state.lock().reads.scripted.push_back(completion);
    }

    /// Make the next issued write report pending, ending as `completion`.
    pub fn defer_next_write(&self, completion: Completion) {
        self.state.lock().writes.scripted.push_back(completion);
    }

    /// Make the next issued read fail outright.
    pub fn fail_next_read(&self) {
        self.state.lock().reads.fail_next = true;
    }

    /// Make the next issued write fail outright.
    pub fn fail_next_write(&self) {
        self.state.lock().writes.fail_next = true;
    }

    /// Accept at most `limit` bytes on the next write.
    pub fn limit_next_write(&self, limit: usize) {
        self.state.lock().next_write_limit = Some(limit);
    }

    /// Timeouts passed to `finish_read`, in call order.
    pub fn read_waits(&self) -> Vec<Duration> {
        self.state.lock().reads.waits.clone()
    }

    /// Timeouts passed to `finish_write`, in call order.
    pub fn write_waits(&self) -> Vec<Duration> {
        self.state.lock().writes.waits.clone()
    }

    /// Whether a handle from [`MockOpener`] is currently alive.
    pub fn is_held(&self) -> bool {
        self.state.lock().open_handles > 0
    }

    /// How many times [`MockOpener`] handed this device out.
    pub fn times_opened(&self) -> usize {
        self.state.lock().times_opened
    }

    fn owned_handle(&self) -> Self {
        let mut state = self.state.lock();
        state.open_handles += 1;
        state.times_opened += 1;
        drop(state);
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            owned: true,
        }
    }

    /// Log `data`, honour the write limit and route the accepted bytes to the sink.
    fn deliver(&self, data: &[u8]) -> usize {
        let mut state = self.state.lock();
        let accepted = state
            .next_write_limit
            .take()
            .map_or(data.len(), |limit| limit.min(data.len()));
        let bytes = &data[..accepted];
        state.write_log.push(bytes.to_vec());

        let peer = match &state.sink {
            Sink::Peer(peer) => peer.upgrade(),
            Sink::None | Sink::Loopback => None,
        };
        if matches!(state.sink, Sink::Loopback) {
            state.read_queue.extend(bytes);
        }
        drop(state);

        if let Some(peer) = peer {
            peer.lock().read_queue.extend(bytes);
        }
        accepted
    }
}

impl Clone for MockSerialPort {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            state: Arc::clone(&self.state),
            owned: false,
        }
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        if self.owned {
            let mut state = self.state.lock();
            state.open_handles = state.open_handles.saturating_sub(1);
        }
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn name(&self) -> &str {
        &self.name
    }

    fn bytes_to_read(&self) -> Result<usize, PortError> {
        Ok(self.available_bytes())
    }

    fn begin_read(&mut self, buffer: &mut [u8]) -> Result<Transfer, PortError> {
        let mut state = self.state.lock();
        match state.reads.issue()? {
            Some(_) => Ok(Transfer::Pending),
            None => Ok(Transfer::Complete(state.take_into(buffer))),
        }
    }

    fn finish_read(
        &mut self,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<Option<usize>, PortError> {
        let mut state = self.state.lock();
        match state.reads.await_in_flight(timeout)? {
            Completion::OnWait => Ok(Some(state.take_into(buffer))),
            Completion::Never => Ok(None),
        }
    }

    fn begin_write(&mut self, data: &[u8]) -> Result<Transfer, PortError> {
        if self.state.lock().writes.issue()?.is_some() {
            return Ok(Transfer::Pending);
        }
        Ok(Transfer::Complete(self.deliver(data)))
    }

    fn finish_write(
        &mut self,
        data: &[u8],
        timeout: Duration,
    ) -> Result<Option<usize>, PortError> {
        let completion = self.state.lock().writes.await_in_flight(timeout)?;
        match completion {
            Completion::OnWait => Ok(Some(self.deliver(data))),
            Completion::Never => Ok(None),
        }
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("available_bytes", &self.available_bytes())
            .field("owned", &self.owned)
            .finish()
    }
}

/// Hands out registered mock devices by name.
#[derive(Debug, Clone, Default)]
pub struct MockOpener {
    devices: Arc<Mutex<HashMap<String, MockSerialPort>>>,
    last_config: Arc<Mutex<Option<PortConfiguration>>>,
}

impl MockOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `port` openable under its own name.
    pub fn register(&self, port: &MockSerialPort) -> &Self {
        self.devices
            .lock()
            .insert(port.name.clone(), port.clone());
        self
    }

    /// Configuration passed to the most recent successful open.
    pub fn last_config(&self) -> Option<PortConfiguration> {
        self.last_config.lock().clone()
    }
}

impl PortOpener for MockOpener {
    fn open(
        &self,
        device: &str,
        config: &PortConfiguration,
    ) -> Result<Box<dyn SerialPortAdapter>, PortError> {
        if config.baud_rate == 0 {
            return Err(PortError::config("baud rate must be positive"));
        }
        let devices = self.devices.lock();
        let port = devices
            .get(device)
            .ok_or_else(|| PortError::not_found(device))?;
        if port.is_held() {
            return Err(PortError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                format!("{device} is in use"),
            )));
        }
        *self.last_config.lock() = Some(config.clone());
        Ok(Box::new(port.owned_handle()))
    }
}
