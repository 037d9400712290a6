//! Typed frames on top of a [`Connection`].
//!
//! Strings are scanned byte by byte up to a terminator, numbers travel as
//! four little-endian bytes, and raw reads return whatever is queued. No
//! read ever waits when nothing is queued, which keeps the framer usable
//! from a per-tick polling loop.

use crate::codec::{self, WORD_LEN};
use crate::connection::Connection;
use crate::error::{OpenError, ReadError, WriteError};
use crate::line_ending::LineEnding;
use crate::port::PortId;

const NUL: u8 = 0;
const LF: u8 = b'\n';
const CR: u8 = b'\r';

/// Serial link to a microcontroller peer.
///
/// # Example
/// ```
/// use duino_link::port::{MockOpener, MockSerialPort};
/// use duino_link::{Connection, Framer};
///
/// let (host, board) = MockSerialPort::pair("HOST", "BOARD");
/// let opener = MockOpener::new();
/// opener.register(&host).register(&board);
///
/// let mut pc = Framer::new(Connection::with_opener(opener.clone()));
/// let mut arduino = Framer::new(Connection::with_opener(opener));
/// pc.open("HOST", 9600)?;
/// arduino.open("BOARD", 9600)?;
///
/// pc.print_line("ping")?;
/// assert_eq!(arduino.read_line()?, "ping");
///
/// pc.write_int(42)?;
/// assert_eq!(arduino.read_int()?, 42);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default)]
pub struct Framer {
    conn: Connection,
    line_ending: LineEnding,
}

impl Framer {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            line_ending: LineEnding::default(),
        }
    }

    /// Open a real device and hand back the framer whatever the outcome.
    pub fn open_port(port: impl Into<PortId>, baud: u32) -> (Self, Result<(), OpenError>) {
        let mut framer = Self::default();
        let result = framer.open(port, baud);
        (framer, result)
    }

    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    pub fn set_line_ending(&mut self, line_ending: LineEnding) {
        self.line_ending = line_ending;
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn connection_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn into_connection(self) -> Connection {
        self.conn
    }

    // --- lifecycle -------------------------------------------------------

    pub fn open(&mut self, port: impl Into<PortId>, baud: u32) -> Result<(), OpenError> {
        self.conn.open(port, baud)
    }

    pub fn close(&mut self) {
        self.conn.close();
    }

    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    pub fn port(&self) -> Option<&PortId> {
        self.conn.port()
    }

    pub fn baud(&self) -> Option<u32> {
        self.conn.baud()
    }

    /// Discard everything currently queued.
    pub fn flush(&mut self) -> usize {
        self.conn.flush()
    }

    // --- reads -----------------------------------------------------------

    /// Read up to `terminator`, a NUL byte, or the end of queued data.
    ///
    /// Neither terminator ends up in the result. When `terminator` is `\n`,
    /// one trailing `\r` is dropped as well, whether the scan ended on the
    /// `\n` or on an empty queue, so CRLF lines from `Serial.println` come
    /// back clean even when the `\n` lands in a later tick. A NUL ends the
    /// scan with the text kept as is. If nothing was queued the result is
    /// [`ReadError::NothingAvailable`]. A device failure mid-scan discards
    /// what was collected.
    pub fn read_until(&mut self, terminator: u8) -> Result<String, ReadError> {
        let mut chars = Vec::new();
        let mut byte = [0u8; 1];
        let mut consumed = false;
        let mut ended_on_nul = false;

        loop {
            match self.conn.read_into(&mut byte) {
                Ok(0) => break,
                Ok(_) => consumed = true,
                Err(ReadError::TransferFailed(e)) => {
                    tracing::debug!(discarded = chars.len(), "string scan aborted");
                    return Err(ReadError::TransferFailed(e));
                }
                Err(e) => return Err(e),
            }

            if byte[0] == terminator {
                break;
            }
            if byte[0] == NUL {
                ended_on_nul = true;
                break;
            }
            chars.push(byte[0]);
        }

        if !consumed {
            return Err(ReadError::NothingAvailable);
        }
        if terminator == LF && !ended_on_nul && chars.last() == Some(&CR) {
            chars.pop();
        }
        Ok(String::from_utf8_lossy(&chars).into_owned())
    }

    /// Read a NUL-terminated string, or whatever is queued.
    pub fn read_string(&mut self) -> Result<String, ReadError> {
        self.read_until(NUL)
    }

    /// Read a `\n`-terminated line with a trailing `\r` removed.
    pub fn read_line(&mut self) -> Result<String, ReadError> {
        self.read_until(LF)
    }

    /// Read one 4-byte little-endian integer in a single transfer.
    ///
    /// Bytes of a short read are consumed and dropped.
    pub fn read_int(&mut self) -> Result<i32, ReadError> {
        self.read_word().map(i32::from_le_bytes)
    }

    /// Read one 4-byte little-endian IEEE-754 float in a single transfer.
    pub fn read_float(&mut self) -> Result<f32, ReadError> {
        self.read_word().map(f32::from_le_bytes)
    }

    pub fn read_byte(&mut self) -> Result<u8, ReadError> {
        let mut byte = [0u8; 1];
        match self.conn.read_into(&mut byte)? {
            1 => Ok(byte[0]),
            _ => Err(ReadError::NothingAvailable),
        }
    }

    /// Whatever is queued, up to `limit` bytes. Empty on failure.
    pub fn read_bytes(&mut self, limit: usize) -> Vec<u8> {
        match self.conn.read_available(limit) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::debug!(error = %e, "read_bytes returned nothing");
                Vec::new()
            }
        }
    }

    fn read_word(&mut self) -> Result<[u8; WORD_LEN], ReadError> {
        let mut word = [0u8; WORD_LEN];
        let n = self.conn.read_into(&mut word)?;
        match n {
            0 => Err(ReadError::NothingAvailable),
            WORD_LEN => Ok(word),
            actual => Err(ReadError::InsufficientData {
                expected: WORD_LEN,
                actual,
            }),
        }
    }

    // --- writes ----------------------------------------------------------

    /// Write `s` as UTF-8 with nothing appended.
    pub fn print(&mut self, s: &str) -> Result<(), WriteError> {
        self.write_bytes(s.as_bytes())
    }

    /// Write `s` followed by the configured line ending.
    pub fn print_line(&mut self, s: &str) -> Result<(), WriteError> {
        self.write_line(s, self.line_ending)
    }

    /// Write `s` followed by `line_ending`.
    pub fn write_line(&mut self, s: &str, line_ending: LineEnding) -> Result<(), WriteError> {
        let mut data = Vec::with_capacity(s.len() + 2);
        data.extend_from_slice(s.as_bytes());
        data.extend_from_slice(line_ending.as_bytes());
        self.write_bytes(&data)
    }

    pub fn write_int(&mut self, value: i32) -> Result<(), WriteError> {
        self.write_bytes(&codec::int32_to_bytes(value))
    }

    pub fn write_float(&mut self, value: f32) -> Result<(), WriteError> {
        self.write_bytes(&codec::float32_to_bytes(value))
    }

    pub fn write_byte(&mut self, value: u8) -> Result<(), WriteError> {
        self.write_bytes(&[value])
    }

    /// Single-attempt write; see [`Connection::write_bytes`].
    pub fn write_bytes(&mut self, data: &[u8]) -> Result<(), WriteError> {
        self.conn.write_bytes(data).map(|_| ())
    }

    // --- codec utilities -------------------------------------------------

    pub fn bytes_to_int(bytes: &[u8]) -> i32 {
        codec::bytes_to_int32(bytes)
    }

    pub fn int_to_bytes(value: i32) -> [u8; WORD_LEN] {
        codec::int32_to_bytes(value)
    }

    pub fn bytes_to_float(bytes: &[u8]) -> f32 {
        codec::bytes_to_float32(bytes)
    }

    pub fn float_to_bytes(value: f32) -> [u8; WORD_LEN] {
        codec::float32_to_bytes(value)
    }

    pub fn line_ending_to_string(line_ending: LineEnding) -> &'static str {
        line_ending.as_str()
    }
}
