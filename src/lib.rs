//! duino_link
//!
//! Point-to-point serial transport for talking to microcontroller peers
//! without stalling the caller. Reads return what is queued right now,
//! pending transfers are waited on for a bounded time, and frames are
//! strings, 4-byte little-endian integers and floats, or raw bytes.
//!
//! # Modules
//!
//! - `port`: device backend trait, real `serialport` device, and mock
//! - `connection`: device lifecycle and timeout-bounded transfers
//! - `framer`: string, numeric and raw framing on a connection
//! - `codec`: fixed-width numeric encoding
//! - `line_ending`: terminators for line writes
//! - `error`: caller-facing errors
//! - `config`: TOML configuration with environment overrides
//! - `logging`: `tracing-subscriber` setup for the CLI

pub mod codec;
pub mod config;
pub mod connection;
pub mod error;
pub mod framer;
pub mod line_ending;
pub mod logging;
pub mod port;

pub use connection::{Connection, ConnectionSettings};
pub use error::{OpenError, ReadError, WriteError};
pub use framer::Framer;
pub use line_ending::LineEnding;
pub use port::{MockOpener, MockSerialPort, PortError, PortId, SerialPortAdapter, SyncSerialPort};

pub use config::{Config, ConfigError, ConfigLoader, ConfigResult};
