//! Device backend abstraction.
//!
//! Provides the overlapped-transfer trait the connection layer drives, a real
//! implementation over `serialport`, and an in-memory mock for tests.

pub mod error;
pub mod id;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use error::PortError;
pub use id::{InvalidPortId, PortId, DEFAULT_DEVICE_PREFIX, EXTENDED_NAME_THRESHOLD};
pub use mock::{Completion, MockOpener, MockSerialPort};
pub use sync_port::{SyncSerialPort, SystemOpener};
pub use traits::*;
