//! Port identifiers as supplied by callers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Numbers at or above this use the extended `\\.\COMn` form on Windows.
pub const EXTENDED_NAME_THRESHOLD: i32 = 10;

/// Prefix for numbered devices on platforms without COM names.
#[cfg(windows)]
pub const DEFAULT_DEVICE_PREFIX: &str = "COM";
#[cfg(not(windows))]
pub const DEFAULT_DEVICE_PREFIX: &str = "/dev/ttyS";

/// A serial device, either by number or by OS name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortId {
    /// Numbered port, `3` meaning `COM3` on Windows.
    Number(i32),
    /// Full device name or path, passed through untouched.
    Name(String),
}

/// Why a [`PortId`] was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidPortId {
    #[error("port number {0} is negative")]
    Negative(i32),
    #[error("port name is empty")]
    Empty,
    #[error("port name contains a NUL byte")]
    Nul,
}

impl PortId {
    /// Reject identifiers that cannot name a device.
    pub fn validate(&self) -> Result<(), InvalidPortId> {
        match self {
            Self::Number(n) if *n < 0 => Err(InvalidPortId::Negative(*n)),
            Self::Number(_) => Ok(()),
            Self::Name(name) if name.trim().is_empty() => Err(InvalidPortId::Empty),
            Self::Name(name) if name.contains('\0') => Err(InvalidPortId::Nul),
            Self::Name(_) => Ok(()),
        }
    }

    /// The OS device name this identifier resolves to.
    ///
    /// On Windows numbered ports below [`EXTENDED_NAME_THRESHOLD`] map to
    /// `COMn` and the rest to `\\.\COMn`. Elsewhere `prefix` is prepended.
    pub fn device_name(&self, prefix: &str) -> String {
        match self {
            Self::Name(name) => name.clone(),
            Self::Number(n) if cfg!(windows) && *n >= EXTENDED_NAME_THRESHOLD => {
                format!(r"\\.\COM{n}")
            }
            Self::Number(n) if cfg!(windows) => format!("COM{n}"),
            Self::Number(n) => format!("{prefix}{n}"),
        }
    }
}

impl fmt::Display for PortId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl FromStr for PortId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().parse::<i32>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Name(s.to_string()),
        })
    }
}

impl From<i32> for PortId {
    fn from(n: i32) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for PortId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PortId {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_number_or_name() {
        assert_eq!("3".parse::<PortId>().unwrap(), PortId::Number(3));
        assert_eq!("-1".parse::<PortId>().unwrap(), PortId::Number(-1));
        assert_eq!(
            "/dev/ttyACM0".parse::<PortId>().unwrap(),
            PortId::Name("/dev/ttyACM0".into())
        );
    }

    #[test]
    fn test_validation() {
        assert_eq!(PortId::Number(-1).validate(), Err(InvalidPortId::Negative(-1)));
        assert_eq!(PortId::Name("  ".into()).validate(), Err(InvalidPortId::Empty));
        assert_eq!(PortId::Name("a\0b".into()).validate(), Err(InvalidPortId::Nul));
        assert!(PortId::Number(0).validate().is_ok());
        assert!(PortId::from("COM4").validate().is_ok());
    }

    #[test]
    fn test_named_device_passes_through() {
        assert_eq!(PortId::from("loop0").device_name("/dev/ttyS"), "loop0");
    }

    #[cfg(windows)]
    #[test]
    fn test_windows_numbered_names() {
        assert_eq!(PortId::Number(3).device_name(""), "COM3");
        assert_eq!(PortId::Number(9).device_name(""), "COM9");
        assert_eq!(PortId::Number(10).device_name(""), r"\\.\COM10");
    }

    #[cfg(not(windows))]
    #[test]
    fn test_prefixed_numbered_names() {
        assert_eq!(PortId::Number(3).device_name("/dev/ttyS"), "/dev/ttyS3");
        assert_eq!(PortId::Number(12).device_name("/dev/ttyUSB"), "/dev/ttyUSB12");
    }
}
