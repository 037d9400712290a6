//! Configuration schema definitions.
//!
//! Every section derives `Default`, so a partial file (or none at all) is valid.

use crate::line_ending::LineEnding;
use crate::port::{PortId, DEFAULT_DEVICE_PREFIX};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Serial line configuration
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Serial line configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port opened when none is given on the command line
    pub default_port: Option<String>,
    /// Baud rate used when none is given
    pub default_baud: u32,
    /// Terminator appended by line writes
    pub line_ending: LineEnding,
    /// Prefix for numbered ports on platforms without COM names
    pub device_prefix: String,
    /// Bounded wait for a pending read
    pub read_timeout_ms: u64,
    /// Bounded wait for a pending write
    pub write_timeout_ms: u64,
    /// Time one issued transfer may take before it counts as pending
    pub issue_timeout_ms: u64,
    /// Read size used when flushing
    pub flush_chunk: usize,
    /// Friendly names for ports, e.g. `uno = "/dev/ttyACM0"`
    #[serde(default)]
    pub port_aliases: HashMap<String, String>,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            default_port: None,
            default_baud: 9600,
            line_ending: LineEnding::Lf,
            device_prefix: DEFAULT_DEVICE_PREFIX.to_string(),
            read_timeout_ms: 2000,
            write_timeout_ms: 1000,
            issue_timeout_ms: 10,
            flush_chunk: 8192,
            port_aliases: HashMap::new(),
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn issue_timeout(&self) -> Duration {
        Duration::from_millis(self.issue_timeout_ms)
    }

    /// Resolve a port argument through the alias table, then parse it.
    pub fn resolve_port(&self, name: &str) -> PortId {
        let resolved = self.port_aliases.get(name).map_or(name, String::as_str);
        resolved.parse().unwrap_or_else(|never| match never {})
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON lines
    Json,
    /// Multi-line human readable
    #[default]
    Pretty,
    /// Single-line human readable
    Compact,
}
