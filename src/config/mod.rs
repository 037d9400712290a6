//! Configuration for the `duino-link` tool.
//!
//! TOML-based configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `DUINO_LINK_CONFIG` environment variable (explicit path)
//! 2. `./duino-link.toml` (current directory)
//! 3. The platform config directory, e.g. `~/.config/duino-link/duino-link.toml`
//! 4. Built-in defaults (no file required)
//!
//! # Environment Overrides
//!
//! The pattern is `DUINO_LINK_<SECTION>_<KEY>`:
//! - `DUINO_LINK_SERIAL_DEFAULT_PORT=/dev/ttyACM0`
//! - `DUINO_LINK_SERIAL_DEFAULT_BAUD=115200`
//! - `DUINO_LINK_SERIAL_LINE_ENDING=crlf`
//! - `DUINO_LINK_LOGGING_LEVEL=debug`
//!
//! # Example
//!
//! ```rust,ignore
//! use duino_link::config::ConfigLoader;
//!
//! let loader = ConfigLoader::load()?;
//! println!("Default baud: {}", loader.config().serial.default_baud);
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{
    get_default_config_dir, get_default_config_path, resolve_config_path, ConfigLoader,
};
pub use schema::{Config, LogFormat, LoggingConfig, SerialConfig};
