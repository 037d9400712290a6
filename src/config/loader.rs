//! Configuration loader with file resolution and environment override support.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "DUINO_LINK";

/// Config file name
const CONFIG_FILE_NAME: &str = "duino-link.toml";

/// Environment variable for explicit config path
const CONFIG_PATH_ENV: &str = "DUINO_LINK_CONFIG";

/// Configuration loader with resolution and override logic.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Resolved config file path (if any)
    pub config_path: Option<PathBuf>,
    /// The loaded configuration
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using standard resolution order.
    ///
    /// Resolution priority (highest to lowest):
    /// 1. `DUINO_LINK_CONFIG` environment variable (explicit path)
    /// 2. `./duino-link.toml` (current directory)
    /// 3. The platform config directory (`~/.config/duino-link/` on Linux)
    /// 4. Built-in defaults (no file required)
    ///
    /// Environment variables override file values.
    pub fn load() -> ConfigResult<Self> {
        let config_path = resolve_config_path();

        let mut config = if let Some(ref path) = config_path {
            load_from_file(path)?
        } else {
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            return Err(ConfigError::NotFound(path));
        }
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Create a loader with default configuration (no file).
    ///
    /// Environment overrides still apply; a bad one is logged and the
    /// defaults are kept.
    pub fn with_defaults() -> Self {
        let mut config = Config::default();
        let checked = apply_env_overrides(&mut config).and_then(|()| validate(&config));
        if let Err(e) = checked {
            tracing::warn!(error = %e, "ignoring invalid environment override");
            config = Config::default();
        }

        Self {
            config_path: None,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }

    /// Save the current configuration to a specific file.
    pub fn save_to(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        save_to_file(&self.config, path.as_ref())
    }
}

/// Resolve the configuration file path using standard locations.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let cwd_config = PathBuf::from(CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|path| path.exists())
}

/// Platform config directory for this tool.
pub fn get_default_config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "duino-link").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Default config file path for creating new config files.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_default_config_dir().map(|d| d.join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(toml::from_str(&content)?)
}

fn save_to_file(config: &Config, path: &Path) -> ConfigResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteError {
            path: path.to_path_buf(),
            source: e,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::WriteError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn validate(config: &Config) -> ConfigResult<()> {
    if config.serial.default_baud == 0 {
        return Err(ConfigError::validation(
            "serial.default_baud",
            "must be positive",
        ));
    }
    if config.serial.flush_chunk == 0 {
        return Err(ConfigError::validation(
            "serial.flush_chunk",
            "must be positive",
        ));
    }
    Ok(())
}

fn env_var(key: &str) -> Option<(String, String)> {
    let var = format!("{ENV_PREFIX}_{key}");
    std::env::var(&var).ok().map(|value| (var, value))
}

fn parse_env<T: std::str::FromStr>(var: &str, value: &str, what: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse(var, format!("Invalid {what}")))
}

/// Apply environment variable overrides to the configuration.
///
/// Variables follow the pattern `DUINO_LINK_<SECTION>_<KEY>`, for example
/// `DUINO_LINK_SERIAL_DEFAULT_BAUD=115200` or `DUINO_LINK_LOGGING_LEVEL=debug`.
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    let serial = &mut config.serial;

    if let Some((_, val)) = env_var("SERIAL_DEFAULT_PORT") {
        serial.default_port = Some(val);
    }
    if let Some((var, val)) = env_var("SERIAL_DEFAULT_BAUD") {
        serial.default_baud = parse_env(&var, &val, "baud rate")?;
    }
    if let Some((var, val)) = env_var("SERIAL_LINE_ENDING") {
        serial.line_ending = parse_env(&var, &val, "line ending")?;
    }
    if let Some((_, val)) = env_var("SERIAL_DEVICE_PREFIX") {
        serial.device_prefix = val;
    }
    if let Some((var, val)) = env_var("SERIAL_READ_TIMEOUT_MS") {
        serial.read_timeout_ms = parse_env(&var, &val, "timeout")?;
    }
    if let Some((var, val)) = env_var("SERIAL_WRITE_TIMEOUT_MS") {
        serial.write_timeout_ms = parse_env(&var, &val, "timeout")?;
    }
    if let Some((var, val)) = env_var("SERIAL_ISSUE_TIMEOUT_MS") {
        serial.issue_timeout_ms = parse_env(&var, &val, "timeout")?;
    }
    if let Some((var, val)) = env_var("SERIAL_FLUSH_CHUNK") {
        serial.flush_chunk = parse_env(&var, &val, "chunk size")?;
    }

    if let Some((_, val)) = env_var("LOGGING_LEVEL") {
        config.logging.level = val;
    }
    if let Some((var, val)) = env_var("LOGGING_FORMAT") {
        config.logging.format = match val.to_ascii_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            "compact" => LogFormat::Compact,
            _ => return Err(ConfigError::env_parse(var, "Invalid log format")),
        };
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_ending::LineEnding;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.default_baud, 9600);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("DUINO_LINK_SERIAL_DEFAULT_BAUD", "57600");
        env::set_var("DUINO_LINK_SERIAL_LINE_ENDING", "crlf");

        let loader = ConfigLoader::with_defaults();
        assert_eq!(loader.config().serial.default_baud, 57_600);
        assert_eq!(loader.config().serial.line_ending, LineEnding::CrLf);

        env::remove_var("DUINO_LINK_SERIAL_DEFAULT_BAUD");
        env::remove_var("DUINO_LINK_SERIAL_LINE_ENDING");
    }

    #[test]
    #[serial]
    fn test_bad_env_value_is_reported() {
        env::set_var("DUINO_LINK_SERIAL_WRITE_TIMEOUT_MS", "soon");
        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { .. }));
        env::remove_var("DUINO_LINK_SERIAL_WRITE_TIMEOUT_MS");
    }

    #[test]
    #[serial]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut loader = ConfigLoader::with_defaults();
        loader.config.serial.default_port = Some("4".to_string());
        loader.config.serial.line_ending = LineEnding::Cr;
        loader.save_to(&path).unwrap();

        let reloaded = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(reloaded.config().serial.default_port.as_deref(), Some("4"));
        assert_eq!(reloaded.config().serial.line_ending, LineEnding::Cr);
        assert_eq!(reloaded.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[serial]\ndefault_baud = 0\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError { ref key, .. } if key == "serial.default_baud"));
    }

    #[test]
    #[serial]
    fn test_env_override_is_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[serial]\ndefault_baud = 115200\n").unwrap();

        env::set_var("DUINO_LINK_SERIAL_DEFAULT_BAUD", "0");
        let err = ConfigLoader::load_from(&path).unwrap_err();
        let defaults = ConfigLoader::with_defaults();
        env::remove_var("DUINO_LINK_SERIAL_DEFAULT_BAUD");

        assert!(matches!(err, ConfigError::ValidationError { ref key, .. } if key == "serial.default_baud"));
        assert_eq!(defaults.config().serial.default_baud, 9600);
    }

    #[test]
    #[serial]
    fn test_flush_chunk_override() {
        env::set_var("DUINO_LINK_SERIAL_FLUSH_CHUNK", "512");
        let loader = ConfigLoader::with_defaults();
        env::set_var("DUINO_LINK_SERIAL_FLUSH_CHUNK", "0");
        let rejected = ConfigLoader::with_defaults();
        env::remove_var("DUINO_LINK_SERIAL_FLUSH_CHUNK");

        assert_eq!(loader.config().serial.flush_chunk, 512);
        assert_eq!(rejected.config().serial.flush_chunk, 8192);
    }

    #[test]
    #[serial]
    fn test_missing_file() {
        let err = ConfigLoader::load_from("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
