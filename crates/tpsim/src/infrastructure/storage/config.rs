//! TOML configuration file for the simulator.
//!
//! The file is optional.  Every section and every field has a default, so an
//! empty file, a partial file, and no file at all are all valid:
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 9100
//!
//! [terminal]
//! probe = true
//! ansi = "auto"      # "auto", "always" or "never"
//!
//! [logging]
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{AnsiMode, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level file schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub terminal: TerminalSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

/// Listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Terminal probe and rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TerminalSection {
    /// Query the terminal for Sixel and cell-size support at startup.
    #[serde(default = "default_true")]
    pub probe: bool,
    #[serde(default)]
    pub ansi: AnsiMode,
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// `tracing` filter directive, e.g. `"info"` or `"tpsim=debug"`.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for TerminalSection {
    fn default() -> Self {
        Self {
            probe: default_true(),
            ansi: AnsiMode::default(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Flattens the file schema into the runtime configuration.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.server.host.clone(),
            port: self.server.port,
            probe: self.terminal.probe,
            ansi: self.terminal.ansi,
            log_level: self.logging.level.clone(),
        }
    }
}

// ── Loading ───────────────────────────────────────────────────────────────────

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_config(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(e) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

/// Parses TOML text into `AppConfig`.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is malformed or contains
/// unknown keys.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_yields_defaults() {
        // Arrange / Act
        let cfg = parse_config("").unwrap();

        // Assert
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.to_server_config(), ServerConfig::default());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let cfg = parse_config("[server]\nport = 9200\n").unwrap();

        assert_eq!(cfg.server.port, 9200);
        assert_eq!(cfg.server.host, "localhost");
        assert!(cfg.terminal.probe);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_full_file_maps_to_server_config() {
        // Arrange
        let text = r#"
            [server]
            host = "0.0.0.0"
            port = 0

            [terminal]
            probe = false
            ansi = "never"

            [logging]
            level = "tpsim=debug"
        "#;

        // Act
        let server = parse_config(text).unwrap().to_server_config();

        // Assert
        assert_eq!(
            server,
            ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 0,
                probe: false,
                ansi: AnsiMode::Never,
                log_level: "tpsim=debug".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_ansi_value_is_parse_error() {
        let result = parse_config("[terminal]\nansi = \"sometimes\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_unknown_key_is_parse_error() {
        let result = parse_config("[server]\nprot = 9100\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_out_of_range_port_is_parse_error() {
        let result = parse_config("[server]\nport = 70000\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = std::env::temp_dir().join(format!("tpsim-missing-{}.toml", uuid::Uuid::new_v4()));

        let cfg = load_config(&path).unwrap();

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_reads_file() {
        // Arrange
        let path = std::env::temp_dir().join(format!("tpsim-config-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, "[server]\nhost = \"127.0.0.1\"\n").unwrap();

        // Act
        let result = load_config(&path);
        let _ = std::fs::remove_file(&path);

        // Assert
        assert_eq!(result.unwrap().server.host, "127.0.0.1");
    }

    #[test]
    fn test_directory_path_is_io_error() {
        let result = load_config(&std::env::temp_dir());
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_config_serializes_and_deserializes_round_trip() {
        let mut cfg = AppConfig::default();
        cfg.server.port = 9300;
        cfg.terminal.ansi = AnsiMode::Always;

        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let restored = parse_config(&text).expect("deserialize");

        assert_eq!(cfg, restored);
    }
}
