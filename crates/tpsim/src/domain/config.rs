//! Server configuration types.
//!
//! [`ServerConfig`] is the single source of truth for runtime settings once
//! startup is done.  It starts from [`ServerConfig::default`], is overlaid
//! with the optional TOML file, and finally with CLI flags and environment
//! variables.  The domain never reads files or the environment itself.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default TCP port of networked receipt printers (raw "JetDirect" port).
pub const DEFAULT_PORT: u16 = 9100;

/// Default bind host.
pub const DEFAULT_HOST: &str = "localhost";

/// When to colour control-byte markers in the rendered receipt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnsiMode {
    /// Style only when stdout is a terminal.
    #[default]
    Auto,
    Always,
    Never,
}

impl AnsiMode {
    /// Decides whether ANSI styling is used, given whether stdout is a
    /// terminal.
    pub fn resolve(self, stdout_is_tty: bool) -> bool {
        match self {
            AnsiMode::Auto => stdout_is_tty,
            AnsiMode::Always => true,
            AnsiMode::Never => false,
        }
    }
}

/// An `ansi` value other than `auto`, `always` or `never`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid ANSI mode {0:?} (expected auto, always or never)")]
pub struct ParseAnsiModeError(String);

impl FromStr for AnsiMode {
    type Err = ParseAnsiModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(AnsiMode::Auto),
            "always" => Ok(AnsiMode::Always),
            "never" => Ok(AnsiMode::Never),
            _ => Err(ParseAnsiModeError(s.to_string())),
        }
    }
}

impl fmt::Display for AnsiMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnsiMode::Auto => "auto",
            AnsiMode::Always => "always",
            AnsiMode::Never => "never",
        })
    }
}

/// All runtime configuration for the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host name or IP address to listen on.
    pub host: String,
    /// TCP port; `0` lets the OS choose.
    pub port: u16,
    /// Whether to query the terminal for Sixel and cell-size support.
    pub probe: bool,
    /// ANSI styling policy for the rendered receipt.
    pub ansi: AnsiMode,
    /// `tracing` filter used when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ServerConfig {
    /// | Field     | Default     |
    /// |-----------|-------------|
    /// | host      | `localhost` |
    /// | port      | `9100`      |
    /// | probe     | `true`      |
    /// | ansi      | `auto`      |
    /// | log_level | `info`      |
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            probe: true,
            ansi: AnsiMode::Auto,
            log_level: "info".to_string(),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
