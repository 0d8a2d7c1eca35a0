//! Domain types for tpsim.

pub mod config;

pub use config::{AnsiMode, ParseAnsiModeError, ServerConfig, DEFAULT_HOST, DEFAULT_PORT};
