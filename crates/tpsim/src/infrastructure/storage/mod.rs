//! Persistent configuration storage.

pub mod config;

pub use config::{load_config, parse_config, AppConfig, ConfigError};
