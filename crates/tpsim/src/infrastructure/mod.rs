//! Infrastructure layer for tpsim.
//!
//! Contains all OS- and I/O-facing code:
//!
//! - `network`  – TCP listener, per-connection byte bridge, accept loop
//! - `terminal` – Raw-mode capability probe of the controlling terminal
//! - `storage`  – TOML configuration file
//! - `license`  – Embedded third-party notices

pub mod license;
pub mod network;
pub mod storage;
pub mod terminal;
