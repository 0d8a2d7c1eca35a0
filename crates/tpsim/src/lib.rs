//! tpsim library crate.
//!
//! A thermal receipt printer simulator: it listens on a TCP port like a
//! networked ESC/POS printer, renders what it receives in the terminal, and
//! answers the host's process-identifier requests.
//!
//! # Architecture
//!
//! ```text
//! POS host (raw ESC/POS over TCP, port 9100)
//!         ↕
//! [tpsim]
//!   ├── domain/            ServerConfig, AnsiMode
//!   ├── application/       SessionDispatcher: decode → render → reply
//!   └── infrastructure/
//!         ├── network/     Listener, byte-stream bridge, accept loop
//!         ├── terminal/    Raw-mode Sixel / cell-size probe
//!         ├── storage/     TOML config file
//!         └── license      Embedded third-party notices
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `tpsim-core` only.
//! - `infrastructure` depends on all other layers plus `tokio` and `nix`.

/// Domain layer: configuration types (no I/O).
pub mod domain;

/// Application layer: per-session dispatch logic.
pub mod application;

/// Infrastructure layer: sockets, terminal, config file.
pub mod infrastructure;
