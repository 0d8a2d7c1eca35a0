//! # tpsim-core
//!
//! Shared library for the thermal printer simulator containing the ESC/POS
//! command model, the acknowledgement encoder, the terminal capability reply
//! parsers, and the plain-text receipt renderer.
//!
//! This crate has no dependencies on sockets, terminals, or async runtimes.
//! Everything here operates on byte slices and `std::io::Write` sinks, so the
//! `tpsim` application can drive it from any transport.
//!
//! # Modules
//!
//! - **`escpos`** – The decoded command model, a minimal stateful decoder that
//!   recognises the process-identifier request, and the fixed 9-byte reply the
//!   printer sends back for it.
//!
//! - **`caps`** – The capability snapshot (Sixel support, cell geometry) and
//!   the byte-exact parsers for the DA1 and `ReportCellSize` terminal replies.
//!
//! - **`render`** – The renderer trait consumed by the session dispatcher and
//!   a plain-text implementation.

pub mod caps;
pub mod escpos;
pub mod render;

pub use caps::{Capabilities, CellSize};
pub use escpos::command::Command;
pub use escpos::decoder::{CommandDecoder, MinimalDecoder};
pub use escpos::reply::{process_id_response, PROCESS_ID_RESPONSE_LEN};
pub use render::{ReceiptRenderer, RendererOptions, TextRenderer};
