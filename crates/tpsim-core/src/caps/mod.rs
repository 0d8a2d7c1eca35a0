//! Terminal capability snapshot and reply parsers.
//!
//! The probe in the `tpsim` application performs the raw-mode exchange with
//! the controlling terminal; this module only knows what to send, when a
//! reply is complete, and how to interpret it.  Keeping the parsers free of
//! I/O means every reply format can be tested byte-for-byte.

pub mod cell_size;
pub mod sixel;

pub use cell_size::{
    cell_size_reply_complete, parse_cell_size_reply, try_parse_cell_size_reply, CellSizeError,
    CELL_SIZE_REQUEST,
};
pub use sixel::{da1_reply_complete, parse_sixel_support, DA1_REQUEST};

/// Character cell geometry reported by the terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellSize {
    /// Cell width in device pixels (`width × scale`).
    pub cell_pixel_width: u32,
    /// Display scale factor, at least 1 (2 on a typical HiDPI display).
    pub display_scale: u32,
}

/// Immutable result of the startup capability probe.
///
/// Built once before any session starts and shared read-only afterwards.
/// The `Default` value (no Sixel, unknown geometry) is what a probe that
/// cannot complete degrades to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    /// `true` if the terminal advertised Sixel graphics in its DA1 reply.
    pub sixel: bool,
    /// Cell geometry, if the terminal answered `ReportCellSize`.
    pub cell_size: Option<CellSize>,
}
