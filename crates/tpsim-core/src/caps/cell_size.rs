//! Cell geometry via the iTerm2 `ReportCellSize` extension (OSC 1337).
//!
//! Request: `ESC ] 1337 ; ReportCellSize ESC \`.
//! Reply:   `ESC ] 1337 ; ReportCellSize=height;width[;scale] ST`, where ST is
//! either `BEL` or `ESC \`.  Height and width are in points; scale is the
//! backing scale factor (2.0 on Retina displays).

use thiserror::Error;

use crate::caps::CellSize;

/// The `ReportCellSize` query.
pub const CELL_SIZE_REQUEST: &[u8] = b"\x1b]1337;ReportCellSize\x1b\\";

const BEL: u8 = 0x07;
const ESC: u8 = 0x1B;

/// A reply is complete once a string terminator (`BEL` or `ESC \`) arrived.
pub fn cell_size_reply_complete(reply: &[u8]) -> bool {
    reply.contains(&BEL) || reply.windows(2).any(|w| w == [ESC, b'\\'])
}

/// Why a `ReportCellSize` reply was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CellSizeError {
    #[error("reply is not ASCII")]
    NotAscii,
    #[error("reply has no '='")]
    MissingEquals,
    #[error("terminator precedes '='")]
    TerminatorBeforeEquals,
    #[error("expected at least height and width, got {0} value(s)")]
    TooFewValues(usize),
    #[error("width is not a number")]
    InvalidWidth,
    #[error("pixel width is not a positive 32-bit value")]
    PixelWidthOutOfRange,
}

/// Parses a `ReportCellSize` reply.
///
/// Returns `None` if the reply is not ASCII, has no `=`, carries fewer than
/// two values, has a non-numeric width, or yields a pixel width of zero or
/// less.  A missing or non-numeric scale is treated as `1.0`.
pub fn parse_cell_size_reply(reply: &[u8]) -> Option<CellSize> {
    try_parse_cell_size_reply(reply).ok()
}

/// Like [`parse_cell_size_reply`], but says why a reply was rejected.
///
/// # Errors
///
/// Returns the first [`CellSizeError`] the reply runs into.
pub fn try_parse_cell_size_reply(reply: &[u8]) -> Result<CellSize, CellSizeError> {
    if !reply.is_ascii() {
        return Err(CellSizeError::NotAscii);
    }
    let text = std::str::from_utf8(reply).map_err(|_| CellSizeError::NotAscii)?;

    let eq = text.find('=').ok_or(CellSizeError::MissingEquals)?;
    let end = text
        .find('\u{07}')
        .or_else(|| text.rfind('\u{1b}'))
        .unwrap_or(text.len());
    if end <= eq {
        return Err(CellSizeError::TerminatorBeforeEquals);
    }

    let parts: Vec<&str> = text[eq + 1..end]
        .split(';')
        .filter(|p| !p.is_empty())
        .collect();
    if parts.len() < 2 {
        return Err(CellSizeError::TooFewValues(parts.len()));
    }

    let width = parts[1]
        .parse::<f64>()
        .ok()
        .filter(|w| w.is_finite())
        .ok_or(CellSizeError::InvalidWidth)?;
    let scale = parts
        .get(2)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| s.is_finite())
        .unwrap_or(1.0);

    let pixel_width = (width * scale).round();
    if pixel_width <= 0.0 || pixel_width > f64::from(u32::MAX) {
        return Err(CellSizeError::PixelWidthOutOfRange);
    }
    let display_scale = scale.round().clamp(1.0, f64::from(u32::MAX));

    Ok(CellSize {
        cell_pixel_width: pixel_width as u32,
        display_scale: display_scale as u32,
    })
}
