//! Decoded printer commands.
//!
//! The decoder turns raw bytes into a flat, ordered list of [`Command`]
//! values.  The session dispatcher hands the list to the renderer and looks
//! for commands that require a reply on the wire.

use crate::escpos::reply::{process_id_response, PROCESS_ID_RESPONSE_LEN};

/// `GS` (group separator), the lead byte of the process-identifier request.
pub const GS: u8 = 0x1D;

/// `LF`, prints the buffer and feeds one line.
pub const LF: u8 = 0x0A;

/// A single decoded printer command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// A run of printable bytes.  May contain UTF-8 or code-page text; the
    /// renderer decides how to interpret it.
    Text(Vec<u8>),

    /// Print and line feed.
    LineFeed,

    /// `GS ( H` function 48: the host asks the printer to echo back a
    /// four-byte process identifier once all preceding data is processed.
    RequestProcessId { d1: u8, d2: u8, d3: u8, d4: u8 },

    /// Any byte the stand-in decoder does not interpret.
    Control(u8),
}

impl Command {
    /// Returns the bytes the printer must send back for this command, if any.
    ///
    /// Only [`Command::RequestProcessId`] produces a reply.
    pub fn acknowledgement(&self) -> Option<[u8; PROCESS_ID_RESPONSE_LEN]> {
        match *self {
            Command::RequestProcessId { d1, d2, d3, d4 } => {
                Some(process_id_response([d1, d2, d3, d4]))
            }
            _ => None,
        }
    }
}
