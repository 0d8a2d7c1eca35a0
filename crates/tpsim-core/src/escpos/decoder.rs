//! Incremental command decoding.
//!
//! TCP delivers bytes in arbitrary batches: a single read may end in the
//! middle of a command, or carry several commands at once.  A decoder
//! therefore keeps parse state between calls and only emits a command once
//! all of its bytes have arrived.
//!
//! [`MinimalDecoder`] is a stand-in for a full ESC/POS grammar.  It knows
//! exactly one multi-byte command, the process-identifier request
//! (`GS ( H 06 00 30 30 d1 d2 d3 d4`), and classifies every other byte as
//! text, line feed, or an uninterpreted control byte.

use tracing::trace;

use crate::escpos::command::{Command, GS, LF};

/// Fixed prefix of the process-identifier request: `GS ( H pL pH fn m`.
const PROCESS_ID_PREFIX: [u8; 7] = [GS, 0x28, 0x48, 0x06, 0x00, 0x30, 0x30];

/// Total length of the process-identifier request including its data bytes.
const PROCESS_ID_REQUEST_LEN: usize = PROCESS_ID_PREFIX.len() + 4;

/// Turns raw printer bytes into commands, keeping state across calls.
pub trait CommandDecoder: Send {
    /// Consumes the next chunk and returns every command completed by it, in
    /// order.  Bytes belonging to an unfinished command are retained.
    fn decode(&mut self, chunk: &[u8]) -> Vec<Command>;
}

/// Stateful byte classifier that recognises the process-identifier request.
///
/// Text runs are flushed at the end of every chunk, so the *number* of
/// [`Command::Text`] values depends on chunking, but their concatenated bytes
/// and the position of every other command do not.  A UTF-8 sequence cut off
/// by the end of a chunk is held back until its remaining bytes arrive, so no
/// single [`Command::Text`] ever ends inside a character that the sender
/// completed.
#[derive(Debug, Default)]
pub struct MinimalDecoder {
    /// Bytes of a possibly incomplete process-identifier request.
    pending: Vec<u8>,
    /// Printable bytes not yet emitted.
    text: Vec<u8>,
}

impl MinimalDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a partial multi-byte command is buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    fn push(&mut self, byte: u8, out: &mut Vec<Command>) {
        if !self.pending.is_empty() {
            self.push_pending(byte, out);
            return;
        }

        match byte {
            GS => {
                self.flush_text(out);
                self.pending.push(byte);
            }
            LF => {
                self.flush_text(out);
                out.push(Command::LineFeed);
            }
            b if is_printable(b) => self.text.push(b),
            b => {
                self.flush_text(out);
                out.push(Command::Control(b));
            }
        }
    }

    fn push_pending(&mut self, byte: u8, out: &mut Vec<Command>) {
        self.pending.push(byte);
        let len = self.pending.len();

        if len <= PROCESS_ID_PREFIX.len() {
            if byte != PROCESS_ID_PREFIX[len - 1] {
                // Not a process-id request after all: the GS stands alone and
                // the remaining bytes are classified from scratch.
                let rejected = std::mem::take(&mut self.pending);
                out.push(Command::Control(rejected[0]));
                for &b in &rejected[1..] {
                    self.push(b, out);
                }
            }
            return;
        }

        if len == PROCESS_ID_REQUEST_LEN {
            let d = &self.pending[PROCESS_ID_PREFIX.len()..];
            let cmd = Command::RequestProcessId {
                d1: d[0],
                d2: d[1],
                d3: d[2],
                d4: d[3],
            };
            trace!("decoded {cmd:?}");
            out.push(cmd);
            self.pending.clear();
        }
    }

    fn flush_text(&mut self, out: &mut Vec<Command>) {
        if !self.text.is_empty() {
            out.push(Command::Text(std::mem::take(&mut self.text)));
        }
    }

    /// Flushes buffered text except a trailing incomplete UTF-8 sequence.
    fn flush_complete_text(&mut self, out: &mut Vec<Command>) {
        let keep = incomplete_utf8_tail(&self.text);
        if self.text.len() > keep {
            let tail = self.text.split_off(self.text.len() - keep);
            out.push(Command::Text(std::mem::replace(&mut self.text, tail)));
        }
    }
}

impl CommandDecoder for MinimalDecoder {
    fn decode(&mut self, chunk: &[u8]) -> Vec<Command> {
        let mut out = Vec::new();
        for &byte in chunk {
            self.push(byte, &mut out);
        }
        self.flush_complete_text(&mut out);
        out
    }
}

fn is_printable(byte: u8) -> bool {
    matches!(byte, 0x20..=0x7E | 0x80..=0xFF)
}

/// Number of bytes at the end of `bytes` that start a UTF-8 sequence whose
/// remaining bytes are missing, or 0.
fn incomplete_utf8_tail(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let needed = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => return 0,
        };
        return if needed > back { back } else { 0 };
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST_1234: [u8; 11] = [
        0x1D, 0x28, 0x48, 0x06, 0x00, 0x30, 0x30, 0x01, 0x02, 0x03, 0x04,
    ];

    fn pid(d1: u8, d2: u8, d3: u8, d4: u8) -> Command {
        Command::RequestProcessId { d1, d2, d3, d4 }
    }

    #[test]
    fn test_decode_process_id_request_in_one_chunk() {
        // Arrange
        let mut decoder = MinimalDecoder::new();

        // Act
        let cmds = decoder.decode(&REQUEST_1234);

        // Assert
        assert_eq!(cmds, vec![pid(1, 2, 3, 4)]);
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_decode_process_id_request_split_across_chunks() {
        let mut decoder = MinimalDecoder::new();

        assert!(decoder.decode(&REQUEST_1234[..3]).is_empty());
        assert!(decoder.has_pending());
        assert!(decoder.decode(&REQUEST_1234[3..9]).is_empty());
        assert_eq!(decoder.decode(&REQUEST_1234[9..]), vec![pid(1, 2, 3, 4)]);
    }

    #[test]
    fn test_decode_text_and_line_feed() {
        let mut decoder = MinimalDecoder::new();

        let cmds = decoder.decode(b"Hello\nWorld");

        assert_eq!(
            cmds,
            vec![
                Command::Text(b"Hello".to_vec()),
                Command::LineFeed,
                Command::Text(b"World".to_vec()),
            ]
        );
    }

    #[test]
    fn test_decode_unknown_control_bytes() {
        let mut decoder = MinimalDecoder::new();

        // ESC @ (initialize): ESC is uninterpreted, '@' is printable.
        let cmds = decoder.decode(&[0x1B, 0x40]);

        assert_eq!(
            cmds,
            vec![Command::Control(0x1B), Command::Text(b"@".to_vec())]
        );
    }

    #[test]
    fn test_decode_non_matching_gs_sequence_is_reclassified() {
        // GS V 0 (cut) is not a process-id request.
        let mut decoder = MinimalDecoder::new();

        let cmds = decoder.decode(&[0x1D, 0x56, 0x00]);

        assert_eq!(
            cmds,
            vec![
                Command::Control(0x1D),
                Command::Text(b"V".to_vec()),
                Command::Control(0x00),
            ]
        );
        assert!(!decoder.has_pending());
    }

    #[test]
    fn test_decode_rejected_prefix_containing_new_request() {
        // A truncated prefix immediately followed by a complete request.
        let mut decoder = MinimalDecoder::new();
        let mut bytes = vec![0x1D, 0x28];
        bytes.extend_from_slice(&REQUEST_1234);

        let cmds = decoder.decode(&bytes);

        assert_eq!(
            cmds,
            vec![
                Command::Control(0x1D),
                Command::Text(b"(".to_vec()),
                pid(1, 2, 3, 4),
            ]
        );
    }

    #[test]
    fn test_decode_utf8_text_passes_through() {
        let mut decoder = MinimalDecoder::new();

        let cmds = decoder.decode("合計".as_bytes());

        assert_eq!(cmds, vec![Command::Text("合計".as_bytes().to_vec())]);
    }

    #[test]
    fn test_decode_character_split_across_chunks_stays_whole() {
        // Arrange: "合" is E5 90 88; the first chunk ends after its lead byte.
        let mut decoder = MinimalDecoder::new();
        let line = "合計 ¥500\n".as_bytes();

        // Act
        let first = decoder.decode(&line[..1]);
        let second = decoder.decode(&line[1..]);

        // Assert
        assert!(first.is_empty());
        assert_eq!(
            second,
            vec![
                Command::Text("合計 ¥500".as_bytes().to_vec()),
                Command::LineFeed
            ]
        );
    }

    #[test]
    fn test_decode_text_before_cut_character_is_emitted() {
        let mut decoder = MinimalDecoder::new();

        // "¥" is C2 A5.
        let cmds = decoder.decode(&[b'A', 0xC2]);

        assert_eq!(cmds, vec![Command::Text(b"A".to_vec())]);
        assert_eq!(
            decoder.decode(&[0xA5]),
            vec![Command::Text("¥".as_bytes().to_vec())]
        );
    }

    #[test]
    fn test_decode_unfinished_character_flushed_by_line_feed() {
        // The sender never completed the character; the bytes still come out
        // in order ahead of the line feed.
        let mut decoder = MinimalDecoder::new();

        assert!(decoder.decode(&[0xE5, 0x90]).is_empty());
        let cmds = decoder.decode(b"\n");

        assert_eq!(
            cmds,
            vec![Command::Text(vec![0xE5, 0x90]), Command::LineFeed]
        );
    }

    #[test]
    fn test_incomplete_utf8_tail_lengths() {
        assert_eq!(incomplete_utf8_tail(b""), 0);
        assert_eq!(incomplete_utf8_tail(b"abc"), 0);
        assert_eq!(incomplete_utf8_tail("合".as_bytes()), 0);
        assert_eq!(incomplete_utf8_tail(&[b'a', 0xE5]), 1);
        assert_eq!(incomplete_utf8_tail(&[0xE5, 0x90]), 2);
        assert_eq!(incomplete_utf8_tail(&[0xF0, 0x9F, 0x98]), 3);
        // Stray continuation bytes are not held back.
        assert_eq!(incomplete_utf8_tail(&[0x90, 0x88]), 0);
    }

    #[test]
    fn test_decode_empty_chunk_yields_nothing() {
        let mut decoder = MinimalDecoder::new();
        assert!(decoder.decode(&[]).is_empty());
    }
}
