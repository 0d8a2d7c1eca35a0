//! Sixel detection via Primary Device Attributes (DA1).
//!
//! Request: `ESC [ c`.  A typical reply is `ESC [ ? 62 ; 4 ; 22 c`; the
//! attribute list is semicolon separated and attribute `4` means the terminal
//! can display Sixel graphics.

/// The DA1 query.
pub const DA1_REQUEST: &[u8] = b"\x1b[c";

/// A DA1 reply is terminated by `c`.
pub fn da1_reply_complete(reply: &[u8]) -> bool {
    reply.contains(&b'c')
}

/// Returns `true` if the DA1 reply lists attribute `4`.
///
/// Malformed replies (non-ASCII, no `?`, no `c`, or `?` after `c`) count as
/// "not supported".
pub fn parse_sixel_support(reply: &[u8]) -> bool {
    if !reply.is_ascii() {
        return false;
    }
    let Ok(text) = std::str::from_utf8(reply) else {
        return false;
    };

    let (Some(q), Some(c)) = (text.find('?'), text.find('c')) else {
        return false;
    };
    if q >= c {
        return false;
    }

    text[q + 1..c].split(';').map(str::trim).any(|attr| attr == "4")
}
