//! Third-party license notices, printed by `tpsim --license`.

use std::io::{self, Write};

/// Notice text embedded at build time.
pub const THIRD_PARTY_LICENSES: &str = include_str!("../../THIRD_PARTY_LICENSES.txt");

/// Writes the notices to `out`.
///
/// # Errors
///
/// Returns any error from writing to `out`.
pub fn print_licenses<W: Write>(out: &mut W) -> io::Result<()> {
    out.write_all(THIRD_PARTY_LICENSES.as_bytes())?;
    if !THIRD_PARTY_LICENSES.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}
