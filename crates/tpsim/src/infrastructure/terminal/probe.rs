//! Terminal capability probe.
//!
//! Asks the controlling terminal two questions at startup:
//!
//! 1. **Sixel support**, via the DA1 query `ESC [ c`.
//! 2. **Cell size**, via the iTerm2 query `ESC ] 1337 ; ReportCellSize ESC \`.
//!
//! Both go through [`query_terminal`], which switches the terminal to raw
//! mode for the duration of one exchange and always switches it back, even
//! when the exchange fails or panics.  Every failure degrades to a default
//! capability; nothing here can stop the server from starting.

use std::io;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::debug;

use tpsim_core::caps::{
    cell_size_reply_complete, da1_reply_complete, parse_sixel_support, try_parse_cell_size_reply,
    CELL_SIZE_REQUEST, DA1_REQUEST,
};
use tpsim_core::{Capabilities, CellSize};

/// How long one query waits for the terminal's reply.
pub const PROBE_DEADLINE: Duration = Duration::from_secs(1);

const READ_CHUNK: usize = 256;

/// Why a query produced no reply.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Standard input is not an interactive terminal.
    #[error("input is not an interactive terminal")]
    NotInteractive,

    /// Switching modes, writing the request, or reading the reply failed
    /// before any reply bytes arrived.
    #[error("terminal I/O error: {0}")]
    Io(#[from] io::Error),

    /// The deadline passed without any reply bytes.
    #[error("no reply within {0:?}")]
    Timeout(Duration),
}

// ── Terminal port ─────────────────────────────────────────────────────────────

/// The terminal operations a query needs.
///
/// Implemented by [`TtyPort`](super::tty::TtyPort) for a real terminal and by
/// in-memory fakes in tests.
pub trait TerminalPort {
    /// Saved terminal settings, handed back to [`TerminalPort::restore_mode`].
    type Mode;

    /// `true` if the input side is an interactive terminal.
    fn is_interactive(&self) -> bool;

    /// Switches to raw mode (no echo, no line buffering, reads return after
    /// at most ~100 ms) and returns the settings that were active before.
    fn enter_raw_mode(&mut self) -> io::Result<Self::Mode>;

    /// Reapplies previously saved settings.
    fn restore_mode(&mut self, saved: &Self::Mode) -> io::Result<()>;

    /// Writes `request` to the terminal and flushes it.
    fn write_request(&mut self, request: &[u8]) -> io::Result<()>;

    /// Reads whatever reply bytes are available.  `Ok(0)` means nothing
    /// arrived within the raw-mode read timeout.
    fn read_reply(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

/// Restores the saved terminal mode when dropped.
pub struct RawModeGuard<'a, P: TerminalPort> {
    port: &'a mut P,
    saved: P::Mode,
}

impl<'a, P: TerminalPort> RawModeGuard<'a, P> {
    /// Enters raw mode on `port`.  The mode is restored when the guard drops.
    pub fn enter(port: &'a mut P) -> io::Result<Self> {
        let saved = port.enter_raw_mode()?;
        Ok(Self { port, saved })
    }

    /// The terminal, for exchanging bytes while raw mode is held.
    pub fn port(&mut self) -> &mut P {
        self.port
    }
}

impl<P: TerminalPort> Drop for RawModeGuard<'_, P> {
    fn drop(&mut self) {
        if let Err(e) = self.port.restore_mode(&self.saved) {
            debug!("failed to restore terminal mode: {e}");
        }
    }
}

// ── Queries ───────────────────────────────────────────────────────────────────

/// Sends `request` to the terminal and collects the reply.
///
/// Reading stops as soon as `is_complete` accepts the bytes collected so far,
/// when a read fails, or when `deadline` has passed.  Whatever arrived is
/// returned, even if incomplete.
///
/// # Errors
///
/// - [`ProbeError::NotInteractive`] if the port is not a terminal.
/// - [`ProbeError::Io`] if raw mode could not be entered, the request could
///   not be written, or a read failed before any bytes arrived.
/// - [`ProbeError::Timeout`] if no bytes arrived before `deadline`.
pub fn query_terminal<P, F>(
    port: &mut P,
    request: &[u8],
    deadline: Duration,
    is_complete: F,
) -> Result<Vec<u8>, ProbeError>
where
    P: TerminalPort,
    F: Fn(&[u8]) -> bool,
{
    if !port.is_interactive() {
        return Err(ProbeError::NotInteractive);
    }

    let mut guard = RawModeGuard::enter(port)?;
    guard.port().write_request(request)?;

    let started = Instant::now();
    let mut reply = Vec::new();
    let mut buf = [0u8; READ_CHUNK];

    while started.elapsed() < deadline {
        match guard.port().read_reply(&mut buf) {
            Ok(0) => continue,
            Ok(n) => {
                reply.extend_from_slice(&buf[..n]);
                if is_complete(&reply) {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!("terminal read failed after {} byte(s): {e}", reply.len());
                if reply.is_empty() {
                    return Err(ProbeError::Io(e));
                }
                break;
            }
        }
    }

    drop(guard);

    if reply.is_empty() {
        Err(ProbeError::Timeout(deadline))
    } else {
        Ok(reply)
    }
}

/// Asks the terminal whether it can display Sixel graphics.
pub fn detect_sixel_support<P: TerminalPort>(port: &mut P) -> bool {
    match query_terminal(port, DA1_REQUEST, PROBE_DEADLINE, da1_reply_complete) {
        Ok(reply) => parse_sixel_support(&reply),
        Err(e) => {
            debug!("sixel query failed: {e}");
            false
        }
    }
}

/// Asks the terminal for its cell size and display scale.
pub fn detect_cell_size<P: TerminalPort>(port: &mut P) -> Option<CellSize> {
    match query_terminal(port, CELL_SIZE_REQUEST, PROBE_DEADLINE, cell_size_reply_complete) {
        Ok(reply) => match try_parse_cell_size_reply(&reply) {
            Ok(cell) => Some(cell),
            Err(e) => {
                debug!("ignoring cell size reply {reply:?}: {e}");
                None
            }
        },
        Err(e) => {
            debug!("cell size query failed: {e}");
            None
        }
    }
}

/// Runs both queries, Sixel first.
pub fn probe_capabilities<P: TerminalPort>(port: &mut P) -> Capabilities {
    let sixel = detect_sixel_support(port);
    let cell_size = detect_cell_size(port);
    let caps = Capabilities { sixel, cell_size };
    debug!("terminal capabilities: {caps:?}");
    caps
}

/// Probes the process's own stdin/stdout.
#[cfg(unix)]
pub fn probe_stdio() -> Capabilities {
    probe_capabilities(&mut super::tty::TtyPort::stdio())
}

/// Probes the process's own stdin/stdout.
#[cfg(not(unix))]
pub fn probe_stdio() -> Capabilities {
    debug!("terminal probe is not supported on this platform");
    Capabilities::default()
}
