//! Real terminal access for the capability probe (Unix only).
//!
//! Raw mode here is narrower than `cfmakeraw`: only canonical
//! input and echo are turned off, with `VMIN = 0` and `VTIME = 1` so a read
//! returns after at most 100 ms.  Output processing and signals stay as they
//! were.
//!
//! Because `ISIG` stays on, Ctrl+C still raises SIGINT while raw mode is
//! active.  A drop guard cannot run when a signal's default action kills the
//! process, so [`TtyPort`] also keeps a SIGINT/SIGTERM hook installed for as
//! long as raw mode is held.  The hook puts the saved settings back and exits
//! with status `128 + signal`.

use std::io::{self, IsTerminal, Read, Write};
use std::os::fd::{AsFd, OwnedFd};
use std::process;
use std::thread::{self, JoinHandle};

use nix::sys::termios::{
    tcgetattr, tcsetattr, LocalFlags, SetArg, SpecialCharacterIndices, Termios,
};
use signal_hook::consts::signal::{SIGINT, SIGTERM};
use signal_hook::iterator::{Handle, Signals};
use tracing::warn;

use super::probe::TerminalPort;

/// A terminal reached through an input and an output handle.
#[derive(Debug)]
pub struct TtyPort<I, O> {
    input: I,
    output: O,
    on_signal: Option<SignalRestore>,
}

impl<I, O> TtyPort<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self {
            input,
            output,
            on_signal: None,
        }
    }
}

impl TtyPort<io::Stdin, io::Stdout> {
    /// The process's own stdin/stdout.
    pub fn stdio() -> Self {
        Self::new(io::stdin(), io::stdout())
    }
}

impl<I: Read + AsFd, O: Write> TerminalPort for TtyPort<I, O> {
    type Mode = Termios;

    fn is_interactive(&self) -> bool {
        self.input.as_fd().is_terminal()
    }

    fn enter_raw_mode(&mut self) -> io::Result<Termios> {
        let saved = tcgetattr(self.input.as_fd())?;

        // The hook goes in before the mode changes so there is no window in
        // which a signal could leave raw mode behind.
        let fd = self.input.as_fd().try_clone_to_owned()?;
        self.on_signal = Some(SignalRestore::install(fd, saved.clone())?);

        let mut raw = saved.clone();
        raw.local_flags.remove(LocalFlags::ECHO | LocalFlags::ICANON);
        raw.control_chars[SpecialCharacterIndices::VMIN as usize] = 0;
        raw.control_chars[SpecialCharacterIndices::VTIME as usize] = 1;
        if let Err(e) = tcsetattr(self.input.as_fd(), SetArg::TCSANOW, &raw) {
            self.on_signal = None;
            return Err(e.into());
        }

        Ok(saved)
    }

    fn restore_mode(&mut self, saved: &Termios) -> io::Result<()> {
        let restored = tcsetattr(self.input.as_fd(), SetArg::TCSANOW, saved);
        self.on_signal = None;
        restored?;
        Ok(())
    }

    fn write_request(&mut self, request: &[u8]) -> io::Result<()> {
        self.output.write_all(request)?;
        self.output.flush()
    }

    fn read_reply(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

// ── Signal hook ───────────────────────────────────────────────────────────────

/// Restores `saved` on the terminal and exits if SIGINT or SIGTERM arrives
/// while this value is alive.
///
/// Removing the last signal-hook action for a signal does not bring back the
/// default disposition, so the process must have its own SIGINT/SIGTERM
/// listeners registered before one of these is dropped.
#[derive(Debug)]
struct SignalRestore {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

impl SignalRestore {
    fn install(fd: OwnedFd, saved: Termios) -> io::Result<Self> {
        let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(io::Error::other)?;
        let handle = signals.handle();
        let thread = thread::Builder::new()
            .name("tty-signal-restore".into())
            .spawn(move || {
                // Ends without a signal once the handle is closed.
                if let Some(signal) = signals.forever().next() {
                    if let Err(e) = tcsetattr(&fd, SetArg::TCSANOW, &saved) {
                        warn!("failed to restore terminal mode on signal {signal}: {e}");
                    }
                    warn!("signal {signal} received while the terminal was in raw mode; exiting");
                    process::exit(128 + signal);
                }
            })?;
        Ok(Self {
            handle,
            thread: Some(thread),
        })
    }
}

impl Drop for SignalRestore {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
