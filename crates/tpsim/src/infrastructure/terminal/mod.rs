//! Controlling-terminal access: the startup capability probe.

pub mod probe;
#[cfg(unix)]
pub mod tty;

pub use probe::{
    detect_cell_size, detect_sixel_support, probe_capabilities, probe_stdio, query_terminal,
    ProbeError, RawModeGuard, TerminalPort, PROBE_DEADLINE,
};
#[cfg(unix)]
pub use tty::TtyPort;
