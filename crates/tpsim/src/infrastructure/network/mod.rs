//! TCP networking: listener, per-connection byte bridge, and the accept loop.

pub mod acceptor;
pub mod bridge;
pub mod server;

pub use acceptor::{start, AcceptError, BindError, Connections};
pub use bridge::{Inbound, Outbound, Session, SessionError};
pub use server::{handle_session, run_server};
