//! Application layer for tpsim.
//!
//! Knows *what* a session does with its bytes (decode, render, reply) but not
//! how bytes reach it.  The network layer drives it.

pub mod dispatch;

pub use dispatch::{Reply, SessionDispatcher, SessionFactory, StdoutSessionFactory};
