//! ESC/POS command model, stand-in decoder, and acknowledgement encoding.

pub mod command;
pub mod decoder;
pub mod reply;
