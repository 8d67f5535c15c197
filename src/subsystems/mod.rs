//! Long-running subsystems of the chat service.

pub mod comms;
pub mod runtime;
