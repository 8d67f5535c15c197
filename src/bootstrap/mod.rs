//! Bootstrap layer: modules that run before the chat service starts.
//!
//! - **logger**: tracing-subscriber initialisation.

pub mod logger;
