//! MB-AI chat service library.
//!
//! Every chat turn runs: moderation gate → system-prompt assembly →
//! tool-augmented model invocation → streamed response relay.
//!
//! - **core**: config and error types.
//! - **bootstrap**: process-wide logging.
//! - **moderation**: content classifier backends.
//! - **tools**: web and vector search clients exposed to the model.
//! - **llm**: provider backends and the bounded step loop.
//! - **chat**: UI message model, turn pipeline, stream relay, history.
//! - **subsystems**: the axum HTTP channel and its component runtime.

pub mod bootstrap;
pub mod chat;
pub mod core;
pub mod llm;
pub mod moderation;
pub mod subsystems;
pub mod tools;

pub use self::core::{config, error};
