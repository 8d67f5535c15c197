//! The chat route: UI message model, moderation-gated turn pipeline and the
//! streamed relay back to the browser.
//!
//! - **message** / **convert**: browser message shape and its model form.
//! - **prompt**: layered system prompt, assembled once at startup.
//! - **pipeline**: one turn: moderation, prompt, model, events.
//! - **stream** / **relay**: UI message stream chunks and the SSE response.
//! - **assemble**: fold a stream back into an assistant message.
//! - **store**: persisted `{ messages, durations }` history.
//! - **compare**: college comparison form helpers.
//! - **welcome**: empty-screen copy and quick prompts.

pub mod assemble;
pub mod compare;
pub mod convert;
pub mod message;
pub mod pipeline;
pub mod prompt;
pub mod relay;
pub mod store;
pub mod stream;
pub mod welcome;

pub use message::{UiMessage, UiMessagePart, UiRole};
pub use pipeline::{ChatService, Turn, TurnState};
pub use store::{ChatHistory, ChatStore, JsonFileStore, MemoryStore};
