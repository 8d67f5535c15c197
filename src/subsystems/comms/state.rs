//! Shared state for the Comms subsystem: capability boundary for channels.
//!
//! Channels receive an `Arc<CommsState>` and are restricted to the typed
//! methods below: start a turn, read or replace the persisted history, and
//! read the static welcome copy.
//!
//! # Intra-subsystem events
//!
//! [`CommsState::report_event`] lets a running channel signal the comms
//! subsystem manager (e.g. "I shut down", "turn started") without a direct
//! dependency on the manager. The manager owns the receiver end.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::chat::store::{ChatHistory, ChatStore};
use crate::chat::welcome::Welcome;
use crate::chat::{ChatService, Turn, UiMessage};
use crate::error::AppError;

// ── Events ────────────────────────────────────────────────────────────────────

/// Events a channel sends back to the comms subsystem manager.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped.
    ChannelShutdown { channel_id: String },
    /// A chat turn was accepted on the channel.
    TurnStarted { channel_id: String, turn_id: String },
}

// ── State ─────────────────────────────────────────────────────────────────────

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    bot_name: String,
    chat: Arc<ChatService>,
    /// `None` when history persistence is disabled.
    store: Option<Arc<dyn ChatStore>>,
    welcome: Welcome,
    /// Back-channel to the comms subsystem manager.
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(
        bot_name: impl Into<String>,
        chat: Arc<ChatService>,
        store: Option<Arc<dyn ChatStore>>,
        welcome: Welcome,
        event_tx: mpsc::Sender<CommsEvent>,
    ) -> Self {
        Self { bot_name: bot_name.into(), chat, store, welcome, event_tx }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    pub fn chat(&self) -> &ChatService {
        &self.chat
    }

    pub fn welcome(&self) -> &Welcome {
        &self.welcome
    }

    pub fn history_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Start a chat turn on behalf of `channel_id`.
    pub fn start_turn(&self, channel_id: &str, messages: Vec<UiMessage>, cancel: CancellationToken) -> Turn {
        let turn = self.chat.start_turn(messages, cancel);
        self.report_event(CommsEvent::TurnStarted {
            channel_id: channel_id.to_string(),
            turn_id: turn.id.clone(),
        });
        turn
    }

    /// Load the persisted history. Store I/O runs on the blocking pool.
    pub async fn load_history(&self) -> Result<ChatHistory, AppError> {
        let store = self.require_store()?;
        tokio::task::spawn_blocking(move || store.load())
            .await
            .map_err(|e| AppError::Store(format!("history task failed: {e}")))
    }

    pub async fn save_history(&self, history: ChatHistory) -> Result<(), AppError> {
        let store = self.require_store()?;
        tokio::task::spawn_blocking(move || store.save(&history))
            .await
            .map_err(|e| AppError::Store(format!("history task failed: {e}")))?
            .map_err(|e| AppError::Store(e.to_string()))
    }

    pub async fn clear_history(&self) -> Result<(), AppError> {
        let store = self.require_store()?;
        tokio::task::spawn_blocking(move || store.clear())
            .await
            .map_err(|e| AppError::Store(format!("history task failed: {e}")))?
            .map_err(|e| AppError::Store(e.to_string()))
    }

    fn require_store(&self) -> Result<Arc<dyn ChatStore>, AppError> {
        self.store
            .clone()
            .ok_or_else(|| AppError::Store("history persistence is disabled".into()))
    }

    /// Report an event to the comms subsystem manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up (channel full) or has already exited (closed).
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }
}
