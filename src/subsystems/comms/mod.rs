//! Comms subsystem: manages the external I/O channels.
//!
//! # Architecture
//!
//! Each channel implements [`runtime::Component`] and is spawned as an
//! independent concurrent task by [`start`] via
//! [`runtime::spawn_components`]. Channels capture their shared
//! [`Arc<CommsState>`] at construction time: no state is passed through the
//! generic `Component::run` signature.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events, turn tracking). This is drained in a
//! short-lived background task that dies naturally when all channel senders
//! are dropped.
//!
//! # Starting
//!
//! [`start`] is synchronous: it returns a [`SubsystemHandle`] as soon as
//! the tasks are spawned. The caller decides when (or whether) to await it.

pub mod axum_channel;
mod state;

pub use state::{CommsEvent, CommsState};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::chat::store::ChatStore;
use crate::chat::welcome::Welcome;
use crate::chat::ChatService;
use crate::config::Config;
use crate::subsystems::runtime::{Component, SubsystemHandle, spawn_components};

/// Capacity of the channel → manager event queue.
pub const EVENT_QUEUE: usize = 32;

// ── start ───────────────────────────────────────────────────────────────────

/// Spawn all configured comms channels and return a [`SubsystemHandle`].
///
/// Channels start immediately. If any channel exits with an error the shared
/// `shutdown` token is cancelled so siblings stop cooperatively. The handle
/// resolves when all channels have exited.
pub fn start(
    config: &Config,
    chat: Arc<ChatService>,
    store: Option<Arc<dyn ChatStore>>,
    shutdown: CancellationToken,
) -> SubsystemHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(EVENT_QUEUE);
    let welcome = Welcome::new(&config.prompts.ai_name, &config.prompts.owner_name);
    let state = Arc::new(CommsState::new(config.bot_name.clone(), chat, store, welcome, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    if config.comms.http.enabled {
        info!("loading axum http channel");
        components.push(Box::new(axum_channel::AxumChannel::new(
            "http0",
            config.comms.http.bind.clone(),
            state.clone(),
            config.comms.http.static_dir.clone(),
        )));
    }

    if components.is_empty() {
        info!("no comms channels configured");
    }

    // Drop our handle so the drain ends once every channel has exited.
    drop(state);

    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { ref channel_id } => {
                    debug!(channel_id, "channel reported shutdown");
                }
                CommsEvent::TurnStarted { ref channel_id, ref turn_id } => {
                    debug!(channel_id, turn_id, "turn started");
                }
            }
        }
    });

    spawn_components(components, shutdown)
}
