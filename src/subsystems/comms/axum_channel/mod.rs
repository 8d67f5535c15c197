//! Axum-based HTTP channel: serves the chat API under `/api/` and the root
//! page (or a prebuilt web UI) for everything else.
//!
//! Implements [`Component`] so it slots into the comms subsystem lifecycle:
//! `run()` drives the axum event loop; the shared [`CancellationToken`] is
//! wired to axum's graceful shutdown and is the parent of every turn's token.
//!
//! ## URL layout
//!
//! ```text
//! GET    /api/health
//! POST   /api/chat               : UI message stream
//! POST   /api/compare            : comparison form → UI message stream
//! POST   /api/compare/intent
//! GET    /api/compare/catalog
//! GET    /api/history
//! PUT    /api/history
//! DELETE /api/history
//! GET    /api/welcome
//! GET    /favicon.ico             → 204
//! GET    /                        → root HTML (or static UI)
//! ```

mod api;
mod ui;

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};

use super::state::{CommsEvent, CommsState};

/// Full histories are posted on every turn.
const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

// ── Shared request state ──────────────────────────────────────────────────────

/// Axum router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone: all fields are reference-counted.
#[derive(Clone)]
pub struct AxumState {
    /// Channel identifier used in log spans.
    pub channel_id: Arc<str>,
    /// Comms subsystem capabilities (turns, history, welcome copy).
    pub comms: Arc<CommsState>,
    /// Parent of every turn's cancellation token.
    pub shutdown: CancellationToken,
}

impl AxumState {
    pub fn new(channel_id: &str, comms: Arc<CommsState>, shutdown: CancellationToken) -> Self {
        Self { channel_id: Arc::from(channel_id), comms, shutdown }
    }
}

// ── AxumChannel ───────────────────────────────────────────────────────────────

pub struct AxumChannel {
    channel_id: String,
    bind_addr: String,
    state: Arc<CommsState>,
    static_dir: Option<PathBuf>,
}

impl AxumChannel {
    pub fn new(
        channel_id: impl Into<String>,
        bind_addr: impl Into<String>,
        state: Arc<CommsState>,
        static_dir: Option<PathBuf>,
    ) -> Self {
        Self {
            channel_id: channel_id.into(),
            bind_addr: bind_addr.into(),
            state,
            static_dir,
        }
    }
}

impl Component for AxumChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(run_axum(
            self.channel_id,
            self.bind_addr,
            self.state,
            self.static_dir,
            shutdown,
        ))
    }
}

// ── Server loop ───────────────────────────────────────────────────────────────

async fn run_axum(
    channel_id: String,
    bind_addr: String,
    comms: Arc<CommsState>,
    static_dir: Option<PathBuf>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    let axum_state = AxumState::new(&channel_id, comms.clone(), shutdown.clone());
    let router = build_router(axum_state, static_dir.as_deref());

    let listener = TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| AppError::Comms(format!("axum bind failed on {bind_addr}: {e}")))?;

    info!(%channel_id, %bind_addr, "axum channel listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| AppError::Comms(format!("axum server error: {e}")))?;

    info!(%channel_id, "axum channel shut down");
    comms.report_event(CommsEvent::ChannelShutdown { channel_id });
    Ok(())
}

// ── Router ────────────────────────────────────────────────────────────────────

/// Build the full router. With `static_dir` set (and the `ui-static`
/// feature), non-API paths are served from that directory instead of the
/// built-in root page.
pub fn build_router(state: AxumState, static_dir: Option<&std::path::Path>) -> Router {
    let router = Router::new()
        // API routes
        .route("/api/health",          get(api::health))
        .route("/api/chat",            post(api::chat))
        .route("/api/compare",         post(api::compare))
        .route("/api/compare/intent",  post(api::compare_intent))
        .route("/api/compare/catalog", get(api::compare_catalog))
        .route("/api/history",         get(api::history_get).put(api::history_put).delete(api::history_delete))
        .route("/api/welcome",         get(api::welcome))
        // UI routes
        .route("/favicon.ico", get(|| async { StatusCode::NO_CONTENT }));

    let router = match static_dir {
        #[cfg(feature = "ui-static")]
        Some(dir) => {
            info!(dir = %dir.display(), "serving static UI");
            router.fallback_service(
                tower_http::services::ServeDir::new(dir).append_index_html_on_directories(true),
            )
        }
        #[cfg(not(feature = "ui-static"))]
        Some(dir) => {
            tracing::warn!(dir = %dir.display(), "static UI configured but the ui-static feature is off");
            router.route("/", get(ui::root)).fallback(ui::not_found)
        }
        None => router.route("/", get(ui::root)).fallback(ui::not_found),
    };

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
