//! Axum handlers for `/api/*` routes.
//!
//! Each handler receives [`AxumState`] via [`axum::extract::State`] and
//! returns an axum [`Response`]. Chat routes answer with a UI message stream
//! once the request body is accepted; failures after that point travel inside
//! the stream, so the HTTP status stays 200.

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::chat::compare::{
    COLLEGES, ComparisonRequest, DEFAULT_PARAMETERS, PARAMETERS, compare_ui_message, is_compare_intent,
    parse_compare_intent,
};
use crate::chat::relay::sse_response;
use crate::chat::store::ChatHistory;
use crate::chat::UiMessage;

use super::AxumState;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct ChatRequest {
    #[serde(default)]
    messages: Vec<UiMessage>,
}

#[derive(Deserialize)]
pub(super) struct CompareRequest {
    #[serde(default)]
    messages: Vec<UiMessage>,
    #[serde(flatten)]
    form: ComparisonRequest,
}

#[derive(Deserialize)]
pub(super) struct IntentRequest {
    text: String,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Build a JSON error response body.
fn json_error(code: &str, msg: impl std::fmt::Display) -> Json<serde_json::Value> {
    Json(json!({ "error": code, "message": format!("{msg}") }))
}

fn stream_turn(state: &AxumState, messages: Vec<UiMessage>) -> Response {
    let cancel = state.shutdown.child_token();
    let turn = state.comms.start_turn(&state.channel_id, messages, cancel.clone());
    sse_response(turn.events, state.comms.chat().max_duration(), cancel)
}

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /api/health
pub(super) async fn health(State(state): State<AxumState>) -> Response {
    let chat = state.comms.chat();
    let body = json!({
        "status": "ok",
        "bot_name": state.comms.bot_name(),
        "llm": chat.provider_name(),
        "moderation": chat.moderator_name(),
        "tools": chat.tool_names(),
        "prompt_profile": chat.prompt().profile().name(),
        "max_steps": chat.max_steps(),
        "max_duration_seconds": chat.max_duration().as_secs(),
        "history": state.comms.history_enabled(),
    });
    (StatusCode::OK, Json(body)).into_response()
}

/// POST /api/chat: full message history in, UI message stream out.
pub(super) async fn chat(State(state): State<AxumState>, Json(req): Json<ChatRequest>) -> Response {
    stream_turn(&state, req.messages)
}

/// POST /api/compare: turn a filled comparison form into one user message
/// and run it as an ordinary chat turn.
pub(super) async fn compare(State(state): State<AxumState>, Json(req): Json<CompareRequest>) -> Response {
    let text = match req.form.to_user_message() {
        Ok(text) => text,
        Err(e) => {
            warn!(channel_id = %state.channel_id, "rejected comparison form: {e}");
            return (StatusCode::BAD_REQUEST, json_error("invalid_comparison", e)).into_response();
        }
    };
    info!(channel_id = %state.channel_id, %text, "comparison requested");
    let mut messages = req.messages;
    messages.push(UiMessage::user_text(uuid::Uuid::now_v7().to_string(), text));
    stream_turn(&state, messages)
}

/// POST /api/compare/intent: `{ text }` → `{ compare, defaults, message }`.
pub(super) async fn compare_intent(Json(req): Json<IntentRequest>) -> Response {
    if !is_compare_intent(&req.text) {
        return Json(json!({ "compare": false, "defaults": {}, "message": null })).into_response();
    }
    let defaults = parse_compare_intent(&req.text);
    let message = compare_ui_message(format!("compare-ui-{}", uuid::Uuid::now_v7()), &defaults);
    Json(json!({ "compare": true, "defaults": defaults, "message": message })).into_response()
}

/// GET /api/compare/catalog
pub(super) async fn compare_catalog() -> Response {
    Json(json!({
        "colleges": COLLEGES,
        "parameters": PARAMETERS,
        "defaultParameters": DEFAULT_PARAMETERS,
    }))
    .into_response()
}

/// GET /api/history
pub(super) async fn history_get(State(state): State<AxumState>) -> Response {
    if !state.comms.history_enabled() {
        return history_disabled();
    }
    match state.comms.load_history().await {
        Ok(history) => (StatusCode::OK, Json(history)).into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, "history load failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
    }
}

/// PUT /api/history: replace the persisted history.
pub(super) async fn history_put(
    State(state): State<AxumState>,
    Json(history): Json<ChatHistory>,
) -> Response {
    if !state.comms.history_enabled() {
        return history_disabled();
    }
    match state.comms.save_history(history).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, "history save failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
    }
}

/// DELETE /api/history
pub(super) async fn history_delete(State(state): State<AxumState>) -> Response {
    if !state.comms.history_enabled() {
        return history_disabled();
    }
    match state.comms.clear_history().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            warn!(channel_id = %state.channel_id, "history clear failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, json_error("internal", e)).into_response()
        }
    }
}

fn history_disabled() -> Response {
    (StatusCode::NOT_FOUND, json_error("history_disabled", "history persistence is disabled")).into_response()
}

/// GET /api/welcome
pub(super) async fn welcome(State(state): State<AxumState>) -> Response {
    Json(state.comms.welcome().clone()).into_response()
}
