//! HTTP API integration tests
//!
//! Drives the axum router in-process with the dummy provider and the
//! offline keyword classifier, so no request leaves the machine.

use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use mbai_bot::chat::assemble::assemble;
use mbai_bot::chat::prompt::SystemPrompt;
use mbai_bot::chat::stream::{DONE_FRAME, UiStreamEvent};
use mbai_bot::chat::welcome::Welcome;
use mbai_bot::chat::{ChatService, ChatStore, MemoryStore, UiMessage};
use mbai_bot::config::Config;
use mbai_bot::llm::providers;
use mbai_bot::moderation::Moderator;
use mbai_bot::subsystems::comms::CommsState;
use mbai_bot::subsystems::comms::axum_channel::{AxumState, build_router};
use mbai_bot::tools::{SearchHit, ToolSet, VectorSearch, WebSearch};

fn test_config() -> Config {
    Config::test_default(std::env::temp_dir().as_path())
}

fn router_with(chat: ChatService, store: Option<Arc<dyn ChatStore>>) -> Router {
    let config = test_config();
    let (event_tx, _event_rx) = mpsc::channel(32);
    let welcome = Welcome::new(&config.prompts.ai_name, &config.prompts.owner_name);
    let comms = Arc::new(CommsState::new("test", Arc::new(chat), store, welcome, event_tx));
    build_router(AxumState::new("http-test", comms, CancellationToken::new()), None)
}

fn app() -> Router {
    let chat = ChatService::from_config(&test_config(), &chrono::Utc::now()).unwrap();
    router_with(chat, Some(Arc::new(MemoryStore::new())))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(resp).await).unwrap()
}

/// Split an SSE body into its JSON events; the terminal `[DONE]` frame is
/// checked and dropped.
fn parse_events(body: &str) -> Vec<UiStreamEvent> {
    assert!(body.ends_with(DONE_FRAME), "stream must end with [DONE]: {body}");
    body.split("\n\n")
        .filter_map(|frame| frame.strip_prefix("data: "))
        .filter(|data| *data != "[DONE]")
        .map(|data| serde_json::from_str(data).unwrap())
        .collect()
}

fn user(text: &str) -> Value {
    json!({ "id": "u1", "role": "user", "parts": [{ "type": "text", "text": text }] })
}

#[tokio::test]
async fn test_health_reports_collaborators() {
    let resp = app().oneshot(get("/api/health")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["llm"], "dummy");
    assert_eq!(body["moderation"], "keyword");
    assert_eq!(body["tools"], json!([]));
    assert_eq!(body["max_steps"], 10);
    assert_eq!(body["max_duration_seconds"], 30);
    assert_eq!(body["history"], true);
}

#[tokio::test]
async fn test_chat_streams_echo_reply() {
    let resp = app()
        .oneshot(post_json("/api/chat", json!({ "messages": [user("hello")] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["content-type"], "text/event-stream");
    assert_eq!(resp.headers()["x-vercel-ai-ui-message-stream"], "v1");

    let events = parse_events(&body_text(resp).await);
    assert!(matches!(events.first(), Some(UiStreamEvent::Start { message_id: Some(_) })));
    assert!(matches!(events.last(), Some(UiStreamEvent::Finish { .. })));

    let assembled = assemble("reply", &events);
    assert!(assembled.error().is_none());
    assert_eq!(assembled.message().text_content(), "[echo] hello");
}

#[tokio::test]
async fn test_flagged_message_gets_denial_only() {
    let resp = app()
        .oneshot(post_json("/api/chat", json!({ "messages": [user("where can I get a fake degree")] })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let events = parse_events(&body_text(resp).await);
    let text = assemble("reply", &events).into_message().text_content();
    assert_eq!(text, "I can't discuss illegal activities. Please ask something else.");
    assert!(!text.contains("[echo]"), "model must not run for a flagged turn");
}

#[tokio::test]
async fn test_compare_form_becomes_user_message() {
    let body = json!({
        "messages": [],
        "collegeA": "IIM Ahmedabad",
        "collegeB": "XLRI Jamshedpur",
        "parameters": ["Median CTC", "Batch Size", "Program Fee"],
    });
    let resp = app().oneshot(post_json("/api/compare", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let events = parse_events(&body_text(resp).await);
    assert_eq!(
        assemble("reply", &events).message().text_content(),
        "[echo] Compare IIM Ahmedabad and XLRI Jamshedpur on Median CTC, Batch Size, Program Fee"
    );
}

#[tokio::test]
async fn test_compare_form_without_parameters_is_rejected() {
    let body = json!({ "collegeA": "IIM Ahmedabad", "collegeB": "IIM Bangalore", "parameters": [] });
    let resp = app().oneshot(post_json("/api/compare", body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(resp).await["error"], "invalid_comparison");
}

#[tokio::test]
async fn test_compare_intent_prefills_form() {
    let resp = app()
        .oneshot(post_json("/api/compare/intent", json!({ "text": "compare IIMA vs XLRI" })))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["compare"], true);
    assert_eq!(body["message"]["role"], "assistant");

    let resp = app()
        .oneshot(post_json("/api/compare/intent", json!({ "text": "what is the CAT cutoff" })))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["compare"], false);
    assert!(body["message"].is_null());
}

#[tokio::test]
async fn test_compare_catalog_lists_defaults() {
    let resp = app().oneshot(get("/api/compare/catalog")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert!(body["colleges"].as_array().unwrap().iter().any(|c| c == "IIM Ahmedabad"));
    assert_eq!(
        body["defaultParameters"],
        json!(["QS Ranking", "Median CTC", "Highest CTC", "Average CTC"])
    );
}

#[tokio::test]
async fn test_history_put_get_delete() {
    let app = app();

    let resp = app.clone().oneshot(get("/api/history")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await, json!({ "messages": [], "durations": {} }));

    let history = json!({
        "messages": [user("hi")],
        "durations": { "a1-0": 2.5 },
    });
    let req = Request::builder()
        .method("PUT")
        .uri("/api/history")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(history.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get("/api/history")).await.unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["durations"]["a1-0"], 2.5);
    let messages: Vec<UiMessage> = serde_json::from_value(body["messages"].clone()).unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].text_content(), "hi");

    let req = Request::builder().method("DELETE").uri("/api/history").body(Body::empty()).unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/api/history")).await.unwrap();
    assert_eq!(body_json(resp).await, json!({ "messages": [], "durations": {} }));
}

#[tokio::test]
async fn test_history_disabled_is_not_found() {
    let chat = ChatService::from_config(&test_config(), &chrono::Utc::now()).unwrap();
    let resp = router_with(chat, None).oneshot(get("/api/history")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(resp).await["error"], "history_disabled");
}

#[tokio::test]
async fn test_welcome_copy() {
    let resp = app().oneshot(get("/api/welcome")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["clearChatText"], "New");
    assert_eq!(body["quickPrompts"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_malformed_chat_body_is_client_error() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();
    assert!(resp.status().is_client_error(), "got {}", resp.status());
}

#[tokio::test]
async fn test_unknown_api_route_is_json_404() {
    let resp = app().oneshot(get("/api/nope")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_web_search_tool_round_trip() {
    let config = test_config();
    let hit = SearchHit {
        title: "CAT cutoffs".into(),
        url: "https://example.com/cat".into(),
        snippet: "IIM Ahmedabad cutoff 99+".into(),
        score: None,
    };
    let chat = ChatService::new(
        Moderator::build(&config.moderation, &config.secrets).unwrap(),
        providers::build(&config.llm, None).unwrap(),
        ToolSet::new(WebSearch::Fixed(vec![hit]), VectorSearch::Disabled),
        SystemPrompt::assemble(&config.prompts, &chrono::Utc::now()).unwrap(),
        &config.chat,
    );

    let resp = router_with(chat, None)
        .oneshot(post_json("/api/chat", json!({ "messages": [user("/search cat cutoffs")] })))
        .await
        .unwrap();
    let events = parse_events(&body_text(resp).await);

    assert!(events.iter().any(|e| matches!(
        e,
        UiStreamEvent::ToolInputAvailable { tool_name, .. } if tool_name == "webSearch"
    )));
    assert!(events.iter().any(|e| matches!(e, UiStreamEvent::ToolOutputAvailable { .. })));

    let assembled = assemble("reply", &events);
    assert!(assembled.message().text_content().ends_with("received 1 tool result(s)"));
}
