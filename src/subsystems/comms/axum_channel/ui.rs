//! UI route handlers for the axum channel.
//!
//! The root handler serves a static landing page. A prebuilt chat UI, when
//! configured, is mounted by the router instead.

use axum::{
    Json,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
};
use serde_json::json;

// ── Root page ─────────────────────────────────────────────────────────────────

const ROOT_INDEX_HTML: &str = r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8" />
  <meta name="viewport" content="width=device-width, initial-scale=1" />
  <title>MB-AI</title>
  <style>
    *, *::before, *::after { box-sizing: border-box; margin: 0; padding: 0; }
    body {
      font-family: system-ui, -apple-system, sans-serif;
      background: #0f0f0f; color: #e0e0e0;
      display: flex; align-items: center; justify-content: center;
      height: 100vh;
    }
    .card {
      text-align: left; padding: 2rem 3rem;
      border: 1px solid #333; border-radius: 12px;
      background: #1a1a1a;
    }
    h1 { font-size: 1.5rem; margin-bottom: 0.5rem; }
    p  { font-size: 0.9rem; color: #888; margin-bottom: 1rem; }
    code { font-size: 0.85rem; color: #c0c0e0; line-height: 1.6; }
  </style>
</head>
<body>
  <div class="card">
    <h1>MB-AI</h1>
    <p>Chat service is running.</p>
    <code>POST /api/chat</code><br />
    <code>POST /api/compare</code><br />
    <code>GET&nbsp; /api/welcome</code><br />
    <code>GET&nbsp; /api/health</code>
  </div>
</body>
</html>
"#;

// ── Handlers ──────────────────────────────────────────────────────────────────

/// GET /: root landing page.
pub(super) async fn root() -> Html<&'static str> {
    Html(ROOT_INDEX_HTML)
}

/// Fallback for unknown paths.
pub(super) async fn not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "not_found", "message": format!("no route for {}", uri.path()) })),
    )
        .into_response()
}
