//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs that the rest of the crate
//! consumes. Raw TOML deserialization types live in `raw.rs`.

use std::collections::HashMap;
use std::path::PathBuf;

// ── Comms ───────────────────────────────────────────────────────────────────

/// HTTP (axum) channel configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Whether the HTTP channel is started.
    pub enabled: bool,
    /// Socket address to bind the listener to.
    pub bind: String,
    /// Optional directory with a prebuilt web UI, served for non-API paths.
    pub static_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub http: HttpConfig,
}

// ── LLM ──────────────────────────────────────────────────────────────────────

/// OpenAI / OpenAI-compatible provider configuration.
/// Populated from `[llm.openai]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider name: `"dummy"` or `"openai"`.
    pub provider: String,
    pub openai: OpenAiConfig,
}

// ── Moderation ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct OpenAiModerationConfig {
    /// Full moderations endpoint URL.
    pub api_base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ModerationConfig {
    /// Backend name: `"disabled"`, `"keyword"` or `"openai"`.
    pub provider: String,
    pub openai: OpenAiModerationConfig,
    /// Extra keyword-backend terms, keyed by category name (`"hate"`, `"self-harm/intent"`, …).
    pub keyword_terms: HashMap<String, Vec<String>>,
}

// ── Tools ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct WebSearchConfig {
    /// Backend name: `"none"` or `"exa"`.
    pub provider: String,
    pub api_base_url: String,
    pub num_results: usize,
    pub max_characters: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct VectorSearchConfig {
    /// Backend name: `"none"` or `"pinecone"`.
    pub provider: String,
    /// Index host, e.g. `https://my-ai-abc123.svc.aped-1234.pinecone.io`.
    pub index_host: String,
    pub namespace: String,
    pub top_k: usize,
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone)]
pub struct ToolsConfig {
    pub web_search: WebSearchConfig,
    pub vector_search: VectorSearchConfig,
}

// ── Prompts / chat ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PromptsConfig {
    /// Profile name: `"general"`, `"compare"` or `"compare-strict"`.
    pub profile: String,
    /// Optional directory whose `<layer>.md` files override the built-in layers.
    pub dir: Option<PathBuf>,
    pub ai_name: String,
    pub owner_name: String,
}

#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Upper bound on model steps (tool-use round-trips) per turn.
    pub max_steps: usize,
    /// Maximum wall-clock duration of one streamed response.
    pub max_duration_seconds: u64,
    /// Sent as `reasoning_effort` to reasoning-capable models.
    pub reasoning_effort: String,
    pub parallel_tool_calls: bool,
}

#[derive(Debug, Clone)]
pub struct HistoryConfig {
    pub enabled: bool,
    /// History file, resolved against `work_dir` when relative.
    pub file: PathBuf,
}

// ── Secrets ──────────────────────────────────────────────────────────────────

/// API keys: sourced from the environment only, never from TOML.
#[derive(Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<String>,
    pub moderation_api_key: Option<String>,
    pub web_search_api_key: Option<String>,
    pub vector_search_api_key: Option<String>,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mask = |k: &Option<String>| if k.is_some() { "<set>" } else { "<unset>" };
        f.debug_struct("Secrets")
            .field("llm_api_key", &mask(&self.llm_api_key))
            .field("moderation_api_key", &mask(&self.moderation_api_key))
            .field("web_search_api_key", &mask(&self.web_search_api_key))
            .field("vector_search_api_key", &mask(&self.vector_search_api_key))
            .finish()
    }
}

// ── Top-level ────────────────────────────────────────────────────────────────

/// Fully-resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub work_dir: PathBuf,
    pub log_level: String,
    pub log_file: Option<PathBuf>,
    pub comms: CommsConfig,
    pub llm: LlmConfig,
    pub moderation: ModerationConfig,
    pub tools: ToolsConfig,
    pub prompts: PromptsConfig,
    pub chat: ChatConfig,
    pub history: HistoryConfig,
    pub secrets: Secrets,
}

impl Config {
    /// Absolute path of the chat history file.
    pub fn history_path(&self) -> PathBuf {
        if self.history.file.is_absolute() {
            self.history.file.clone()
        } else {
            self.work_dir.join(&self.history.file)
        }
    }
}
