//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use std::collections::HashMap;

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape: serde target before resolution.
#[derive(Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub server: RawServer,
    #[serde(default)]
    pub comms: RawComms,
    #[serde(default)]
    pub llm: RawLlm,
    #[serde(default)]
    pub moderation: RawModeration,
    #[serde(default)]
    pub tools: RawTools,
    #[serde(default)]
    pub prompts: RawPrompts,
    #[serde(default)]
    pub chat: RawChat,
    #[serde(default)]
    pub history: RawHistory,
}

#[derive(Deserialize)]
pub(super) struct RawServer {
    #[serde(default = "default_bot_name")]
    pub bot_name: String,
    #[serde(default = "default_work_dir")]
    pub work_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            bot_name: default_bot_name(),
            work_dir: default_work_dir(),
            log_level: default_log_level(),
            log_file: None,
        }
    }
}

// ── Comms ───────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawComms {
    #[serde(default)]
    pub http: RawHttp,
}

#[derive(Deserialize)]
pub(super) struct RawHttp {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_http_bind")]
    pub bind: String,
    #[serde(default)]
    pub static_dir: Option<String>,
}

impl Default for RawHttp {
    fn default() -> Self {
        Self {
            enabled: true,
            bind: default_http_bind(),
            static_dir: None,
        }
    }
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiConfig {
    #[serde(default = "default_openai_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_openai_model")]
    pub model: String,
    #[serde(default = "default_openai_temperature")]
    pub temperature: f32,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawOpenAiConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_openai_api_base_url(),
            model: default_openai_model(),
            temperature: default_openai_temperature(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

// ── Moderation ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawModeration {
    #[serde(rename = "default", default = "default_moderation_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiModeration,
    #[serde(default)]
    pub keyword: RawKeywordModeration,
}

impl Default for RawModeration {
    fn default() -> Self {
        Self {
            provider: default_moderation_provider(),
            openai: RawOpenAiModeration::default(),
            keyword: RawKeywordModeration::default(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawOpenAiModeration {
    #[serde(default = "default_moderation_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_moderation_model")]
    pub model: String,
    #[serde(default = "default_short_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawOpenAiModeration {
    fn default() -> Self {
        Self {
            api_base_url: default_moderation_api_base_url(),
            model: default_moderation_model(),
            timeout_seconds: default_short_timeout_seconds(),
        }
    }
}

#[derive(Deserialize, Default)]
pub(super) struct RawKeywordModeration {
    #[serde(default)]
    pub terms: HashMap<String, Vec<String>>,
}

// ── Tools ───────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawTools {
    #[serde(default)]
    pub web_search: RawWebSearch,
    #[serde(default)]
    pub vector_search: RawVectorSearch,
}

#[derive(Deserialize)]
pub(super) struct RawWebSearch {
    #[serde(default = "default_none")]
    pub provider: String,
    #[serde(default = "default_web_search_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_web_search_num_results")]
    pub num_results: usize,
    #[serde(default = "default_web_search_max_characters")]
    pub max_characters: usize,
    #[serde(default = "default_short_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawWebSearch {
    fn default() -> Self {
        Self {
            provider: default_none(),
            api_base_url: default_web_search_api_base_url(),
            num_results: default_web_search_num_results(),
            max_characters: default_web_search_max_characters(),
            timeout_seconds: default_short_timeout_seconds(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawVectorSearch {
    #[serde(default = "default_none")]
    pub provider: String,
    #[serde(default)]
    pub index_host: String,
    #[serde(default = "default_vector_namespace")]
    pub namespace: String,
    #[serde(default = "default_vector_top_k")]
    pub top_k: usize,
    #[serde(default = "default_short_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl Default for RawVectorSearch {
    fn default() -> Self {
        Self {
            provider: default_none(),
            index_host: String::new(),
            namespace: default_vector_namespace(),
            top_k: default_vector_top_k(),
            timeout_seconds: default_short_timeout_seconds(),
        }
    }
}

// ── Prompts / chat / history ────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawPrompts {
    #[serde(default = "default_prompt_profile")]
    pub profile: String,
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default = "default_ai_name")]
    pub ai_name: String,
    #[serde(default = "default_owner_name")]
    pub owner_name: String,
}

impl Default for RawPrompts {
    fn default() -> Self {
        Self {
            profile: default_prompt_profile(),
            dir: None,
            ai_name: default_ai_name(),
            owner_name: default_owner_name(),
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawChat {
    #[serde(default = "default_max_steps")]
    pub max_steps: usize,
    #[serde(default = "default_max_duration_seconds")]
    pub max_duration_seconds: u64,
    #[serde(default = "default_reasoning_effort")]
    pub reasoning_effort: String,
    #[serde(default = "default_false")]
    pub parallel_tool_calls: bool,
}

impl Default for RawChat {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            max_duration_seconds: default_max_duration_seconds(),
            reasoning_effort: default_reasoning_effort(),
            parallel_tool_calls: false,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct RawHistory {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_history_file")]
    pub file: String,
}

impl Default for RawHistory {
    fn default() -> Self {
        Self {
            enabled: true,
            file: default_history_file(),
        }
    }
}

// ── Defaults ────────────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_none() -> String {
    "none".to_string()
}

fn default_bot_name() -> String {
    "mbai".to_string()
}

fn default_work_dir() -> String {
    "~/.mbai".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

pub(super) fn default_http_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_llm_provider() -> String {
    "dummy".to_string()
}

fn default_openai_api_base_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}

fn default_openai_model() -> String {
    "gpt-4.1".to_string()
}

fn default_openai_temperature() -> f32 {
    0.2
}

fn default_timeout_seconds() -> u64 {
    60
}

fn default_short_timeout_seconds() -> u64 {
    15
}

fn default_moderation_provider() -> String {
    "keyword".to_string()
}

fn default_moderation_api_base_url() -> String {
    "https://api.openai.com/v1/moderations".to_string()
}

fn default_moderation_model() -> String {
    "omni-moderation-latest".to_string()
}

fn default_web_search_api_base_url() -> String {
    "https://api.exa.ai/search".to_string()
}

fn default_web_search_num_results() -> usize {
    3
}

fn default_web_search_max_characters() -> usize {
    2000
}

fn default_vector_namespace() -> String {
    "__default__".to_string()
}

fn default_vector_top_k() -> usize {
    40
}

fn default_prompt_profile() -> String {
    "compare-strict".to_string()
}

fn default_ai_name() -> String {
    "MB-AI".to_string()
}

fn default_owner_name() -> String {
    "Aditya & Sivadanus".to_string()
}

fn default_max_steps() -> usize {
    10
}

fn default_max_duration_seconds() -> u64 {
    30
}

fn default_reasoning_effort() -> String {
    "low".to_string()
}

fn default_history_file() -> String {
    "chat-messages.json".to_string()
}
