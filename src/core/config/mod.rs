//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `MBAI_WORK_DIR` and `MBAI_LOG_LEVEL` env overrides. API keys
//! are read from the environment only.
//!
//! # Module layout
//!
//! - **types**: Public configuration structs (`Config`, `LlmConfig`,
//!   `ModerationConfig`, etc.).
//! - **raw**: Raw TOML deserialization types. These mirror the file shape
//!   and use serde defaults; kept private.
//! - **load**: Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from};
pub use types::*;

impl Config {
    /// Safe `Config` for tests: dummy LLM, keyword moderation, no tools,
    /// no API keys, no external calls.
    pub fn test_default(work_dir: &std::path::Path) -> Self {
        Self {
            bot_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            comms: CommsConfig {
                http: HttpConfig {
                    enabled: false,
                    bind: raw::default_http_bind(),
                    static_dir: None,
                },
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                openai: OpenAiConfig {
                    api_base_url: "http://localhost:0/v1/chat/completions".into(),
                    model: "test-model".into(),
                    temperature: 0.0,
                    timeout_seconds: 1,
                },
            },
            moderation: ModerationConfig {
                provider: "keyword".into(),
                openai: OpenAiModerationConfig {
                    api_base_url: "http://localhost:0/v1/moderations".into(),
                    model: "omni-moderation-latest".into(),
                    timeout_seconds: 1,
                },
                keyword_terms: std::collections::HashMap::new(),
            },
            tools: ToolsConfig {
                web_search: WebSearchConfig {
                    provider: "none".into(),
                    api_base_url: "http://localhost:0/search".into(),
                    num_results: 3,
                    max_characters: 500,
                    timeout_seconds: 1,
                },
                vector_search: VectorSearchConfig {
                    provider: "none".into(),
                    index_host: String::new(),
                    namespace: "__default__".into(),
                    top_k: 5,
                    timeout_seconds: 1,
                },
            },
            prompts: PromptsConfig {
                profile: "compare-strict".into(),
                dir: None,
                ai_name: "MB-AI".into(),
                owner_name: "Test Owner".into(),
            },
            chat: ChatConfig {
                max_steps: 10,
                max_duration_seconds: 30,
                reasoning_effort: "low".into(),
                parallel_tool_calls: false,
            },
            history: HistoryConfig {
                enabled: true,
                file: "chat-messages.json".into(),
            },
            secrets: Secrets::default(),
        }
    }
}
