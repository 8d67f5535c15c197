//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `MBAI_WORK_DIR` and `MBAI_LOG_LEVEL` env overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

use super::raw::RawConfig;
use super::types::*;

/// Deep-merge two TOML values.
/// Tables are merged recursively: the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, the built-in
/// defaults are used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("MBAI_WORK_DIR").ok();
    let log_level_override = env::var("MBAI_LOG_LEVEL").ok();

    if let Some(path) = config_path {
        return load_from(
            Path::new(path),
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        );
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(
            default_path,
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        )
    } else {
        resolve(
            RawConfig::default(),
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
            secrets_from_env(),
        )
    }
}

/// Internal loader: accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val)
        .map_err(|e: toml::de::Error| {
            AppError::Config(format!("config error in {}: {e}", path.display()))
        })?;

    resolve(parsed, work_dir_override, log_level_override, secrets_from_env())
}

/// API keys come from the environment only. The moderation endpoint shares
/// the LLM key unless `MODERATION_API_KEY` is set.
fn secrets_from_env() -> Secrets {
    let llm_api_key = env::var("LLM_API_KEY").ok().filter(|k| !k.is_empty());
    Secrets {
        moderation_api_key: env::var("MODERATION_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or_else(|| llm_api_key.clone()),
        llm_api_key,
        web_search_api_key: env::var("WEB_SEARCH_API_KEY").ok().filter(|k| !k.is_empty()),
        vector_search_api_key: env::var("VECTOR_SEARCH_API_KEY").ok().filter(|k| !k.is_empty()),
    }
}

fn resolve(
    parsed: RawConfig,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
    secrets: Secrets,
) -> Result<Config, AppError> {
    let s = parsed.server;

    let work_dir_str = work_dir_override.unwrap_or(&s.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&s.log_level).to_string();
    let log_file = s.log_file.as_deref().map(expand_home);

    if parsed.chat.max_steps == 0 {
        return Err(AppError::Config("chat.max_steps must be at least 1".into()));
    }
    if parsed.chat.max_duration_seconds == 0 {
        return Err(AppError::Config(
            "chat.max_duration_seconds must be at least 1".into(),
        ));
    }

    Ok(Config {
        bot_name: s.bot_name,
        work_dir,
        log_level,
        log_file,
        comms: CommsConfig {
            http: HttpConfig {
                enabled: parsed.comms.http.enabled,
                bind: parsed.comms.http.bind,
                static_dir: parsed.comms.http.static_dir.as_deref().map(expand_home),
            },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: OpenAiConfig {
                api_base_url: parsed.llm.openai.api_base_url,
                model: parsed.llm.openai.model,
                temperature: parsed.llm.openai.temperature,
                timeout_seconds: parsed.llm.openai.timeout_seconds,
            },
        },
        moderation: ModerationConfig {
            provider: parsed.moderation.provider,
            openai: OpenAiModerationConfig {
                api_base_url: parsed.moderation.openai.api_base_url,
                model: parsed.moderation.openai.model,
                timeout_seconds: parsed.moderation.openai.timeout_seconds,
            },
            keyword_terms: parsed.moderation.keyword.terms,
        },
        tools: ToolsConfig {
            web_search: WebSearchConfig {
                provider: parsed.tools.web_search.provider,
                api_base_url: parsed.tools.web_search.api_base_url,
                num_results: parsed.tools.web_search.num_results.max(1),
                max_characters: parsed.tools.web_search.max_characters,
                timeout_seconds: parsed.tools.web_search.timeout_seconds,
            },
            vector_search: VectorSearchConfig {
                provider: parsed.tools.vector_search.provider,
                index_host: parsed.tools.vector_search.index_host,
                namespace: parsed.tools.vector_search.namespace,
                top_k: parsed.tools.vector_search.top_k.max(1),
                timeout_seconds: parsed.tools.vector_search.timeout_seconds,
            },
        },
        prompts: PromptsConfig {
            profile: parsed.prompts.profile,
            dir: parsed.prompts.dir.as_deref().map(expand_home),
            ai_name: parsed.prompts.ai_name,
            owner_name: parsed.prompts.owner_name,
        },
        chat: ChatConfig {
            max_steps: parsed.chat.max_steps,
            max_duration_seconds: parsed.chat.max_duration_seconds,
            reasoning_effort: parsed.chat.reasoning_effort,
            parallel_tool_calls: parsed.chat.parallel_tool_calls,
        },
        history: HistoryConfig {
            enabled: parsed.history.enabled,
            file: PathBuf::from(parsed.history.file),
        },
        secrets,
    })
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
