//! Layered system-prompt assembly.
//!
//! Each instruction layer becomes its own system message. Layer text is
//! compiled into the binary from `config/prompts/`; a configured prompts
//! directory may override any layer with `<layer>.md`.
//!
//! ## Layer ordering
//!
//! ```text
//! identity → tool_calling → tool_options → tool_behavior → followup_yes →
//! followup_no → tool_other → tone_style → guardrails → citations → date_time
//! [→ compare_soft | compare_strict]
//! ```
//!
//! Variables use `{{key}}` syntax and are substituted once, at startup.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};
use tracing::{debug, info};

use crate::config::PromptsConfig;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptLayer {
    Identity,
    ToolCalling,
    ToolOptions,
    ToolBehavior,
    FollowupYes,
    FollowupNo,
    ToolOther,
    ToneStyle,
    Guardrails,
    Citations,
    DateTime,
    CompareSoft,
    CompareStrict,
}

impl PromptLayer {
    pub const GENERAL: [PromptLayer; 11] = [
        PromptLayer::Identity,
        PromptLayer::ToolCalling,
        PromptLayer::ToolOptions,
        PromptLayer::ToolBehavior,
        PromptLayer::FollowupYes,
        PromptLayer::FollowupNo,
        PromptLayer::ToolOther,
        PromptLayer::ToneStyle,
        PromptLayer::Guardrails,
        PromptLayer::Citations,
        PromptLayer::DateTime,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            PromptLayer::Identity => "identity.md",
            PromptLayer::ToolCalling => "tool_calling.md",
            PromptLayer::ToolOptions => "tool_options.md",
            PromptLayer::ToolBehavior => "tool_behavior.md",
            PromptLayer::FollowupYes => "followup_yes.md",
            PromptLayer::FollowupNo => "followup_no.md",
            PromptLayer::ToolOther => "tool_other.md",
            PromptLayer::ToneStyle => "tone_style.md",
            PromptLayer::Guardrails => "guardrails.md",
            PromptLayer::Citations => "citations.md",
            PromptLayer::DateTime => "date_time.md",
            PromptLayer::CompareSoft => "compare_soft.md",
            PromptLayer::CompareStrict => "compare_strict.md",
        }
    }

    fn builtin(self) -> &'static str {
        match self {
            PromptLayer::Identity => include_str!("../../config/prompts/identity.md"),
            PromptLayer::ToolCalling => include_str!("../../config/prompts/tool_calling.md"),
            PromptLayer::ToolOptions => include_str!("../../config/prompts/tool_options.md"),
            PromptLayer::ToolBehavior => include_str!("../../config/prompts/tool_behavior.md"),
            PromptLayer::FollowupYes => include_str!("../../config/prompts/followup_yes.md"),
            PromptLayer::FollowupNo => include_str!("../../config/prompts/followup_no.md"),
            PromptLayer::ToolOther => include_str!("../../config/prompts/tool_other.md"),
            PromptLayer::ToneStyle => include_str!("../../config/prompts/tone_style.md"),
            PromptLayer::Guardrails => include_str!("../../config/prompts/guardrails.md"),
            PromptLayer::Citations => include_str!("../../config/prompts/citations.md"),
            PromptLayer::DateTime => include_str!("../../config/prompts/date_time.md"),
            PromptLayer::CompareSoft => include_str!("../../config/prompts/compare_soft.md"),
            PromptLayer::CompareStrict => include_str!("../../config/prompts/compare_strict.md"),
        }
    }
}

/// Named layer stacks selectable with `prompts.profile`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptProfile {
    General,
    Compare,
    CompareStrict,
}

impl PromptProfile {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "general" => Some(PromptProfile::General),
            "compare" => Some(PromptProfile::Compare),
            "compare-strict" => Some(PromptProfile::CompareStrict),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PromptProfile::General => "general",
            PromptProfile::Compare => "compare",
            PromptProfile::CompareStrict => "compare-strict",
        }
    }

    pub fn layers(self) -> Vec<PromptLayer> {
        let mut layers = PromptLayer::GENERAL.to_vec();
        match self {
            PromptProfile::General => {}
            PromptProfile::Compare => layers.push(PromptLayer::CompareSoft),
            PromptProfile::CompareStrict => layers.push(PromptLayer::CompareStrict),
        }
        layers
    }
}

/// Builder that assembles an ordered list of system messages from layers.
pub struct PromptBuilder {
    override_dir: Option<PathBuf>,
    parts: Vec<String>,
    vars: HashMap<String, String>,
}

impl PromptBuilder {
    /// `override_dir` is checked for `<layer>.md` before the built-in text.
    pub fn new(override_dir: Option<&Path>) -> Self {
        Self {
            override_dir: override_dir.map(Path::to_path_buf),
            parts: Vec::new(),
            vars: HashMap::new(),
        }
    }

    /// Append one layer. Blank layers are skipped.
    pub fn layer(mut self, layer: PromptLayer) -> Self {
        let text = self
            .override_dir
            .as_ref()
            .map(|dir| dir.join(layer.file_name()))
            .and_then(|path| match fs::read_to_string(&path) {
                Ok(text) => {
                    debug!("prompt: layer '{}' overridden from {}", layer.file_name(), path.display());
                    Some(text)
                }
                Err(_) => None,
            })
            .unwrap_or_else(|| layer.builtin().to_string());
        self.push(text);
        self
    }

    pub fn layers(self, layers: &[PromptLayer]) -> Self {
        layers.iter().fold(self, |b, l| b.layer(*l))
    }

    /// Directly append a text fragment.
    pub fn append(mut self, text: impl Into<String>) -> Self {
        self.push(text.into());
        self
    }

    /// Register a single `{{key}}` → `value` substitution.
    pub fn var(mut self, key: &str, value: impl Into<String>) -> Self {
        self.vars.insert(key.to_string(), value.into());
        self
    }

    fn push(&mut self, text: String) {
        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.parts.push(trimmed.to_string());
        }
    }

    /// Apply variable substitution to every layer and return them in order.
    pub fn build(self) -> Vec<String> {
        self.parts
            .into_iter()
            .map(|mut part| {
                for (k, v) in &self.vars {
                    part = part.replace(&format!("{{{{{k}}}}}"), v);
                }
                part
            })
            .collect()
    }
}

/// `"The day today is Friday, October 16, 2026 and the time right now is 3:05 PM +05:30."`
pub fn date_time_sentence<Tz>(now: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!(
        "The day today is {} and the time right now is {}.",
        now.format("%A, %B %-d, %Y"),
        now.format("%-I:%M %p %Z"),
    )
}

/// The assembled, immutable list of system messages for every turn.
#[derive(Debug, Clone)]
pub struct SystemPrompt {
    profile: PromptProfile,
    messages: Vec<String>,
}

impl SystemPrompt {
    /// Assemble the configured profile. An unknown profile or an empty
    /// result is a startup error.
    pub fn assemble<Tz>(config: &PromptsConfig, now: &DateTime<Tz>) -> Result<Self, AppError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let profile = PromptProfile::from_name(&config.profile)
            .ok_or_else(|| AppError::Config(format!("unknown prompt profile: {}", config.profile)))?;

        let messages = PromptBuilder::new(config.dir.as_deref())
            .layers(&profile.layers())
            .var("ai_name", config.ai_name.as_str())
            .var("owner_name", config.owner_name.as_str())
            .var("date_time", date_time_sentence(now))
            .build();

        if messages.is_empty() {
            return Err(AppError::Config(format!(
                "prompt profile '{}' assembled to no system messages",
                profile.name()
            )));
        }
        info!(profile = profile.name(), layers = messages.len(), "system prompt assembled");
        Ok(Self { profile, messages })
    }

    pub fn profile(&self) -> PromptProfile {
        self.profile
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(5 * 3600 + 1800)
            .unwrap()
            .with_ymd_and_hms(2026, 10, 16, 15, 5, 0)
            .unwrap()
    }

    fn prompts_config(profile: &str, dir: Option<PathBuf>) -> PromptsConfig {
        PromptsConfig {
            profile: profile.into(),
            dir,
            ai_name: "MB-AI".into(),
            owner_name: "Test Owner".into(),
        }
    }

    #[test]
    fn date_time_sentence_format() {
        assert_eq!(
            date_time_sentence(&fixed_now()),
            "The day today is Friday, October 16, 2026 and the time right now is 3:05 PM +05:30."
        );
    }

    #[test]
    fn profiles_extend_general() {
        assert_eq!(PromptProfile::General.layers().len(), 11);
        assert_eq!(PromptProfile::Compare.layers().last(), Some(&PromptLayer::CompareSoft));
        assert_eq!(PromptProfile::CompareStrict.layers().last(), Some(&PromptLayer::CompareStrict));
        assert_eq!(PromptProfile::from_name("strict"), None);
    }

    #[test]
    fn assembles_one_message_per_layer_with_vars() {
        let prompt = SystemPrompt::assemble(&prompts_config("compare-strict", None), &fixed_now()).unwrap();
        let messages = prompt.messages();
        assert_eq!(messages.len(), 12);
        assert!(messages[0].contains("You are MB-AI"));
        assert!(messages[0].contains("Test Owner"));
        assert!(messages[10].starts_with("The day today is Friday"));
        assert!(messages[11].contains("comparison mode"));
        assert!(messages.iter().all(|m| !m.contains("{{")));
    }

    #[test]
    fn override_dir_replaces_single_layer() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("guardrails.md"), "Custom guardrails for {{ai_name}}.").unwrap();
        let prompt = SystemPrompt::assemble(
            &prompts_config("general", Some(dir.path().to_path_buf())),
            &fixed_now(),
        )
        .unwrap();
        assert_eq!(prompt.messages()[8], "Custom guardrails for MB-AI.");
        assert!(prompt.messages()[9].contains("cite your sources"));
    }

    #[test]
    fn blank_override_layer_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tone_style.md"), "   \n").unwrap();
        let prompt = SystemPrompt::assemble(
            &prompts_config("general", Some(dir.path().to_path_buf())),
            &fixed_now(),
        )
        .unwrap();
        assert_eq!(prompt.messages().len(), 10);
    }

    #[test]
    fn unknown_profile_is_config_error() {
        let err = SystemPrompt::assemble(&prompts_config("verbose", None), &fixed_now()).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn builder_substitutes_and_keeps_order() {
        let parts = PromptBuilder::new(None)
            .append("first {{x}}")
            .append("")
            .append("second")
            .var("x", "1")
            .build();
        assert_eq!(parts, vec!["first 1".to_string(), "second".to_string()]);
    }
}
