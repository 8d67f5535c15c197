//! Pre-moderation content filter.
//!
//! [`Moderator::classify`] maps user text to a [`ModerationResult`]. A flagged
//! result carries the category-specific denial text shown to the user instead
//! of a model answer.

pub mod keyword;
#[cfg(feature = "moderation-openai")]
pub mod openai;

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ModerationConfig, Secrets};

/// Shown when content is flagged without a recognised category.
pub const DEFAULT_DENIAL_MESSAGE: &str = "Your message violates our guidelines. I can't answer that.";

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("unknown moderation provider: {0}")]
    UnknownProvider(String),
    #[error("moderation not configured: {0}")]
    NotConfigured(String),
    #[error("moderation request failed: {0}")]
    Request(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModerationCategory {
    Sexual,
    SexualMinors,
    Harassment,
    HarassmentThreatening,
    Hate,
    HateThreatening,
    Illicit,
    IllicitViolent,
    SelfHarm,
    SelfHarmIntent,
    SelfHarmInstructions,
    Violence,
    ViolenceGraphic,
}

impl ModerationCategory {
    /// Resolution order when several categories are flagged at once:
    /// sub-categories before their parents.
    pub const PRIORITY: [ModerationCategory; 13] = [
        ModerationCategory::SexualMinors,
        ModerationCategory::Sexual,
        ModerationCategory::HarassmentThreatening,
        ModerationCategory::Harassment,
        ModerationCategory::HateThreatening,
        ModerationCategory::Hate,
        ModerationCategory::IllicitViolent,
        ModerationCategory::Illicit,
        ModerationCategory::SelfHarmIntent,
        ModerationCategory::SelfHarmInstructions,
        ModerationCategory::SelfHarm,
        ModerationCategory::ViolenceGraphic,
        ModerationCategory::Violence,
    ];

    /// Category name as used by the moderation API.
    pub fn as_str(self) -> &'static str {
        match self {
            ModerationCategory::Sexual => "sexual",
            ModerationCategory::SexualMinors => "sexual/minors",
            ModerationCategory::Harassment => "harassment",
            ModerationCategory::HarassmentThreatening => "harassment/threatening",
            ModerationCategory::Hate => "hate",
            ModerationCategory::HateThreatening => "hate/threatening",
            ModerationCategory::Illicit => "illicit",
            ModerationCategory::IllicitViolent => "illicit/violent",
            ModerationCategory::SelfHarm => "self-harm",
            ModerationCategory::SelfHarmIntent => "self-harm/intent",
            ModerationCategory::SelfHarmInstructions => "self-harm/instructions",
            ModerationCategory::Violence => "violence",
            ModerationCategory::ViolenceGraphic => "violence/graphic",
        }
    }

    pub fn from_api(name: &str) -> Option<Self> {
        Self::PRIORITY.into_iter().find(|c| c.as_str() == name)
    }

    pub fn denial_message(self) -> &'static str {
        match self {
            ModerationCategory::Sexual => {
                "I can't discuss explicit sexual content. Please ask something else."
            }
            ModerationCategory::SexualMinors => {
                "I can't discuss content involving minors in a sexual context. Please ask something else."
            }
            ModerationCategory::Harassment => {
                "I can't engage with harassing content. Please be respectful."
            }
            ModerationCategory::HarassmentThreatening => {
                "I can't engage with threatening or harassing content. Please be respectful."
            }
            ModerationCategory::Hate => "I can't engage with hateful content. Please be respectful.",
            ModerationCategory::HateThreatening => {
                "I can't engage with threatening hate speech. Please be respectful."
            }
            ModerationCategory::Illicit => {
                "I can't discuss illegal activities. Please ask something else."
            }
            ModerationCategory::IllicitViolent => {
                "I can't discuss violent illegal activities. Please ask something else."
            }
            ModerationCategory::SelfHarm => {
                "I can't discuss self-harm. If you're struggling, please reach out to a mental health professional or crisis helpline."
            }
            ModerationCategory::SelfHarmIntent => {
                "I can't discuss self-harm intentions. If you're struggling, please reach out to a mental health professional or crisis helpline."
            }
            ModerationCategory::SelfHarmInstructions => {
                "I can't provide instructions related to self-harm. If you're struggling, please reach out to a mental health professional or crisis helpline."
            }
            ModerationCategory::Violence => {
                "I can't discuss violent content. Please ask something else."
            }
            ModerationCategory::ViolenceGraphic => {
                "I can't discuss graphic violent content. Please ask something else."
            }
        }
    }
}

/// Pick the most specific category among those flagged.
pub fn pick_category(flagged: &[ModerationCategory]) -> Option<ModerationCategory> {
    ModerationCategory::PRIORITY.into_iter().find(|c| flagged.contains(c))
}

/// Verdict for one piece of user text.
#[derive(Debug, Clone, PartialEq)]
pub struct ModerationResult {
    pub flagged: bool,
    pub category: Option<ModerationCategory>,
    pub denial_message: Option<String>,
}

impl ModerationResult {
    pub fn clear() -> Self {
        Self { flagged: false, category: None, denial_message: None }
    }

    pub fn flagged(category: Option<ModerationCategory>) -> Self {
        Self {
            flagged: true,
            category,
            denial_message: Some(
                category.map_or(DEFAULT_DENIAL_MESSAGE, ModerationCategory::denial_message).to_string(),
            ),
        }
    }

    /// Text shown to the user for a flagged turn.
    pub fn denial_text(&self) -> &str {
        self.denial_message
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(DEFAULT_DENIAL_MESSAGE)
    }
}

/// Moderation backends. Enum dispatch, like the LLM providers.
#[derive(Debug, Clone)]
pub enum Moderator {
    Disabled,
    Keyword(keyword::KeywordModerator),
    #[cfg(feature = "moderation-openai")]
    OpenAi(openai::OpenAiModerator),
    #[cfg(test)]
    Unavailable,
    /// Never answers.
    #[cfg(test)]
    Pending,
}

impl Moderator {
    pub fn build(config: &ModerationConfig, secrets: &Secrets) -> Result<Self, ModerationError> {
        let moderator = match config.provider.as_str() {
            "disabled" | "none" => Moderator::Disabled,
            "keyword" => Moderator::Keyword(keyword::KeywordModerator::new(&config.keyword_terms)?),
            #[cfg(feature = "moderation-openai")]
            "openai" => {
                let key = secrets.moderation_api_key.clone().ok_or_else(|| {
                    ModerationError::NotConfigured(
                        "MODERATION_API_KEY (or LLM_API_KEY) is not set".into(),
                    )
                })?;
                Moderator::OpenAi(openai::OpenAiModerator::new(&config.openai, key)?)
            }
            other => return Err(ModerationError::UnknownProvider(other.to_string())),
        };
        info!(provider = moderator.name(), "moderation ready");
        Ok(moderator)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Moderator::Disabled => "disabled",
            Moderator::Keyword(_) => "keyword",
            #[cfg(feature = "moderation-openai")]
            Moderator::OpenAi(_) => "openai",
            #[cfg(test)]
            Moderator::Unavailable => "unavailable",
            #[cfg(test)]
            Moderator::Pending => "pending",
        }
    }

    pub async fn classify(&self, text: &str) -> Result<ModerationResult, ModerationError> {
        let result = match self {
            Moderator::Disabled => ModerationResult::clear(),
            Moderator::Keyword(m) => m.classify(text),
            #[cfg(feature = "moderation-openai")]
            Moderator::OpenAi(m) => m.classify(text).await?,
            #[cfg(test)]
            Moderator::Unavailable => {
                return Err(ModerationError::Request("classifier unavailable".into()));
            }
            #[cfg(test)]
            Moderator::Pending => std::future::pending().await,
        };
        debug!(
            provider = self.name(),
            flagged = result.flagged,
            category = result.category.map(ModerationCategory::as_str),
            "moderation verdict"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn every_category_round_trips_its_api_name() {
        for c in ModerationCategory::PRIORITY {
            assert_eq!(ModerationCategory::from_api(c.as_str()), Some(c));
        }
        assert_eq!(ModerationCategory::from_api("spam"), None);
    }

    #[test]
    fn specific_category_wins_over_parent() {
        let picked = pick_category(&[ModerationCategory::SelfHarm, ModerationCategory::SelfHarmIntent]);
        assert_eq!(picked, Some(ModerationCategory::SelfHarmIntent));
        let picked = pick_category(&[ModerationCategory::Violence, ModerationCategory::Harassment]);
        assert_eq!(picked, Some(ModerationCategory::Harassment));
        assert_eq!(pick_category(&[]), None);
    }

    #[test]
    fn flagged_without_category_uses_default_text() {
        let r = ModerationResult::flagged(None);
        assert_eq!(r.denial_text(), DEFAULT_DENIAL_MESSAGE);
        let r = ModerationResult { flagged: true, category: None, denial_message: Some(String::new()) };
        assert_eq!(r.denial_text(), DEFAULT_DENIAL_MESSAGE);
    }

    #[test]
    fn flagged_with_category_uses_category_text() {
        let r = ModerationResult::flagged(Some(ModerationCategory::Hate));
        assert_eq!(r.denial_text(), "I can't engage with hateful content. Please be respectful.");
    }

    #[tokio::test]
    async fn disabled_never_flags() {
        let r = Moderator::Disabled.classify("anything at all").await.unwrap();
        assert!(!r.flagged);
    }

    #[test]
    fn build_rejects_unknown_provider() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = Config::test_default(dir.path());
        cfg.moderation.provider = "magic".into();
        assert!(matches!(
            Moderator::build(&cfg.moderation, &cfg.secrets),
            Err(ModerationError::UnknownProvider(_))
        ));
    }

    #[cfg(feature = "moderation-openai")]
    #[test]
    fn openai_backend_needs_a_key() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut cfg = Config::test_default(dir.path());
        cfg.moderation.provider = "openai".into();
        assert!(matches!(
            Moderator::build(&cfg.moderation, &cfg.secrets),
            Err(ModerationError::NotConfigured(_))
        ));
        cfg.secrets.moderation_api_key = Some("sk-test".into());
        assert_eq!(Moderator::build(&cfg.moderation, &cfg.secrets).unwrap().name(), "openai");
    }
}
