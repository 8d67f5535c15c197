//! Offline keyword classifier.
//!
//! Matches whole words or phrases, case-insensitively. A small built-in list
//! covers the obvious cases; `[moderation.keyword.terms]` adds more per
//! category.

use std::collections::HashMap;

use regex::{Regex, RegexBuilder};

use super::{ModerationCategory, ModerationError, ModerationResult, pick_category};

const BUILTIN_TERMS: &[(ModerationCategory, &[&str])] = &[
    (ModerationCategory::SelfHarmIntent, &["i want to kill myself", "i want to end my life"]),
    (ModerationCategory::SelfHarmInstructions, &["how to kill myself", "how to self harm"]),
    (ModerationCategory::SelfHarm, &["self harm", "self-harm", "suicide"]),
    (ModerationCategory::HarassmentThreatening, &["i will kill you", "i will hurt you"]),
    (ModerationCategory::IllicitViolent, &["make a bomb", "build a bomb", "buy a gun illegally"]),
    (ModerationCategory::Illicit, &["buy drugs", "fake degree", "forged marksheet", "leaked cat paper"]),
];

#[derive(Debug, Clone)]
pub struct KeywordModerator {
    rules: Vec<(ModerationCategory, Regex)>,
}

impl KeywordModerator {
    /// `extra` maps category API names to additional terms. Unknown category
    /// names are rejected so typos in config surface at startup.
    pub fn new(extra: &HashMap<String, Vec<String>>) -> Result<Self, ModerationError> {
        let mut terms: HashMap<ModerationCategory, Vec<String>> = HashMap::new();
        for (category, words) in BUILTIN_TERMS {
            terms
                .entry(*category)
                .or_default()
                .extend(words.iter().map(|w| w.to_string()));
        }
        for (name, words) in extra {
            let category = ModerationCategory::from_api(name).ok_or_else(|| {
                ModerationError::NotConfigured(format!("unknown moderation category: {name}"))
            })?;
            terms.entry(category).or_default().extend(
                words.iter().map(|w| w.trim().to_string()).filter(|w| !w.is_empty()),
            );
        }

        let mut rules = Vec::new();
        for category in ModerationCategory::PRIORITY {
            let Some(words) = terms.get(&category).filter(|w| !w.is_empty()) else {
                continue;
            };
            let alternation = words.iter().map(|w| regex::escape(w)).collect::<Vec<_>>().join("|");
            let regex = RegexBuilder::new(&format!(r"(?:^|\W)(?:{alternation})(?:$|\W)"))
                .case_insensitive(true)
                .build()
                .map_err(|e| ModerationError::NotConfigured(format!("invalid keyword term: {e}")))?;
            rules.push((category, regex));
        }
        Ok(Self { rules })
    }

    pub fn classify(&self, text: &str) -> ModerationResult {
        let hits: Vec<ModerationCategory> = self
            .rules
            .iter()
            .filter(|(_, regex)| regex.is_match(text))
            .map(|(category, _)| *category)
            .collect();
        if hits.is_empty() {
            ModerationResult::clear()
        } else {
            ModerationResult::flagged(pick_category(&hits))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn moderator() -> KeywordModerator {
        KeywordModerator::new(&HashMap::new()).unwrap()
    }

    #[test]
    fn ordinary_question_passes() {
        let r = moderator().classify("What is the median CTC at IIM Lucknow?");
        assert!(!r.flagged);
        assert!(r.denial_message.is_none());
    }

    #[test]
    fn builtin_phrase_flags_with_category_text() {
        let r = moderator().classify("Where can I get a Fake Degree for admission?");
        assert!(r.flagged);
        assert_eq!(r.category, Some(ModerationCategory::Illicit));
        assert_eq!(r.denial_text(), ModerationCategory::Illicit.denial_message());
    }

    #[test]
    fn more_specific_match_wins() {
        let r = moderator().classify("i want to kill myself, this is about suicide");
        assert_eq!(r.category, Some(ModerationCategory::SelfHarmIntent));
    }

    #[test]
    fn matches_whole_words_only() {
        let r = moderator().classify("selfharmony is a band");
        assert!(!r.flagged);
    }

    #[test]
    fn config_terms_extend_builtin_list() {
        let mut extra = HashMap::new();
        extra.insert("hate".to_string(), vec!["slurword".to_string()]);
        let m = KeywordModerator::new(&extra).unwrap();
        let r = m.classify("you are a SLURWORD");
        assert_eq!(r.category, Some(ModerationCategory::Hate));
    }

    #[test]
    fn unknown_config_category_rejected() {
        let mut extra = HashMap::new();
        extra.insert("spam".to_string(), vec!["buy now".to_string()]);
        assert!(KeywordModerator::new(&extra).is_err());
    }
}
