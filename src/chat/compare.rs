//! College comparison form helpers.
//!
//! A comparison is sent to the model as one ordinary user message,
//! `"Compare {A} and {B} on {P1}, {P2}, {P3}"`; everything here exists to
//! build that message and to prefill the form when a user types "compare …".

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use super::message::{UiMessage, UiMessagePart, UiRole};

pub const COLLEGES: &[&str] = &[
    "IIM Ahmedabad",
    "IIM Bangalore",
    "IIM Calcutta",
    "IIM Lucknow",
    "IIM Kozhikode",
    "XLRI Jamshedpur",
    "SPJIMR Mumbai",
    "IIM Mumbai",
    "IIM Udaipur",
    "BITSoM",
];

pub const PARAMETERS: &[&str] = &[
    "QS Ranking",
    "Median CTC",
    "Highest CTC",
    "Average CTC",
    "Batch Size",
    "Program Fee",
    "Major Recruiters",
    "Gender Ratio",
    "Average Work Experience",
];

pub const DEFAULT_PARAMETERS: &[&str] = &["QS Ranking", "Median CTC", "Highest CTC", "Average CTC"];

/// Data part name of the form-prefill message.
pub const COMPARE_UI_PART: &str = "compare-ui";

static COMPARE_PAIR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)compare\s+(.+?)\s+(?:vs|versus|and)\s+(.+)").expect("Valid regex pattern")
});

#[derive(Debug, Error, PartialEq)]
pub enum CompareError {
    #[error("both colleges are required")]
    MissingCollege,
    #[error("select at least one parameter")]
    NoParameters,
}

/// Map common short forms to catalog labels. Unknown names pass through
/// unchanged, apart from trimming.
pub fn normalize_college(name: &str) -> String {
    let n = name.to_lowercase().replace('.', "");
    let n = n.trim();
    if n.is_empty() {
        return String::new();
    }
    let label = if n.contains("iima") || n.contains("ahmedabad") {
        "IIM Ahmedabad"
    } else if n.contains("iimb") || n.contains("bangalore") || n.contains("bengaluru") {
        "IIM Bangalore"
    } else if n.contains("iimc") || n.contains("calcutta") || n.contains("kolkata") {
        "IIM Calcutta"
    } else if n.contains("iiml") || n.contains("lucknow") {
        "IIM Lucknow"
    } else if n.contains("iimk") || n.contains("kozhikode") {
        "IIM Kozhikode"
    } else if n.contains("xlri") {
        "XLRI Jamshedpur"
    } else if n.contains("spjimr") || n.contains("sp jain") {
        "SPJIMR Mumbai"
    } else if n.contains("iim mumbai") || n.contains("nitie") {
        "IIM Mumbai"
    } else if n.contains("iim udaipur") || n.contains("iimu") {
        "IIM Udaipur"
    } else if n.contains("bitsom") || n.contains("bits som") || n.contains("bit som") {
        "BITSoM"
    } else {
        return name.trim().to_string();
    };
    label.to_string()
}

/// Any text mentioning "compare" switches the UI into comparison mode.
pub fn is_compare_intent(text: &str) -> bool {
    text.to_lowercase().contains("compare")
}

/// Prefill values extracted from free text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareDefaults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_a: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub college_b: Option<String>,
}

/// Extract `A` and `B` from `compare A (vs|versus|and) B`.
pub fn parse_compare_intent(text: &str) -> CompareDefaults {
    let Some(caps) = COMPARE_PAIR.captures(text) else {
        return CompareDefaults::default();
    };
    let pick = |i: usize| {
        caps.get(i)
            .map(|m| normalize_college(m.as_str()))
            .filter(|s| !s.is_empty())
    };
    CompareDefaults { college_a: pick(1), college_b: pick(2) }
}

/// Assistant message carrying a `data-compare-ui` part with the defaults.
pub fn compare_ui_message(id: impl Into<String>, defaults: &CompareDefaults) -> UiMessage {
    UiMessage::new(
        id,
        UiRole::Assistant,
        vec![UiMessagePart::data(COMPARE_UI_PART, json!({ "defaults": defaults }))],
    )
}

/// A filled-in comparison form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonRequest {
    pub college_a: String,
    pub college_b: String,
    #[serde(default)]
    pub parameters: Vec<String>,
}

impl ComparisonRequest {
    pub fn validate(&self) -> Result<(), CompareError> {
        if self.college_a.trim().is_empty() || self.college_b.trim().is_empty() {
            return Err(CompareError::MissingCollege);
        }
        if self.parameters.iter().all(|p| p.trim().is_empty()) {
            return Err(CompareError::NoParameters);
        }
        Ok(())
    }

    /// `"Compare {A} and {B} on {P1}, {P2}, …"`, parameters in the given order.
    pub fn to_user_message(&self) -> Result<String, CompareError> {
        self.validate()?;
        let params: Vec<&str> = self
            .parameters
            .iter()
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .collect();
        Ok(format!(
            "Compare {} and {} on {}",
            self.college_a.trim(),
            self.college_b.trim(),
            params.join(", ")
        ))
    }
}
