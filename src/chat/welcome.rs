//! Static copy for the empty chat screen.

use serde::Serialize;

pub const CLEAR_CHAT_TEXT: &str = "New";

const WELCOME_TEMPLATE: &str = "Hi there! I'm {{ai_name}} — India's first MBA intelligence assistant.

I help you make smarter B-school decisions using **verified data**, not rumours. You can ask me about:

✔️ College comparisons with live web-verified stats
✔️ Placement reports, fees, batch profiles & cutoffs
✔️ Program strengths & career outcomes
✔️ Recruiters, salaries, industry trends, and more

Just tell me the college, parameter, or doubt you're evaluating — I'll decode it for you in seconds.

What MBA-related query can I help you with today?";

const CAPABILITY_TEMPLATE: &str = "I'm {{ai_name}}, an MBA intelligence assistant designed to help you evaluate B-schools with real, verified data.

I can:
• Compare any two MBA colleges across fees, placements, rankings, and batch stats
• Pull facts from official placement reports and run live web searches for missing data
• Decode recruiters, salaries, specialisations, program formats, and faculty strengths
• Help you understand cutoffs, ROI, scholarships, and career outcomes
• Translate all this into clear recommendations — no rumours, no outdated blogs

Just tell me the college or question you're evaluating, and I'll break it down for you.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickPrompt {
    pub title: &'static str,
    pub description: &'static str,
    pub prompt: &'static str,
}

pub const QUICK_PROMPTS: &[QuickPrompt] = &[
    QuickPrompt {
        title: "Compare Colleges",
        description: "IIM vs ISB vs Top B-Schools",
        prompt: "Compare IIM Ahmedabad and IIM Bangalore for MBA placements and ROI",
    },
    QuickPrompt {
        title: "Placement Insights",
        description: "Salary trends & recruiters",
        prompt: "What are the latest placement statistics and top recruiters at IIM Calcutta?",
    },
    QuickPrompt {
        title: "Admission Strategy",
        description: "Cutoffs & selection criteria",
        prompt: "What CAT percentile and profile is needed for IIM Lucknow admission?",
    },
    QuickPrompt {
        title: "ROI Analysis",
        description: "Fees vs career outcomes",
        prompt: "Which MBA program offers the best ROI considering fees and average salary?",
    },
];

/// Body of `GET /api/welcome`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Welcome {
    pub ai_name: String,
    pub owner_name: String,
    pub welcome_message: String,
    pub capability_message: String,
    pub clear_chat_text: &'static str,
    pub quick_prompts: &'static [QuickPrompt],
}

impl Welcome {
    pub fn new(ai_name: &str, owner_name: &str) -> Self {
        Self {
            ai_name: ai_name.to_string(),
            owner_name: owner_name.to_string(),
            welcome_message: WELCOME_TEMPLATE.replace("{{ai_name}}", ai_name),
            capability_message: CAPABILITY_TEMPLATE.replace("{{ai_name}}", ai_name),
            clear_chat_text: CLEAR_CHAT_TEXT,
            quick_prompts: QUICK_PROMPTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_substituted() {
        let w = Welcome::new("MB-AI", "Owners");
        assert!(w.welcome_message.starts_with("Hi there! I'm MB-AI"));
        assert!(w.capability_message.starts_with("I'm MB-AI,"));
        assert!(!w.welcome_message.contains("{{"));
    }

    #[test]
    fn serializes_camel_case() {
        let v = serde_json::to_value(Welcome::new("MB-AI", "Owners")).unwrap();
        assert_eq!(v["clearChatText"], "New");
        assert_eq!(v["quickPrompts"].as_array().unwrap().len(), 4);
        assert_eq!(v["quickPrompts"][0]["title"], "Compare Colleges");
    }
}
