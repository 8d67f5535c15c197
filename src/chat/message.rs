//! UI message model exchanged with the browser.
//!
//! Mirrors the chat UI's message shape: an id, a role and ordered parts.
//! Text, reasoning and step boundaries are typed; tool parts (`tool-<name>`,
//! `dynamic-tool`) and custom `data-*` parts are kept as raw JSON so unknown
//! kinds survive a load/save round-trip untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    pub id: String,
    pub role: UiRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub parts: Vec<UiMessagePart>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum UiMessagePart {
    #[serde(rename = "text")]
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    #[serde(rename = "reasoning")]
    Reasoning {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<String>,
    },
    #[serde(rename = "step-start")]
    StepStart,
    /// Tool, data and any other part kind, verbatim.
    #[serde(untagged)]
    Other(Value),
}

/// Read-only view of a tool part.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPart<'a> {
    pub tool_name: &'a str,
    pub tool_call_id: &'a str,
    pub state: &'a str,
    pub input: Option<&'a Value>,
    pub output: Option<&'a Value>,
    pub error_text: Option<&'a str>,
}

impl UiMessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        UiMessagePart::Text { text: text.into(), state: None }
    }

    /// A custom `data-<name>` part.
    pub fn data(name: &str, data: Value) -> Self {
        UiMessagePart::Other(json!({ "type": format!("data-{name}"), "data": data }))
    }

    /// The raw `type` tag of this part.
    pub fn kind(&self) -> &str {
        match self {
            UiMessagePart::Text { .. } => "text",
            UiMessagePart::Reasoning { .. } => "reasoning",
            UiMessagePart::StepStart => "step-start",
            UiMessagePart::Other(v) => v.get("type").and_then(Value::as_str).unwrap_or(""),
        }
    }

    pub fn is_data(&self) -> bool {
        self.kind().starts_with("data-")
    }

    pub fn as_tool(&self) -> Option<ToolPart<'_>> {
        let UiMessagePart::Other(v) = self else {
            return None;
        };
        let kind = v.get("type")?.as_str()?;
        let tool_name = match kind.strip_prefix("tool-") {
            Some(name) => name,
            None if kind == "dynamic-tool" => v.get("toolName")?.as_str()?,
            None => return None,
        };
        Some(ToolPart {
            tool_name,
            tool_call_id: v.get("toolCallId")?.as_str()?,
            state: v.get("state").and_then(Value::as_str).unwrap_or(""),
            input: v.get("input"),
            output: v.get("output"),
            error_text: v.get("errorText").and_then(Value::as_str),
        })
    }
}

impl UiMessage {
    pub fn new(id: impl Into<String>, role: UiRole, parts: Vec<UiMessagePart>) -> Self {
        Self { id: id.into(), role, metadata: None, parts }
    }

    pub fn user_text(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(id, UiRole::User, vec![UiMessagePart::text(text)])
    }

    /// Concatenation of all text parts, without separators.
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                UiMessagePart::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

/// The most recent user message, if any.
pub fn latest_user_message(messages: &[UiMessage]) -> Option<&UiMessage> {
    messages.iter().rev().find(|m| m.role == UiRole::User)
}
