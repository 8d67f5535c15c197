//! UI history → model conversation.
//!
//! System and user messages keep their text. Assistant messages are split into
//! blocks at `step-start`; each block becomes an assistant message (text plus
//! the tool calls that completed) followed by one `tool` message per result.
//! Reasoning, step markers, `data-*` parts and unfinished tool calls are
//! dropped, and messages that convert to nothing are omitted.

use serde_json::{Value, json};

use crate::llm::{ModelMessage, ToolCall};

use super::message::{UiMessage, UiMessagePart, UiRole};

pub fn to_model_messages(messages: &[UiMessage]) -> Vec<ModelMessage> {
    let mut out = Vec::new();
    for message in messages {
        match message.role {
            UiRole::System => {
                let text = joined_text(&message.parts);
                if !text.is_empty() {
                    out.push(ModelMessage::System { content: text });
                }
            }
            UiRole::User => {
                let text = joined_text(&message.parts);
                if !text.is_empty() {
                    out.push(ModelMessage::User { content: text });
                }
            }
            UiRole::Assistant => {
                for block in message.parts.split(|p| matches!(p, UiMessagePart::StepStart)) {
                    convert_assistant_block(block, &mut out);
                }
            }
        }
    }
    out
}

fn joined_text(parts: &[UiMessagePart]) -> String {
    parts
        .iter()
        .filter_map(|p| match p {
            UiMessagePart::Text { text, .. } if !text.is_empty() => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn convert_assistant_block(block: &[UiMessagePart], out: &mut Vec<ModelMessage>) {
    let text = joined_text(block);
    let mut tool_calls = Vec::new();
    let mut results = Vec::new();

    for tool in block.iter().filter_map(UiMessagePart::as_tool) {
        let content = match tool.state {
            "output-available" => tool.output.cloned().unwrap_or(Value::Null).to_string(),
            "output-error" => json!({ "error": tool.error_text.unwrap_or("tool failed") }).to_string(),
            _ => continue,
        };
        tool_calls.push(ToolCall {
            id: tool.tool_call_id.to_string(),
            name: tool.tool_name.to_string(),
            input: tool.input.cloned().unwrap_or_else(|| json!({})),
        });
        results.push(ModelMessage::Tool { tool_call_id: tool.tool_call_id.to_string(), content });
    }

    if text.is_empty() && tool_calls.is_empty() {
        return;
    }
    out.push(ModelMessage::Assistant {
        content: Some(text).filter(|t| !t.is_empty()),
        tool_calls,
    });
    out.extend(results);
}
