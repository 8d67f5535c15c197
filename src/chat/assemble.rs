//! Fold a UI message stream back into one assistant [`UiMessage`].
//!
//! This is what the browser does with the chunks it receives; the server uses
//! it to record completed turns and tests use it to check what a user would
//! actually see.

use std::collections::HashMap;

use serde_json::{Value, json};

use super::message::{UiMessage, UiMessagePart, UiRole};
use super::stream::UiStreamEvent;

#[derive(Debug)]
pub struct MessageAssembler {
    message: UiMessage,
    blocks: HashMap<String, usize>,
    tools: HashMap<String, usize>,
    error: Option<String>,
    finished: bool,
}

impl MessageAssembler {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            message: UiMessage::new(id, UiRole::Assistant, Vec::new()),
            blocks: HashMap::new(),
            tools: HashMap::new(),
            error: None,
            finished: false,
        }
    }

    pub fn apply(&mut self, event: &UiStreamEvent) {
        let parts = &mut self.message.parts;
        match event {
            UiStreamEvent::Start { message_id } => {
                if let Some(id) = message_id {
                    self.message.id = id.clone();
                }
            }
            UiStreamEvent::StartStep => parts.push(UiMessagePart::StepStart),
            UiStreamEvent::TextStart { id } => {
                self.blocks.insert(id.clone(), parts.len());
                parts.push(UiMessagePart::Text { text: String::new(), state: Some("streaming".into()) });
            }
            UiStreamEvent::ReasoningStart { id } => {
                self.blocks.insert(id.clone(), parts.len());
                parts.push(UiMessagePart::Reasoning {
                    text: String::new(),
                    state: Some("streaming".into()),
                });
            }
            UiStreamEvent::TextDelta { id, delta } | UiStreamEvent::ReasoningDelta { id, delta } => {
                if let Some(
                    UiMessagePart::Text { text, .. } | UiMessagePart::Reasoning { text, .. },
                ) = self.blocks.get(id).and_then(|&i| parts.get_mut(i))
                {
                    text.push_str(delta);
                }
            }
            UiStreamEvent::TextEnd { id } | UiStreamEvent::ReasoningEnd { id } => {
                if let Some(
                    UiMessagePart::Text { state, .. } | UiMessagePart::Reasoning { state, .. },
                ) = self.blocks.get(id).and_then(|&i| parts.get_mut(i))
                {
                    *state = Some("done".into());
                }
            }
            UiStreamEvent::ToolInputAvailable { tool_call_id, tool_name, input } => {
                self.tools.insert(tool_call_id.clone(), parts.len());
                parts.push(UiMessagePart::Other(json!({
                    "type": format!("tool-{tool_name}"),
                    "toolCallId": tool_call_id,
                    "state": "input-available",
                    "input": input,
                })));
            }
            UiStreamEvent::ToolOutputAvailable { tool_call_id, output } => {
                if let Some(part) = tool_part(parts, &self.tools, tool_call_id) {
                    part["state"] = json!("output-available");
                    part["output"] = output.clone();
                }
            }
            UiStreamEvent::ToolOutputError { tool_call_id, error_text } => {
                if let Some(part) = tool_part(parts, &self.tools, tool_call_id) {
                    part["state"] = json!("output-error");
                    part["errorText"] = json!(error_text);
                }
            }
            UiStreamEvent::FinishStep => {}
            UiStreamEvent::Finish { .. } => self.finished = true,
            UiStreamEvent::Error { error_text } => self.error = Some(error_text.clone()),
        }
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn message(&self) -> &UiMessage {
        &self.message
    }

    pub fn into_message(self) -> UiMessage {
        self.message
    }
}

fn tool_part<'a>(
    parts: &'a mut [UiMessagePart],
    index: &HashMap<String, usize>,
    tool_call_id: &str,
) -> Option<&'a mut Value> {
    match index.get(tool_call_id).and_then(|&i| parts.get_mut(i)) {
        Some(UiMessagePart::Other(v)) => Some(v),
        _ => None,
    }
}

/// Assemble a complete event sequence.
pub fn assemble<'a>(id: &str, events: impl IntoIterator<Item = &'a UiStreamEvent>) -> MessageAssembler {
    let mut assembler = MessageAssembler::new(id);
    for event in events {
        assembler.apply(event);
    }
    assembler
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::stream::denial_events;

    #[test]
    fn denial_assembles_to_single_text() {
        let a = assemble("m1", &denial_events("No."));
        assert!(a.is_finished());
        let msg = a.into_message();
        assert_eq!(msg.parts.len(), 1);
        assert_eq!(msg.text_content(), "No.");
    }

    #[test]
    fn tool_part_progresses_to_output() {
        let events = vec![
            UiStreamEvent::StartStep,
            UiStreamEvent::ToolInputAvailable {
                tool_call_id: "c1".into(),
                tool_name: "webSearch".into(),
                input: json!({"query": "isb fees"}),
            },
            UiStreamEvent::ToolOutputAvailable { tool_call_id: "c1".into(), output: json!([]) },
            UiStreamEvent::FinishStep,
            UiStreamEvent::StartStep,
            UiStreamEvent::TextStart { id: "t".into() },
            UiStreamEvent::TextDelta { id: "t".into(), delta: "Done".into() },
            UiStreamEvent::TextEnd { id: "t".into() },
            UiStreamEvent::Finish { finish_reason: Some("stop".into()) },
        ];
        let msg = assemble("m2", &events).into_message();
        assert_eq!(msg.parts.len(), 4);
        let tool = msg.parts[1].as_tool().unwrap();
        assert_eq!(tool.state, "output-available");
        assert_eq!(tool.output, Some(&json!([])));
        assert_eq!(
            msg.parts[3],
            UiMessagePart::Text { text: "Done".into(), state: Some("done".into()) }
        );
    }

    #[test]
    fn error_is_recorded() {
        let a = assemble("m3", &[UiStreamEvent::error("classifier down")]);
        assert_eq!(a.error(), Some("classifier down"));
        assert!(a.message().parts.is_empty());
    }
}
