//! UI message stream protocol.
//!
//! The browser consumes server-sent events, one JSON chunk per `data:` line,
//! terminated by `data: [DONE]`. [`UiStreamEncoder`] turns [`ModelEvent`]s into
//! these chunks, opening and closing text / reasoning blocks around their
//! deltas so every block is framed by `*-start` and `*-end`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::{FinishReason, ModelEvent};

/// Header announcing the stream protocol version to the client.
pub const STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";
pub const STREAM_VERSION: &str = "v1";

/// Final frame of every stream.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Text block id of a moderation denial.
pub const DENIAL_TEXT_ID: &str = "moderation-denial-text";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum UiStreamEvent {
    Start {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },
    StartStep,
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },
    ToolInputAvailable {
        tool_call_id: String,
        tool_name: String,
        input: Value,
    },
    ToolOutputAvailable {
        tool_call_id: String,
        output: Value,
    },
    ToolOutputError {
        tool_call_id: String,
        error_text: String,
    },
    FinishStep,
    Finish {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
    Error {
        error_text: String,
    },
}

impl UiStreamEvent {
    pub fn error(text: impl Into<String>) -> Self {
        UiStreamEvent::Error { error_text: text.into() }
    }

    pub fn finish(reason: Option<FinishReason>) -> Self {
        UiStreamEvent::Finish { finish_reason: reason.map(|r| r.as_str().to_string()) }
    }

    /// One SSE frame: `data: <json>\n\n`.
    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// The exact event sequence for a flagged turn.
pub fn denial_events(text: &str) -> Vec<UiStreamEvent> {
    vec![
        UiStreamEvent::Start { message_id: None },
        UiStreamEvent::TextStart { id: DENIAL_TEXT_ID.to_string() },
        UiStreamEvent::TextDelta { id: DENIAL_TEXT_ID.to_string(), delta: text.to_string() },
        UiStreamEvent::TextEnd { id: DENIAL_TEXT_ID.to_string() },
        UiStreamEvent::Finish { finish_reason: None },
    ]
}

/// A terminal failure before or during the model call.
pub fn failure_events(message: &str) -> Vec<UiStreamEvent> {
    vec![
        UiStreamEvent::Start { message_id: None },
        UiStreamEvent::error(message),
        UiStreamEvent::finish(Some(FinishReason::Error)),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Text,
    Reasoning,
}

/// Stateful [`ModelEvent`] → [`UiStreamEvent`] mapping for one turn.
#[derive(Debug, Default)]
pub struct UiStreamEncoder {
    open: Option<(Block, String)>,
    next_id: usize,
    finished: bool,
}

impl UiStreamEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once a `finish` chunk has been produced.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn encode(&mut self, event: ModelEvent) -> Vec<UiStreamEvent> {
        let mut out = Vec::new();
        match event {
            ModelEvent::StepStart => {
                self.close(&mut out);
                out.push(UiStreamEvent::StartStep);
            }
            ModelEvent::TextDelta(delta) => {
                if !delta.is_empty() {
                    let id = self.ensure_open(Block::Text, &mut out);
                    out.push(UiStreamEvent::TextDelta { id, delta });
                }
            }
            ModelEvent::ReasoningDelta(delta) => {
                if !delta.is_empty() {
                    let id = self.ensure_open(Block::Reasoning, &mut out);
                    out.push(UiStreamEvent::ReasoningDelta { id, delta });
                }
            }
            ModelEvent::ToolCall(call) => {
                self.close(&mut out);
                out.push(UiStreamEvent::ToolInputAvailable {
                    tool_call_id: call.id,
                    tool_name: call.name,
                    input: call.input,
                });
            }
            ModelEvent::ToolResult { id, output, .. } => {
                out.push(UiStreamEvent::ToolOutputAvailable { tool_call_id: id, output });
            }
            ModelEvent::ToolError { id, error, .. } => {
                out.push(UiStreamEvent::ToolOutputError { tool_call_id: id, error_text: error });
            }
            ModelEvent::StepFinish { .. } => {
                self.close(&mut out);
                out.push(UiStreamEvent::FinishStep);
            }
            ModelEvent::Finish { reason } => {
                self.close(&mut out);
                out.push(UiStreamEvent::finish(Some(reason)));
                self.finished = true;
            }
            ModelEvent::Error(message) => {
                self.close(&mut out);
                out.push(UiStreamEvent::error(message));
                out.push(UiStreamEvent::finish(Some(FinishReason::Error)));
                self.finished = true;
            }
        }
        out
    }

    /// Close any open block and emit a terminal error, unless already finished.
    pub fn abort(&mut self, message: &str) -> Vec<UiStreamEvent> {
        if self.finished {
            return Vec::new();
        }
        let mut out = Vec::new();
        self.close(&mut out);
        out.push(UiStreamEvent::error(message));
        out.push(UiStreamEvent::finish(Some(FinishReason::Error)));
        self.finished = true;
        out
    }

    fn ensure_open(&mut self, block: Block, out: &mut Vec<UiStreamEvent>) -> String {
        if let Some((open, id)) = &self.open {
            if *open == block {
                return id.clone();
            }
        }
        self.close(out);
        let id = match block {
            Block::Text => format!("txt_{}", self.next_id),
            Block::Reasoning => format!("rsn_{}", self.next_id),
        };
        self.next_id += 1;
        out.push(match block {
            Block::Text => UiStreamEvent::TextStart { id: id.clone() },
            Block::Reasoning => UiStreamEvent::ReasoningStart { id: id.clone() },
        });
        self.open = Some((block, id.clone()));
        id
    }

    fn close(&mut self, out: &mut Vec<UiStreamEvent>) {
        if let Some((block, id)) = self.open.take() {
            out.push(match block {
                Block::Text => UiStreamEvent::TextEnd { id },
                Block::Reasoning => UiStreamEvent::ReasoningEnd { id },
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;

    fn kinds(events: &[UiStreamEvent]) -> Vec<String> {
        events
            .iter()
            .map(|e| serde_json::to_value(e).unwrap()["type"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn wire_shape_uses_kebab_types_and_camel_fields() {
        let e = UiStreamEvent::ToolInputAvailable {
            tool_call_id: "c1".into(),
            tool_name: "webSearch".into(),
            input: json!({"query": "cat cutoff"}),
        };
        assert_eq!(
            serde_json::to_value(&e).unwrap(),
            json!({"type": "tool-input-available", "toolCallId": "c1", "toolName": "webSearch",
                   "input": {"query": "cat cutoff"}})
        );
        assert_eq!(
            serde_json::to_value(UiStreamEvent::error("boom")).unwrap(),
            json!({"type": "error", "errorText": "boom"})
        );
        assert_eq!(
            serde_json::to_value(UiStreamEvent::Start { message_id: None }).unwrap(),
            json!({"type": "start"})
        );
    }

    #[test]
    fn frame_format() {
        let frame = UiStreamEvent::StartStep.to_frame().unwrap();
        assert_eq!(frame, "data: {\"type\":\"start-step\"}\n\n");
    }

    #[test]
    fn denial_sequence_is_exact() {
        let events = denial_events("Not allowed.");
        assert_eq!(kinds(&events), ["start", "text-start", "text-delta", "text-end", "finish"]);
        assert_eq!(
            events[2],
            UiStreamEvent::TextDelta { id: DENIAL_TEXT_ID.into(), delta: "Not allowed.".into() }
        );
    }

    #[test]
    fn deltas_are_framed_by_block_start_and_end() {
        let mut enc = UiStreamEncoder::new();
        let mut out = Vec::new();
        for ev in [
            ModelEvent::StepStart,
            ModelEvent::ReasoningDelta("think".into()),
            ModelEvent::TextDelta("Hel".into()),
            ModelEvent::TextDelta("lo".into()),
            ModelEvent::StepFinish { reason: FinishReason::Stop },
            ModelEvent::Finish { reason: FinishReason::Stop },
        ] {
            out.extend(enc.encode(ev));
        }
        assert_eq!(
            kinds(&out),
            [
                "start-step",
                "reasoning-start",
                "reasoning-delta",
                "reasoning-end",
                "text-start",
                "text-delta",
                "text-delta",
                "text-end",
                "finish-step",
                "finish"
            ]
        );
        assert_eq!(out[4], UiStreamEvent::TextStart { id: "txt_1".into() });
        assert_eq!(out[9], UiStreamEvent::Finish { finish_reason: Some("stop".into()) });
        assert!(enc.is_finished());
    }

    #[test]
    fn tool_call_closes_open_text() {
        let mut enc = UiStreamEncoder::new();
        let mut out = enc.encode(ModelEvent::TextDelta("Let me check.".into()));
        out.extend(enc.encode(ModelEvent::ToolCall(ToolCall {
            id: "c1".into(),
            name: "vectorDatabaseSearch".into(),
            input: json!({"query": "xlri fees"}),
        })));
        out.extend(enc.encode(ModelEvent::ToolError {
            id: "c1".into(),
            name: "vectorDatabaseSearch".into(),
            error: "timeout".into(),
        }));
        assert_eq!(
            kinds(&out),
            ["text-start", "text-delta", "text-end", "tool-input-available", "tool-output-error"]
        );
    }

    #[test]
    fn provider_error_is_terminal() {
        let mut enc = UiStreamEncoder::new();
        let mut out = enc.encode(ModelEvent::TextDelta("partial".into()));
        out.extend(enc.encode(ModelEvent::Error("upstream 502".into())));
        assert_eq!(kinds(&out), ["text-start", "text-delta", "text-end", "error", "finish"]);
        assert!(enc.abort("late").is_empty());
    }

    #[test]
    fn abort_closes_and_finishes_once() {
        let mut enc = UiStreamEncoder::new();
        enc.encode(ModelEvent::ReasoningDelta("hmm".into()));
        let out = enc.abort("response exceeded 30s");
        assert_eq!(kinds(&out), ["reasoning-end", "error", "finish"]);
        assert!(enc.abort("again").is_empty());
    }
}
