//! Dummy LLM provider: echoes the latest user message back prefixed with `[echo]`.
//!
//! Used for exercising the full chat pipeline without an API key. Messages
//! starting with `/search ` or `/docs ` make it request the web-search or
//! vector-search tool, so the step loop can be driven end to end.

use serde_json::json;
use tokio::sync::mpsc;

use crate::llm::{FinishReason, ModelEvent, ModelMessage, ProviderError, StepOutcome, ToolCall};
use crate::tools::{ToolDefinition, VECTOR_SEARCH_TOOL, WEB_SEARCH_TOOL};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn step(
        &self,
        conversation: &[ModelMessage],
        tools: &[ToolDefinition],
        tx: &mpsc::Sender<ModelEvent>,
    ) -> Result<StepOutcome, ProviderError> {
        if let Some(call) = requested_tool(conversation, tools) {
            return Ok(StepOutcome {
                text: String::new(),
                tool_calls: vec![call],
                finish_reason: Some(FinishReason::ToolCalls),
            });
        }

        let text = reply(conversation);
        for word in text.split_inclusive(' ') {
            tx.send(ModelEvent::TextDelta(word.to_string()))
                .await
                .map_err(|_| ProviderError::Stream("event receiver closed".into()))?;
        }

        Ok(StepOutcome { text, tool_calls: Vec::new(), finish_reason: Some(FinishReason::Stop) })
    }
}

/// Only the most recent message decides: a trailing tool result ends the loop.
fn requested_tool(conversation: &[ModelMessage], tools: &[ToolDefinition]) -> Option<ToolCall> {
    let Some(ModelMessage::User { content }) = conversation.last() else {
        return None;
    };
    let (name, query) = if let Some(q) = content.strip_prefix("/search ") {
        (WEB_SEARCH_TOOL, q)
    } else if let Some(q) = content.strip_prefix("/docs ") {
        (VECTOR_SEARCH_TOOL, q)
    } else {
        return None;
    };
    if !tools.iter().any(|t| t.name == name) {
        return None;
    }
    Some(ToolCall {
        id: format!("call_{}", uuid::Uuid::new_v4().simple()),
        name: name.to_string(),
        input: json!({ "query": query.trim() }),
    })
}

fn reply(conversation: &[ModelMessage]) -> String {
    let tool_results = conversation
        .iter()
        .rev()
        .take_while(|m| matches!(m, ModelMessage::Tool { .. }))
        .count();
    if tool_results > 0 {
        return format!("[echo] received {tool_results} tool result(s)");
    }
    let last_user = conversation.iter().rev().find_map(|m| match m {
        ModelMessage::User { content } => Some(content.as_str()),
        _ => None,
    });
    format!("[echo] {}", last_user.unwrap_or_default())
}
