//! Model invocation layer.
//!
//! `LlmProvider` is an enum over concrete provider implementations. Each
//! provider performs one streamed model request per step; [`LlmProvider::stream`]
//! drives the step loop, executes requested tools sequentially and yields
//! [`ModelEvent`]s over a bounded channel.
//!
//! Provider instances are shared immutable capabilities: clone them freely.

pub mod providers;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::tools::{ToolDefinition, ToolSet};

/// Capacity of the event channel between the model task and the relay.
const EVENT_BUFFER: usize = 64;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("provider stream failed: {0}")]
    Stream(String),
}

// ── Conversation types ────────────────────────────────────────────────────────

/// A tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Provider-neutral conversation message.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        content: Option<String>,
        tool_calls: Vec<ToolCall>,
    },
    Tool {
        tool_call_id: String,
        content: String,
    },
}

impl ModelMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::System { content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::User { content: content.into() }
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::Assistant { content: Some(content.into()), tool_calls: Vec::new() }
    }
}

/// Provider-specific knobs forwarded with every step.
#[derive(Debug, Clone)]
pub struct ProviderOptions {
    /// Only sent to reasoning-capable models.
    pub reasoning_effort: String,
    pub parallel_tool_calls: bool,
}

impl Default for ProviderOptions {
    fn default() -> Self {
        Self { reasoning_effort: "low".to_string(), parallel_tool_calls: false }
    }
}

/// Everything one turn sends to the model.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    /// Ordered system messages; always sent before `messages`.
    pub system: Vec<String>,
    pub messages: Vec<ModelMessage>,
    /// Upper bound on model steps.
    pub max_steps: usize,
    pub options: ProviderOptions,
}

// ── Events ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
    Other,
}

impl FinishReason {
    /// Wire name used in the UI message stream.
    pub fn as_str(self) -> &'static str {
        match self {
            FinishReason::Stop => "stop",
            FinishReason::Length => "length",
            FinishReason::ToolCalls => "tool-calls",
            FinishReason::ContentFilter => "content-filter",
            FinishReason::Error => "error",
            FinishReason::Other => "other",
        }
    }

    /// Map an OpenAI `finish_reason` value.
    pub fn from_openai(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            _ => FinishReason::Other,
        }
    }
}

/// Incremental output of a model turn, in emission order.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelEvent {
    StepStart,
    TextDelta(String),
    ReasoningDelta(String),
    ToolCall(ToolCall),
    ToolResult { id: String, name: String, output: Value },
    ToolError { id: String, name: String, error: String },
    StepFinish { reason: FinishReason },
    Finish { reason: FinishReason },
    Error(String),
}

/// What a single provider step produced once its stream completed.
#[derive(Debug, Clone, Default)]
pub struct StepOutcome {
    pub text: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `step` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    #[cfg(test)]
    Scripted(providers::scripted::ScriptedProvider),
}

impl LlmProvider {
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::OpenAiCompatible(_) => "openai",
            #[cfg(test)]
            LlmProvider::Scripted(_) => "scripted",
        }
    }

    /// Run one streamed model request. Text and reasoning deltas are sent on
    /// `tx` as they arrive; the accumulated outcome is returned at the end.
    pub async fn step(
        &self,
        conversation: &[ModelMessage],
        tools: &[ToolDefinition],
        options: &ProviderOptions,
        tx: &mpsc::Sender<ModelEvent>,
    ) -> Result<StepOutcome, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.step(conversation, tools, tx).await,
            LlmProvider::OpenAiCompatible(p) => p.step(conversation, tools, options, tx).await,
            #[cfg(test)]
            LlmProvider::Scripted(p) => p.step(conversation, tx).await,
        }
    }

    /// Spawn the model task for one turn and return its event stream.
    ///
    /// The task stops early when `cancel` fires or the receiver is dropped.
    pub fn stream(
        &self,
        request: ModelRequest,
        tools: Arc<ToolSet>,
        cancel: CancellationToken,
    ) -> ReceiverStream<ModelEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let provider = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    debug!(provider = provider.name(), "model task cancelled");
                }
                _ = run_steps(&provider, request, &tools, &tx) => {}
            }
        });
        ReceiverStream::new(rx)
    }
}

async fn emit(tx: &mpsc::Sender<ModelEvent>, event: ModelEvent) -> bool {
    tx.send(event).await.is_ok()
}

/// The step loop: one provider request per step, tool calls executed in
/// order between steps, at most `request.max_steps` steps.
async fn run_steps(
    provider: &LlmProvider,
    request: ModelRequest,
    tools: &ToolSet,
    tx: &mpsc::Sender<ModelEvent>,
) {
    let ModelRequest { system, messages, max_steps, options } = request;
    let max_steps = max_steps.max(1);

    let mut conversation: Vec<ModelMessage> =
        system.into_iter().map(ModelMessage::system).chain(messages).collect();
    let definitions = tools.definitions();

    for step in 1..=max_steps {
        if !emit(tx, ModelEvent::StepStart).await {
            return;
        }

        let outcome = match provider.step(&conversation, &definitions, &options, tx).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(step, provider = provider.name(), error = %e, "model step failed");
                emit(tx, ModelEvent::Error(e.to_string())).await;
                return;
            }
        };

        if outcome.tool_calls.is_empty() {
            let reason = outcome.finish_reason.unwrap_or(FinishReason::Stop);
            debug!(step, reason = reason.as_str(), "model finished");
            if emit(tx, ModelEvent::StepFinish { reason }).await {
                emit(tx, ModelEvent::Finish { reason }).await;
            }
            return;
        }

        conversation.push(ModelMessage::Assistant {
            content: Some(outcome.text).filter(|t| !t.is_empty()),
            tool_calls: outcome.tool_calls.clone(),
        });

        for call in outcome.tool_calls {
            if !emit(tx, ModelEvent::ToolCall(call.clone())).await {
                return;
            }
            debug!(step, tool = %call.name, id = %call.id, "executing tool call");
            let event = match tools.execute(&call.name, &call.input).await {
                Ok(output) => {
                    conversation.push(ModelMessage::Tool {
                        tool_call_id: call.id.clone(),
                        content: output.to_string(),
                    });
                    ModelEvent::ToolResult { id: call.id, name: call.name, output }
                }
                Err(e) => {
                    warn!(tool = %call.name, error = %e, "tool call failed");
                    conversation.push(ModelMessage::Tool {
                        tool_call_id: call.id.clone(),
                        content: json!({ "error": e.to_string() }).to_string(),
                    });
                    ModelEvent::ToolError { id: call.id, name: call.name, error: e.to_string() }
                }
            };
            if !emit(tx, event).await {
                return;
            }
        }

        if !emit(tx, ModelEvent::StepFinish { reason: FinishReason::ToolCalls }).await {
            return;
        }
    }

    debug!(max_steps, "step bound reached");
    emit(tx, ModelEvent::Finish { reason: FinishReason::ToolCalls }).await;
}
