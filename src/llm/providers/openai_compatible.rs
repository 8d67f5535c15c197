//! OpenAI-compatible streaming chat completion provider (`/v1/chat/completions`).
//!
//! One `step` is one request with `stream: true`. Content and reasoning deltas
//! are forwarded as they arrive; tool-call fragments are accumulated by index
//! and returned once the stream ends. The step loop lives in `llm::run_steps`;
//! this provider is stateless. All OpenAI wire types are private to this module.

use std::collections::BTreeMap;

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use crate::llm::{
    FinishReason, ModelEvent, ModelMessage, ProviderError, ProviderOptions, StepOutcome, ToolCall,
};
use crate::tools::ToolDefinition;

// ── Public provider ───────────────────────────────────────────────────────────

/// Adapter for any HTTP endpoint implementing streaming `/v1/chat/completions`.
///
/// Constructed once at startup, then cheaply cloned because
/// `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleProvider {
    client: Client,
    api_base_url: String,
    model: String,
    temperature: f32,
    api_key: Option<String>,
}

impl OpenAiCompatibleProvider {
    /// `api_key` is `None` for keyless local models. When present it is sent
    /// as `Authorization: Bearer <key>` on every request.
    pub fn new(
        api_base_url: String,
        model: String,
        temperature: f32,
        timeout_seconds: u64,
        api_key: Option<String>,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_seconds))
            .build()
            .map_err(|e| ProviderError::Request(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, api_base_url, model, temperature, api_key })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub async fn step(
        &self,
        conversation: &[ModelMessage],
        tools: &[ToolDefinition],
        options: &ProviderOptions,
        tx: &mpsc::Sender<ModelEvent>,
    ) -> Result<StepOutcome, ProviderError> {
        let payload = self.build_request(conversation, tools, options);

        debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            tools = payload.tools.len(),
            "sending streaming LLM request"
        );
        if tracing::enabled!(tracing::Level::TRACE) {
            let json = serde_json::to_string_pretty(&payload)
                .unwrap_or_else(|e| format!("<serialization failed: {e}>"));
            trace!(payload = %json, "full LLM request payload");
        }

        let mut req = self.client.post(&self.api_base_url).json(&payload);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            error!(url = %self.api_base_url, error = %e, "LLM HTTP request failed (transport)");
            ProviderError::Request(e.to_string())
        })?;
        let response = check_status(response).await?;

        let mut events = response.bytes_stream().eventsource();
        let mut acc = StepAccumulator::default();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| ProviderError::Stream(e.to_string()))?;
            trace!(data = %event.data, "LLM SSE chunk");
            if event.data == "[DONE]" {
                break;
            }
            for delta in acc.apply(&event.data)? {
                tx.send(delta)
                    .await
                    .map_err(|_| ProviderError::Stream("event receiver closed".into()))?;
            }
        }

        let outcome = acc.finish();
        debug!(
            text_len = outcome.text.len(),
            tool_calls = outcome.tool_calls.len(),
            finish_reason = ?outcome.finish_reason,
            "LLM step complete"
        );
        Ok(outcome)
    }

    fn build_request<'a>(
        &'a self,
        conversation: &'a [ModelMessage],
        tools: &'a [ToolDefinition],
        options: &'a ProviderOptions,
    ) -> ChatCompletionRequest<'a> {
        let reasoning = is_reasoning_model(&self.model);
        ChatCompletionRequest {
            model: &self.model,
            messages: conversation.iter().map(WireMessage::from).collect(),
            // Reasoning models reject a temperature parameter.
            temperature: (!reasoning).then_some(self.temperature),
            reasoning_effort: reasoning.then_some(options.reasoning_effort.as_str()),
            parallel_tool_calls: (!tools.is_empty()).then_some(options.parallel_tool_calls),
            tools: tools.iter().map(WireTool::from).collect(),
            stream: true,
        }
    }
}

fn is_reasoning_model(model: &str) -> bool {
    ["o1", "o3", "o4", "gpt-5"].iter().any(|p| model.starts_with(p))
}

// ── Stream accumulation ───────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: String,
    arguments: String,
}

/// Folds streamed chunks into deltas for the relay and one [`StepOutcome`].
#[derive(Debug, Default)]
struct StepAccumulator {
    text: String,
    tool_calls: BTreeMap<usize, PartialToolCall>,
    finish_reason: Option<FinishReason>,
}

impl StepAccumulator {
    fn apply(&mut self, data: &str) -> Result<Vec<ModelEvent>, ProviderError> {
        let chunk: ChatCompletionChunk = serde_json::from_str(data)
            .map_err(|e| ProviderError::Stream(format!("invalid chunk: {e}")))?;

        if let Some(err) = chunk.error {
            return Err(ProviderError::Stream(err.message));
        }

        let mut out = Vec::new();
        let Some(choice) = chunk.choices.into_iter().next() else {
            return Ok(out);
        };

        if let Some(reasoning) = choice.delta.reasoning_content.filter(|r| !r.is_empty()) {
            out.push(ModelEvent::ReasoningDelta(reasoning));
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            self.text.push_str(&content);
            out.push(ModelEvent::TextDelta(content));
        }
        for fragment in choice.delta.tool_calls {
            let entry = self.tool_calls.entry(fragment.index).or_default();
            if let Some(id) = fragment.id {
                entry.id = Some(id);
            }
            if let Some(function) = fragment.function {
                if let Some(name) = function.name {
                    entry.name.push_str(&name);
                }
                if let Some(arguments) = function.arguments {
                    entry.arguments.push_str(&arguments);
                }
            }
        }
        if let Some(reason) = choice.finish_reason {
            self.finish_reason = Some(FinishReason::from_openai(&reason));
        }
        Ok(out)
    }

    fn finish(self) -> StepOutcome {
        let tool_calls: Vec<ToolCall> = self
            .tool_calls
            .into_values()
            .filter(|c| !c.name.is_empty())
            .map(|c| ToolCall {
                id: c.id.unwrap_or_else(|| format!("call_{}", uuid::Uuid::new_v4().simple())),
                input: parse_arguments(&c.arguments),
                name: c.name,
            })
            .collect();
        let finish_reason = if tool_calls.is_empty() {
            self.finish_reason
        } else {
            Some(FinishReason::ToolCalls)
        };
        StepOutcome { text: self.text, tool_calls, finish_reason }
    }
}

/// Empty arguments mean "no input"; unparseable ones are passed through as a
/// string so tool validation reports them back to the model.
fn parse_arguments(raw: &str) -> Value {
    if raw.trim().is_empty() {
        return Value::Object(Default::default());
    }
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parallel_tool_calls: Option<bool>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<&'a str>,
}

impl<'a> From<&'a ModelMessage> for WireMessage<'a> {
    fn from(message: &'a ModelMessage) -> Self {
        let base = |role, content| WireMessage {
            role,
            content,
            tool_calls: Vec::new(),
            tool_call_id: None,
        };
        match message {
            ModelMessage::System { content } => base("system", Some(content.as_str())),
            ModelMessage::User { content } => base("user", Some(content.as_str())),
            ModelMessage::Assistant { content, tool_calls } => WireMessage {
                tool_calls: tool_calls.iter().map(WireToolCall::from).collect(),
                ..base("assistant", content.as_deref())
            },
            ModelMessage::Tool { tool_call_id, content } => WireMessage {
                tool_call_id: Some(tool_call_id.as_str()),
                ..base("tool", Some(content.as_str()))
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireToolCall<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunctionCall<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunctionCall<'a> {
    name: &'a str,
    arguments: String,
}

impl<'a> From<&'a ToolCall> for WireToolCall<'a> {
    fn from(call: &'a ToolCall) -> Self {
        WireToolCall {
            id: &call.id,
            kind: "function",
            function: WireFunctionCall { name: &call.name, arguments: call.input.to_string() },
        }
    }
}

#[derive(Debug, Serialize)]
struct WireTool<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireFunction<'a>,
}

#[derive(Debug, Serialize)]
struct WireFunction<'a> {
    name: &'a str,
    description: &'a str,
    parameters: &'a Value,
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(def: &'a ToolDefinition) -> Self {
        WireTool {
            kind: "function",
            function: WireFunction {
                name: &def.name,
                description: &def.description,
                parameters: &def.parameters,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ToolCallFragment>,
}

#[derive(Debug, Deserialize)]
struct ToolCallFragment {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<FunctionFragment>,
}

#[derive(Debug, Deserialize)]
struct FunctionFragment {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

// Error envelope used by OpenAI and compatible APIs.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    code: Option<Value>,
}

/// Consume the response and return it if successful, or a structured error.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<failed to read error body>".to_string());

    let message = error_message(status, &body);
    error!(%status, %message, "LLM request returned HTTP error");
    Err(ProviderError::Request(message))
}

fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(env) = serde_json::from_str::<ErrorEnvelope>(body) {
        let code = env
            .error
            .code
            .map(|v| match v {
                Value::String(s) => format!(" [code={s}]"),
                other => format!(" [code={other}]"),
            })
            .unwrap_or_default();
        format!("HTTP {status}{code}: {}", env.error.message)
    } else {
        format!("HTTP {status}: {body}")
    }
}
