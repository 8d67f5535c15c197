//! Per-turn request pipeline.
//!
//! ```text
//! received → moderating ─┬─ flagged ──────────────────────────────→ denied
//!                        ├─ classifier error ─────────────────────→ failed
//!                        └─ ok → assembling-prompt → invoking-model
//!                                  → streaming ─┬─ finish ─────────→ finished
//!                                               ├─ provider error ─→ failed
//!                                               └─ client gone ────→ cancelled
//! ```
//!
//! Each turn runs on its own task and reports UI stream events over a bounded
//! channel. Flagged turns never reach the model or the tools.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeZone};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{ChatConfig, Config};
use crate::error::AppError;
use crate::llm::{LlmProvider, ModelRequest, ProviderOptions, providers};
use crate::moderation::{ModerationCategory, Moderator};
use crate::tools::ToolSet;

use super::convert::to_model_messages;
use super::message::{UiMessage, latest_user_message};
use super::prompt::SystemPrompt;
use super::stream::{UiStreamEncoder, UiStreamEvent, denial_events, failure_events};

const TURN_BUFFER: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    Received,
    Moderating,
    Denied,
    AssemblingPrompt,
    InvokingModel,
    Streaming,
    Finished,
    Failed,
    Cancelled,
}

impl TurnState {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnState::Received => "received",
            TurnState::Moderating => "moderating",
            TurnState::Denied => "denied",
            TurnState::AssemblingPrompt => "assembling-prompt",
            TurnState::InvokingModel => "invoking-model",
            TurnState::Streaming => "streaming",
            TurnState::Finished => "finished",
            TurnState::Failed => "failed",
            TurnState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TurnState::Denied | TurnState::Finished | TurnState::Failed | TurnState::Cancelled
        )
    }
}

/// A running turn: its event stream plus a handle resolving to the final state.
pub struct Turn {
    pub id: String,
    pub events: ReceiverStream<UiStreamEvent>,
    pub task: JoinHandle<TurnState>,
}

/// Outcome of the moderation gate.
#[derive(Debug)]
enum Gate {
    Pass,
    Denied { category: Option<ModerationCategory>, text: String },
    Failed(String),
    Cancelled,
}

/// Everything a turn needs, immutable after startup.
pub struct ChatService {
    moderator: Moderator,
    provider: LlmProvider,
    tools: Arc<ToolSet>,
    prompt: SystemPrompt,
    max_steps: usize,
    max_duration: Duration,
    options: ProviderOptions,
}

impl ChatService {
    pub fn new(
        moderator: Moderator,
        provider: LlmProvider,
        tools: ToolSet,
        prompt: SystemPrompt,
        chat: &ChatConfig,
    ) -> Self {
        Self {
            moderator,
            provider,
            tools: Arc::new(tools),
            prompt,
            max_steps: chat.max_steps,
            max_duration: Duration::from_secs(chat.max_duration_seconds),
            options: ProviderOptions {
                reasoning_effort: chat.reasoning_effort.clone(),
                parallel_tool_calls: chat.parallel_tool_calls,
            },
        }
    }

    /// Build every collaborator from config. `now` stamps the date/time layer.
    pub fn from_config<Tz>(config: &Config, now: &DateTime<Tz>) -> Result<Self, AppError>
    where
        Tz: TimeZone,
        Tz::Offset: std::fmt::Display,
    {
        let moderator = Moderator::build(&config.moderation, &config.secrets)
            .map_err(|e| AppError::Moderation(e.to_string()))?;
        let provider = providers::build(&config.llm, config.secrets.llm_api_key.clone())
            .map_err(|e| AppError::Llm(e.to_string()))?;
        let tools = ToolSet::build(&config.tools, &config.secrets)
            .map_err(|e| AppError::Tools(e.to_string()))?;
        let prompt = SystemPrompt::assemble(&config.prompts, now)?;
        Ok(Self::new(moderator, provider, tools, prompt, &config.chat))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn moderator_name(&self) -> &'static str {
        self.moderator.name()
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.enabled_names()
    }

    pub fn prompt(&self) -> &SystemPrompt {
        &self.prompt
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    pub fn max_duration(&self) -> Duration {
        self.max_duration
    }

    /// Start a turn over the full message history. The turn stops early when
    /// `cancel` fires or the event stream is dropped.
    pub fn start_turn(self: &Arc<Self>, messages: Vec<UiMessage>, cancel: CancellationToken) -> Turn {
        let id = uuid::Uuid::now_v7().to_string();
        let (tx, rx) = mpsc::channel(TURN_BUFFER);
        let service = Arc::clone(self);
        let turn_id = id.clone();
        let task = tokio::spawn(async move { service.run_turn(turn_id, messages, tx, cancel).await });
        Turn { id, events: ReceiverStream::new(rx), task }
    }

    async fn gate(&self, messages: &[UiMessage], cancel: &CancellationToken) -> Gate {
        let text = latest_user_message(messages).map(UiMessage::text_content).unwrap_or_default();
        if text.is_empty() {
            debug!("no user text, skipping moderation");
            return Gate::Pass;
        }
        let verdict = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Gate::Cancelled,
            verdict = self.moderator.classify(&text) => verdict,
        };
        match verdict {
            Ok(result) if result.flagged => Gate::Denied {
                category: result.category,
                text: result.denial_text().to_string(),
            },
            Ok(_) => Gate::Pass,
            Err(e) => Gate::Failed(e.to_string()),
        }
    }

    async fn run_turn(
        &self,
        turn_id: String,
        messages: Vec<UiMessage>,
        tx: mpsc::Sender<UiStreamEvent>,
        cancel: CancellationToken,
    ) -> TurnState {
        let mut state = TurnState::Received;
        let mut advance = |next: TurnState| {
            debug!(turn = %turn_id, from = state.as_str(), to = next.as_str(), "turn state");
            state = next;
            next
        };
        info!(turn = %turn_id, messages = messages.len(), "turn received");

        advance(TurnState::Moderating);
        match self.gate(&messages, &cancel).await {
            Gate::Pass => {}
            Gate::Cancelled => {
                debug!(turn = %turn_id, "cancelled during moderation");
                return advance(TurnState::Cancelled);
            }
            Gate::Denied { category, text } => {
                info!(
                    turn = %turn_id,
                    category = category.map(ModerationCategory::as_str),
                    "turn denied by moderation"
                );
                send_all(&tx, denial_events(&text)).await;
                return advance(TurnState::Denied);
            }
            Gate::Failed(e) => {
                warn!(turn = %turn_id, "moderation failed, refusing turn: {e}");
                send_all(&tx, failure_events(&format!("moderation unavailable: {e}"))).await;
                return advance(TurnState::Failed);
            }
        }

        advance(TurnState::AssemblingPrompt);
        let request = ModelRequest {
            system: self.prompt.messages().to_vec(),
            messages: to_model_messages(&messages),
            max_steps: self.max_steps,
            options: self.options.clone(),
        };
        debug!(
            turn = %turn_id,
            system = request.system.len(),
            history = request.messages.len(),
            "prompt assembled"
        );

        advance(TurnState::InvokingModel);
        let model_cancel = cancel.child_token();
        let mut events = self.provider.stream(request, Arc::clone(&self.tools), model_cancel.clone());
        if tx.send(UiStreamEvent::Start { message_id: Some(turn_id.clone()) }).await.is_err() {
            model_cancel.cancel();
            return advance(TurnState::Cancelled);
        }

        advance(TurnState::Streaming);
        let mut encoder = UiStreamEncoder::new();
        let mut failed = false;
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                event = events.next() => event,
            };
            let Some(event) = event else { break };
            failed |= matches!(event, crate::llm::ModelEvent::Error(_));
            for chunk in encoder.encode(event) {
                if tx.send(chunk).await.is_err() {
                    debug!(turn = %turn_id, "client went away");
                    model_cancel.cancel();
                    return advance(TurnState::Cancelled);
                }
            }
        }

        if cancel.is_cancelled() {
            model_cancel.cancel();
            return advance(TurnState::Cancelled);
        }
        if !encoder.is_finished() {
            warn!(turn = %turn_id, "model stream ended without finish");
            send_all(&tx, encoder.abort("model stream ended unexpectedly")).await;
            return advance(TurnState::Failed);
        }
        if failed {
            return advance(TurnState::Failed);
        }
        info!(turn = %turn_id, "turn finished");
        advance(TurnState::Finished)
    }
}

async fn send_all(tx: &mpsc::Sender<UiStreamEvent>, events: Vec<UiStreamEvent>) {
    for event in events {
        if tx.send(event).await.is_err() {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::assemble::assemble;
    use crate::chat::message::UiMessage;
    use crate::config::Config;
    use crate::llm::providers::scripted::ScriptedProvider;
    use crate::llm::{FinishReason, ModelMessage, StepOutcome, ToolCall};
    use crate::moderation::DEFAULT_DENIAL_MESSAGE;
    use crate::tools::{SearchHit, VectorSearch, WebSearch};
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;
    use tempfile::TempDir;

    fn prompt() -> SystemPrompt {
        let dir = TempDir::new().unwrap();
        let config = Config::test_default(dir.path());
        let now = FixedOffset::east_opt(0).unwrap().with_ymd_and_hms(2026, 10, 16, 9, 0, 0).unwrap();
        SystemPrompt::assemble(&config.prompts, &now).unwrap()
    }

    fn service(moderator: Moderator, provider: ScriptedProvider, tools: ToolSet) -> Arc<ChatService> {
        let dir = TempDir::new().unwrap();
        let config = Config::test_default(dir.path());
        Arc::new(ChatService::new(
            moderator,
            LlmProvider::Scripted(provider),
            tools,
            prompt(),
            &config.chat,
        ))
    }

    fn keyword() -> Moderator {
        let dir = TempDir::new().unwrap();
        let config = Config::test_default(dir.path());
        Moderator::build(&config.moderation, &config.secrets).unwrap()
    }

    fn reply(text: &str) -> StepOutcome {
        StepOutcome { text: text.into(), tool_calls: vec![], finish_reason: Some(FinishReason::Stop) }
    }

    async fn collect(turn: Turn) -> (Vec<UiStreamEvent>, TurnState) {
        let events: Vec<UiStreamEvent> = turn.events.collect().await;
        let state = turn.task.await.unwrap();
        (events, state)
    }

    #[tokio::test]
    async fn hello_reaches_model_with_system_prompt_first() {
        let provider = ScriptedProvider::new(vec![Ok(reply("Hi! How can I help with MBA admissions?"))]);
        let svc = service(keyword(), provider.clone(), ToolSet::disabled());
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "hello")], CancellationToken::new());
        let (events, state) = collect(turn).await;

        assert_eq!(state, TurnState::Finished);
        let seen = provider.conversations();
        assert_eq!(seen.len(), 1);
        let system_count = svc.prompt().messages().len();
        assert!(system_count > 0);
        assert!(seen[0][..system_count].iter().all(|m| matches!(m, ModelMessage::System { .. })));
        assert_eq!(seen[0][system_count], ModelMessage::user("hello"));

        let message = assemble("a", &events).into_message();
        assert_eq!(message.text_content(), "Hi! How can I help with MBA admissions?");
    }

    #[tokio::test]
    async fn flagged_turn_never_calls_model_or_tools() {
        let provider = ScriptedProvider::repeating(reply("should not appear"));
        let tools = ToolSet::new(WebSearch::Fixed(vec![]), VectorSearch::Disabled);
        let svc = service(keyword(), provider.clone(), tools);
        let turn = svc.start_turn(
            vec![UiMessage::user_text("u1", "Where can I get a fake degree?")],
            CancellationToken::new(),
        );
        let (events, state) = collect(turn).await;

        assert_eq!(state, TurnState::Denied);
        assert_eq!(provider.calls(), 0);
        assert_eq!(events, denial_events(ModerationCategory::Illicit.denial_message()));
        let message = assemble("a", &events).into_message();
        assert_eq!(message.parts.len(), 1);
        assert!(message.parts.iter().all(|p| p.as_tool().is_none()));
    }

    #[tokio::test]
    async fn moderation_failure_fails_closed() {
        let provider = ScriptedProvider::repeating(reply("nope"));
        let svc = service(Moderator::Unavailable, provider.clone(), ToolSet::disabled());
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "hi")], CancellationToken::new());
        let (events, state) = collect(turn).await;

        assert_eq!(state, TurnState::Failed);
        assert_eq!(provider.calls(), 0);
        assert!(matches!(&events[1], UiStreamEvent::Error { error_text } if error_text.contains("moderation")));
        assert!(matches!(events.last(), Some(UiStreamEvent::Finish { .. })));
    }

    #[tokio::test]
    async fn cancel_during_moderation_stops_turn() {
        let provider = ScriptedProvider::repeating(reply("nope"));
        let svc = service(Moderator::Pending, provider.clone(), ToolSet::disabled());
        let cancel = CancellationToken::new();
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "hi")], cancel.clone());
        tokio::task::yield_now().await;
        cancel.cancel();

        let (events, state) = tokio::time::timeout(Duration::from_secs(5), collect(turn)).await.unwrap();
        assert_eq!(state, TurnState::Cancelled);
        assert!(events.is_empty());
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn empty_user_text_skips_moderation() {
        let provider = ScriptedProvider::new(vec![Ok(reply("ok"))]);
        let svc = service(Moderator::Unavailable, provider.clone(), ToolSet::disabled());
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "")], CancellationToken::new());
        let (_, state) = collect(turn).await;
        assert_eq!(state, TurnState::Finished);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn tool_round_trip_is_streamed() {
        let call = ToolCall {
            id: "c1".into(),
            name: "vectorDatabaseSearch".into(),
            input: json!({"query": "IIM Lucknow median ctc"}),
        };
        let provider = ScriptedProvider::new(vec![
            Ok(StepOutcome {
                text: String::new(),
                tool_calls: vec![call],
                finish_reason: Some(FinishReason::ToolCalls),
            }),
            Ok(reply("The median CTC is in the brochure.")),
        ]);
        let hit = SearchHit {
            title: "IIML placements".into(),
            url: "https://example.org/iiml".into(),
            snippet: "median".into(),
            score: Some(0.9),
        };
        let tools = ToolSet::new(WebSearch::Disabled, VectorSearch::Fixed(vec![hit]));
        let svc = service(keyword(), provider.clone(), tools);
        let turn = svc.start_turn(
            vec![UiMessage::user_text("u1", "IIM Lucknow median CTC?")],
            CancellationToken::new(),
        );
        let (events, state) = collect(turn).await;

        assert_eq!(state, TurnState::Finished);
        assert_eq!(provider.calls(), 2);
        let message = assemble("a", &events).into_message();
        let tool = message.parts.iter().find_map(|p| p.as_tool()).unwrap();
        assert_eq!(tool.tool_name, "vectorDatabaseSearch");
        assert_eq!(tool.state, "output-available");
        assert_eq!(message.text_content(), "The median CTC is in the brochure.");
    }

    #[tokio::test]
    async fn provider_error_ends_turn_failed() {
        let provider = ScriptedProvider::new(vec![Err(crate::llm::ProviderError::Request("502".into()))]);
        let svc = service(keyword(), provider, ToolSet::disabled());
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "hi")], CancellationToken::new());
        let (events, state) = collect(turn).await;
        assert_eq!(state, TurnState::Failed);
        assert!(events.iter().any(|e| matches!(e, UiStreamEvent::Error { .. })));
    }

    #[tokio::test]
    async fn dropped_stream_cancels_turn() {
        let provider = ScriptedProvider::repeating(reply("again and again"));
        let svc = service(keyword(), provider, ToolSet::disabled());
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "hi")], CancellationToken::new());
        let Turn { events, task, .. } = turn;
        drop(events);
        assert_eq!(task.await.unwrap(), TurnState::Cancelled);
    }

    #[tokio::test]
    async fn cancelled_token_stops_turn() {
        let provider = ScriptedProvider::repeating(reply("text"));
        let svc = service(keyword(), provider, ToolSet::disabled());
        let cancel = CancellationToken::new();
        cancel.cancel();
        let turn = svc.start_turn(vec![UiMessage::user_text("u1", "hi")], cancel);
        let (_, state) = collect(turn).await;
        assert_eq!(state, TurnState::Cancelled);
    }

    #[test]
    fn default_denial_used_without_category() {
        let result = crate::moderation::ModerationResult::flagged(None);
        assert_eq!(result.denial_text(), DEFAULT_DENIAL_MESSAGE);
        assert!(TurnState::Denied.is_terminal());
        assert!(!TurnState::Streaming.is_terminal());
    }
}
