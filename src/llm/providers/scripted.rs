//! Test provider that replays a fixed list of step outcomes and records
//! every conversation it was called with.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::llm::{ModelEvent, ModelMessage, ProviderError, StepOutcome};

#[derive(Debug, Clone)]
pub struct ScriptedProvider {
    inner: Arc<Mutex<Script>>,
}

#[derive(Debug)]
struct Script {
    steps: VecDeque<Result<StepOutcome, ProviderError>>,
    repeat: Option<StepOutcome>,
    seen: Vec<Vec<ModelMessage>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Result<StepOutcome, ProviderError>>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script { steps: steps.into(), repeat: None, seen: Vec::new() })),
        }
    }

    /// Answers every step with the same outcome.
    pub fn repeating(outcome: StepOutcome) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Script {
                steps: VecDeque::new(),
                repeat: Some(outcome),
                seen: Vec::new(),
            })),
        }
    }

    pub fn calls(&self) -> usize {
        self.inner.lock().unwrap().seen.len()
    }

    pub fn conversations(&self) -> Vec<Vec<ModelMessage>> {
        self.inner.lock().unwrap().seen.clone()
    }

    pub async fn step(
        &self,
        conversation: &[ModelMessage],
        tx: &mpsc::Sender<ModelEvent>,
    ) -> Result<StepOutcome, ProviderError> {
        let next = {
            let mut script = self.inner.lock().unwrap();
            script.seen.push(conversation.to_vec());
            match script.steps.pop_front() {
                Some(step) => step,
                None => script
                    .repeat
                    .clone()
                    .ok_or_else(|| ProviderError::Request("script exhausted".into())),
            }
        }?;
        if !next.text.is_empty() {
            let _ = tx.send(ModelEvent::TextDelta(next.text.clone())).await;
        }
        Ok(next)
    }
}
