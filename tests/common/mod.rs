//! Shared test fixtures: scripted agent capabilities with controllable
//! timing and failure behavior.

use std::collections::VecDeque;
use std::time::Duration;

use async_stream::stream;
use async_trait::async_trait;
use parking_lot::Mutex;

use dialog_gateway::{Agent, AgentError, StepEvent, StepInput, StepStream, Turn};

/// One scripted item in a step's event sequence.
#[derive(Debug)]
pub enum ScriptItem {
    /// Yield this event.
    Event(StepEvent),
    /// Sleep before yielding the next event (paused-clock friendly).
    Delay(Duration),
    /// Yield an agent error, ending the stream.
    Fail(String),
}

/// An agent that replays pre-recorded step scripts in order, one script per
/// `run_step` call, and records what it was called with.
#[derive(Default)]
pub struct ScriptedAgent {
    scripts: Mutex<VecDeque<Vec<ScriptItem>>>,
    calls: Mutex<Vec<(Vec<Turn>, String)>>,
}

impl ScriptedAgent {
    pub fn new(scripts: Vec<Vec<ScriptItem>>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// (history length, input kind) per call, in call order.
    pub fn calls(&self) -> Vec<(usize, String)> {
        self.calls
            .lock()
            .iter()
            .map(|(history, kind)| (history.len(), kind.clone()))
            .collect()
    }
}

fn input_kind(input: &StepInput) -> String {
    match input {
        StepInput::Audio(_) => "audio".to_string(),
        StepInput::Action(envelope) => format!("action:{}", envelope.message_type()),
        StepInput::Opening => "opening".to_string(),
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn run_step(
        &self,
        history: Vec<Turn>,
        input: StepInput,
    ) -> Result<StepStream, AgentError> {
        self.calls.lock().push((history, input_kind(&input)));
        let script = self
            .scripts
            .lock()
            .pop_front()
            .ok_or_else(|| AgentError::new("no script left for this step"))?;

        Ok(Box::pin(stream! {
            for item in script {
                match item {
                    ScriptItem::Event(event) => yield Ok(event),
                    ScriptItem::Delay(duration) => tokio::time::sleep(duration).await,
                    ScriptItem::Fail(message) => {
                        yield Err(AgentError::new(message));
                        return;
                    }
                }
            }
        }))
    }
}

/// An agent whose `run_step` call itself fails.
pub struct RefusingAgent;

#[async_trait]
impl Agent for RefusingAgent {
    fn name(&self) -> &str {
        "refusing"
    }

    async fn run_step(
        &self,
        _history: Vec<Turn>,
        _input: StepInput,
    ) -> Result<StepStream, AgentError> {
        Err(AgentError::new("model unavailable"))
    }
}

/// An agent whose stream never yields, to exercise the step deadline.
pub struct StallingAgent;

#[async_trait]
impl Agent for StallingAgent {
    fn name(&self) -> &str {
        "stalling"
    }

    async fn run_step(
        &self,
        _history: Vec<Turn>,
        _input: StepInput,
    ) -> Result<StepStream, AgentError> {
        Ok(Box::pin(stream! {
            futures::future::pending::<()>().await;
            // unreachable, but fixes the stream's item type
            yield Err(AgentError::new("unreachable"));
        }))
    }
}
