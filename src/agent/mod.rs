//! The agent capability interface
//!
//! Response generation is an external collaborator: anything that can turn
//! (history, input) into a streamed sequence of step events can be plugged
//! in behind [`Agent`]. The gateway never looks inside the content an agent
//! produces; it only relays it and enforces the step protocol around it.
//!
//! A step may contain several responses (for example a quick filler reply
//! followed by a slower lookup-based one). Each response opens with
//! [`StepEvent::ResponseStart`], streams chunks and closes with
//! [`StepEvent::ResponseEnd`]; the end of the event stream ends the step.

pub mod echo;

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::dialog::envelope::Envelope;
use crate::session::log::Turn;

pub use echo::EchoAgent;

/// A unit of work submitted by the client for one dialog step.
#[derive(Debug, Clone)]
pub enum StepInput {
    /// Raw recorded audio, opaque bytes. Transcription is the agent
    /// adapter's concern.
    Audio(Bytes),
    /// A structured action payload with a mandatory `type` field.
    Action(Envelope),
    /// Server-originated kickoff with no client content, used when the
    /// configured first-speaker policy lets the assistant open the dialog.
    Opening,
}

/// An auxiliary message scheduled for delivery at an approximate offset
/// after its response begins streaming.
#[derive(Debug, Clone)]
pub struct TimedMessage {
    /// Offset from the response's stream start. Delivery happens at the
    /// first chunk boundary at or after this offset.
    pub offset: Duration,
    pub message: Envelope,
}

/// One event in the lazy sequence an agent yields for a step.
#[derive(Debug)]
pub enum StepEvent {
    /// A new response begins. Timed messages attached here are clocked from
    /// the first chunk of this response.
    ResponseStart { timed: Vec<TimedMessage> },
    /// An audio chunk, forwarded as a binary frame.
    Audio(Bytes),
    /// An incremental text chunk, forwarded as a `text_chunk` frame.
    Text(String),
    /// An out-of-band auxiliary message, forwarded the moment it is
    /// produced.
    Message(Envelope),
    /// The user's contribution in text form, reported once the adapter has
    /// extracted it (e.g. a transcription). Recorded as the user turn.
    UserText(String),
    /// The current response is complete. `text` is the full assistant text,
    /// `context` an opaque provider continuation token, `messages` the
    /// bundled auxiliaries to send before the response terminator.
    ResponseEnd {
        text: String,
        context: Option<Value>,
        messages: Vec<Envelope>,
    },
}

/// Failure signaled by the agent capability. Absorbed into the step outcome
/// by the runner; never fatal to the server.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{0}")]
pub struct AgentError(pub String);

impl AgentError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// The lazy event sequence produced by one `run_step` call.
pub type StepStream = BoxStream<'static, Result<StepEvent, AgentError>>;

/// External response-generation capability.
///
/// Implementations must be restartable per call: no state may be retained
/// between steps beyond what the caller passes in `history`. The history is
/// an owned snapshot; mutating it has no effect on the session's log.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Human-readable agent name, used in logs.
    fn name(&self) -> &str;

    /// Run one dialog step against the given history and input.
    async fn run_step(
        &self,
        history: Vec<Turn>,
        input: StepInput,
    ) -> Result<StepStream, AgentError>;
}
