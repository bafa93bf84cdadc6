//! Step runner
//!
//! Drives one dialog step end-to-end: invokes the agent capability with a
//! log snapshot and the admitted input, relays the streamed output through
//! the session's streaming channel, interleaves timed messages at chunk
//! boundaries, and emits the terminal markers. The turn gate is released
//! exactly once per step, and the client always receives the step
//! terminator for any accepted input, even on agent failure.

use std::time::Duration;

use futures::StreamExt;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, warn};

use crate::agent::{Agent, AgentError, StepEvent, StepInput};
use crate::dialog::channel::StreamChannel;
use crate::dialog::envelope::Envelope;
use crate::dialog::schedule::TimedQueue;
use crate::errors::gateway_error::GatewayResult;
use crate::session::Session;
use crate::session::log::Turn;

/// Terminal state of one dialog step.
#[derive(Debug)]
pub enum StepOutcome {
    /// The step ran to completion; `responses` counts the `end_of_response`
    /// markers sent.
    Completed { responses: usize },
    /// The agent errored or overran the deadline. Terminators were still
    /// sent and a neutral failure turn was appended.
    Failed { error: AgentError },
    /// The transport went away mid-step. The step was aborted, pending
    /// input dropped and the session marked for teardown.
    Disconnected,
}

/// Run one dialog step for `session`. The caller must have acquired the
/// input through the session's turn gate, which is `StepActive` for the
/// duration of this call.
pub async fn run_step(
    session: &Session,
    agent: &dyn Agent,
    input: StepInput,
    channel: &StreamChannel,
    deadline: Duration,
) -> StepOutcome {
    let deadline_at = Instant::now() + deadline;
    debug!(
        session_id = %session.id(),
        agent = agent.name(),
        deadline_secs = deadline.as_secs_f64(),
        "Dialog step starting"
    );

    let mut run = StepRun {
        session,
        channel,
        timed: TimedQueue::default(),
        stream_start: None,
        completed: Vec::new(),
        responses: 0,
    };

    let history = session.log().snapshot();
    let mut stream = match timeout_at(deadline_at, agent.run_step(history, input)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(error)) => return run.fail(error).await,
        Err(_) => return run.fail(deadline_error(deadline)).await,
    };

    loop {
        let event = match timeout_at(deadline_at, stream.next()).await {
            Ok(Some(Ok(event))) => event,
            Ok(Some(Err(error))) => return run.fail(error).await,
            Ok(None) => break,
            Err(_) => return run.fail(deadline_error(deadline)).await,
        };
        if run.handle(event).await.is_err() {
            return run.disconnect();
        }
    }

    run.finish().await
}

fn deadline_error(deadline: Duration) -> AgentError {
    AgentError::new(format!(
        "step deadline of {:.1}s exceeded",
        deadline.as_secs_f64()
    ))
}

struct StepRun<'a> {
    session: &'a Session,
    channel: &'a StreamChannel,
    /// Timed messages of the response currently streaming.
    timed: TimedQueue,
    /// Set when the first chunk of the current response is forwarded.
    stream_start: Option<Instant>,
    /// Assistant turns collected from completed responses, appended to the
    /// log when the step ends.
    completed: Vec<Turn>,
    responses: usize,
}

impl StepRun<'_> {
    async fn handle(&mut self, event: StepEvent) -> GatewayResult<()> {
        match event {
            StepEvent::ResponseStart { timed } => {
                // Stragglers from the previous response go out before the
                // new response's chunks begin.
                self.flush_timed().await?;
                self.timed = TimedQueue::new(timed);
                self.stream_start = None;
            }
            StepEvent::Audio(bytes) => {
                self.emit_due().await?;
                self.channel.send_binary(bytes).await?;
            }
            StepEvent::Text(text) => {
                self.emit_due().await?;
                self.channel.send_json(Envelope::text_chunk(&text)).await?;
            }
            StepEvent::Message(envelope) => {
                // Out-of-band auxiliary, forwarded the moment it is
                // produced; channel order is preserved.
                self.channel.send_json(envelope).await?;
            }
            StepEvent::UserText(text) => {
                self.session.log().append(Turn::user(text));
            }
            StepEvent::ResponseEnd {
                text,
                context,
                messages,
            } => {
                self.flush_timed().await?;
                for message in messages {
                    self.channel.send_json(message).await?;
                }
                self.channel.send_json(Envelope::end_of_response()).await?;
                self.completed.push(Turn::assistant(text, context));
                self.responses += 1;
                self.stream_start = None;
            }
        }
        Ok(())
    }

    /// Chunk-boundary poll: start the response clock on the first chunk and
    /// emit every timed message whose offset has elapsed, before the chunk.
    async fn emit_due(&mut self) -> GatewayResult<()> {
        let now = Instant::now();
        let start = *self.stream_start.get_or_insert(now);
        for message in self.timed.due(now.duration_since(start)) {
            self.channel.send_json(message).await?;
        }
        Ok(())
    }

    /// Unfired timed messages are flushed, never dropped.
    async fn flush_timed(&mut self) -> GatewayResult<()> {
        for message in self.timed.flush() {
            self.channel.send_json(message).await?;
        }
        Ok(())
    }

    /// Clean completion: commit assistant turns, send the step terminator,
    /// release the gate.
    async fn finish(mut self) -> StepOutcome {
        self.session.gate().begin_drain();
        self.commit_turns();
        if self
            .channel
            .send_json(Envelope::end_of_dialog_step(None))
            .await
            .is_err()
        {
            return self.disconnect();
        }
        self.session.gate().release();
        info!(
            session_id = %self.session.id(),
            responses = self.responses,
            "Dialog step completed"
        );
        StepOutcome::Completed {
            responses: self.responses,
        }
    }

    /// Agent failure or deadline overrun: the client still gets both
    /// terminators and the log records a neutral failure turn. No retry;
    /// a retry is a new client-initiated input.
    async fn fail(mut self, error: AgentError) -> StepOutcome {
        warn!(
            session_id = %self.session.id(),
            error = %error,
            "Dialog step failed"
        );
        self.session.gate().begin_drain();
        self.commit_turns();
        self.session.log().append(Turn::no_response(&error.to_string()));

        // Pending timed messages still go out before the terminators.
        if self.flush_timed().await.is_err() {
            return self.disconnect();
        }
        let sent = async {
            self.channel.send_json(Envelope::end_of_response()).await?;
            self.channel
                .send_json(Envelope::end_of_dialog_step(Some(&error.to_string())))
                .await
        }
        .await;
        if sent.is_err() {
            return self.disconnect();
        }
        self.session.gate().release();
        StepOutcome::Failed { error }
    }

    /// Transport gone: abort the step, drop pending input, mark the session
    /// for teardown. No terminators; there is nobody to receive them.
    fn disconnect(mut self) -> StepOutcome {
        warn!(session_id = %self.session.id(), "Transport disconnected mid-step");
        self.commit_turns();
        self.session.gate().abort();
        self.session.kill();
        StepOutcome::Disconnected
    }

    fn commit_turns(&mut self) {
        for turn in self.completed.drain(..) {
            self.session.log().append(turn);
        }
    }
}
