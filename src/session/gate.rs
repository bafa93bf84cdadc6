//! Turn gate
//!
//! Per-session concurrency guard enforcing the single-active-step invariant.
//! Submissions are accepted at any time and absorbed by a FIFO queue; the
//! one consumer (the session's step driver) acquires inputs through
//! [`TurnGate::next_input`], which is the only path into `StepActive`.
//!
//! State machine:
//!
//! ```text
//! Idle --next_input--> StepActive --begin_drain--> Draining --release--> Idle
//! ```
//!
//! `release` immediately hands out the next queued input on the following
//! `next_input` call, in submission order. Inputs are never merged or
//! reordered.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;

use crate::agent::StepInput;
use crate::errors::gateway_error::{GatewayError, GatewayResult};

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    /// No step running, input would start one.
    Idle,
    /// A step runner owns the session; new input is queued.
    StepActive,
    /// Terminal markers are being flushed before returning to idle.
    Draining,
}

#[derive(Debug)]
struct GateInner {
    state: GateState,
    pending: VecDeque<StepInput>,
}

/// Per-session turn gate with a bounded pending-input queue.
#[derive(Debug)]
pub struct TurnGate {
    inner: Mutex<GateInner>,
    notify: Notify,
    /// `None` means unbounded (the default; depth is still observable via
    /// [`TurnGate::pending_len`] for monitoring).
    max_pending: Option<usize>,
}

impl TurnGate {
    pub fn new(max_pending: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(GateInner {
                state: GateState::Idle,
                pending: VecDeque::new(),
            }),
            notify: Notify::new(),
            max_pending,
        }
    }

    /// Queue an input for processing. Succeeds regardless of gate state;
    /// fails only when the configured queue bound is exceeded, in which case
    /// the input is discarded.
    pub fn submit(&self, input: StepInput) -> GatewayResult<()> {
        {
            let mut inner = self.inner.lock();
            if let Some(limit) = self.max_pending {
                if inner.pending.len() >= limit {
                    return Err(GatewayError::CapacityExceeded { limit });
                }
            }
            inner.pending.push_back(input);
        }
        self.notify.notify_one();
        Ok(())
    }

    /// Wait for the next input. Resolves only when the gate is idle and an
    /// input is queued; acquiring it moves the gate to `StepActive`. There
    /// must be at most one caller per session.
    pub async fn next_input(&self) -> StepInput {
        loop {
            let notified = self.notify.notified();
            if let Some(input) = self.try_acquire() {
                return input;
            }
            notified.await;
        }
    }

    fn try_acquire(&self) -> Option<StepInput> {
        let mut inner = self.inner.lock();
        if inner.state != GateState::Idle {
            return None;
        }
        let input = inner.pending.pop_front()?;
        inner.state = GateState::StepActive;
        Some(input)
    }

    /// The agent has signaled completion; terminal markers are about to be
    /// flushed.
    pub fn begin_drain(&self) {
        let mut inner = self.inner.lock();
        if inner.state == GateState::StepActive {
            inner.state = GateState::Draining;
        }
    }

    /// The step terminator has been sent; return to idle and wake the
    /// consumer if more input is queued.
    pub fn release(&self) {
        {
            let mut inner = self.inner.lock();
            inner.state = GateState::Idle;
        }
        self.notify.notify_one();
    }

    /// Abort the current step and discard all pending input. Used when the
    /// transport disconnects and the client is assumed gone.
    pub fn abort(&self) {
        let mut inner = self.inner.lock();
        inner.state = GateState::Idle;
        inner.pending.clear();
    }

    pub fn state(&self) -> GateState {
        self.inner.lock().state
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn audio(tag: &[u8]) -> StepInput {
        StepInput::Audio(Bytes::copy_from_slice(tag))
    }

    fn tag_of(input: &StepInput) -> Vec<u8> {
        match input {
            StepInput::Audio(b) => b.to_vec(),
            _ => panic!("expected audio input"),
        }
    }

    #[tokio::test]
    async fn test_single_step_lifecycle() {
        let gate = TurnGate::new(None);
        assert_eq!(gate.state(), GateState::Idle);

        gate.submit(audio(b"a")).unwrap();
        let input = gate.next_input().await;
        assert_eq!(tag_of(&input), b"a");
        assert_eq!(gate.state(), GateState::StepActive);

        gate.begin_drain();
        assert_eq!(gate.state(), GateState::Draining);
        gate.release();
        assert_eq!(gate.state(), GateState::Idle);
    }

    #[tokio::test]
    async fn test_submissions_queue_while_active_in_fifo_order() {
        let gate = TurnGate::new(None);
        gate.submit(audio(b"a")).unwrap();
        let first = gate.next_input().await;
        assert_eq!(tag_of(&first), b"a");

        // queued while the step is active, no second acquisition possible
        gate.submit(audio(b"b")).unwrap();
        gate.submit(audio(b"c")).unwrap();
        assert_eq!(gate.pending_len(), 2);
        assert!(gate.try_acquire().is_none());

        gate.begin_drain();
        gate.release();
        assert_eq!(tag_of(&gate.next_input().await), b"b");
        gate.begin_drain();
        gate.release();
        assert_eq!(tag_of(&gate.next_input().await), b"c");
    }

    #[tokio::test]
    async fn test_capacity_bound_rejects_overflow() {
        let gate = TurnGate::new(Some(2));
        gate.submit(audio(b"a")).unwrap();
        gate.submit(audio(b"b")).unwrap();
        let err = gate.submit(audio(b"c")).unwrap_err();
        assert!(matches!(err, GatewayError::CapacityExceeded { limit: 2 }));
        // the rejected input was discarded, not queued
        assert_eq!(gate.pending_len(), 2);
    }

    #[tokio::test]
    async fn test_next_input_wakes_on_submit() {
        use std::sync::Arc;

        let gate = Arc::new(TurnGate::new(None));
        let waiter = {
            let gate = gate.clone();
            tokio::spawn(async move { tag_of(&gate.next_input().await) })
        };
        tokio::task::yield_now().await;
        gate.submit(audio(b"x")).unwrap();
        assert_eq!(waiter.await.unwrap(), b"x");
    }

    #[tokio::test]
    async fn test_abort_clears_pending() {
        let gate = TurnGate::new(None);
        gate.submit(audio(b"a")).unwrap();
        let _active = gate.next_input().await;
        gate.submit(audio(b"b")).unwrap();

        gate.abort();
        assert_eq!(gate.state(), GateState::Idle);
        assert_eq!(gate.pending_len(), 0);
    }
}
