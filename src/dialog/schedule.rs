//! Timed message scheduling
//!
//! Auxiliary messages can be tagged with a target offset in seconds from the
//! start of a response stream. The step runner polls [`TimedQueue::due`] at
//! each chunk boundary, so delivery precision is chunk-granular by design:
//! a message is never emitted before its offset has elapsed, and never later
//! than the end of the response that introduced it.
//!
//! No timer task is involved; this is a pure data structure.

use std::time::Duration;

use crate::agent::TimedMessage;
use crate::dialog::envelope::Envelope;

/// Pending timed messages for one in-flight response, ordered by
/// (offset, insertion order).
#[derive(Debug, Default)]
pub struct TimedQueue {
    pending: Vec<TimedMessage>,
}

impl TimedQueue {
    /// Build a queue from the messages attached to a response. The input
    /// order is remembered so equal offsets fire in insertion order.
    pub fn new(mut messages: Vec<TimedMessage>) -> Self {
        // Stable sort keeps insertion order among equal offsets.
        messages.sort_by_key(|m| m.offset);
        Self { pending: messages }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Remove and return every message whose offset has elapsed.
    pub fn due(&mut self, elapsed: Duration) -> Vec<Envelope> {
        let split = self.pending.partition_point(|m| m.offset <= elapsed);
        self.pending
            .drain(..split)
            .map(|m| m.message)
            .collect()
    }

    /// Drain the remainder unconditionally. Called when the owning response
    /// completes, or before a newer response's chunks begin.
    pub fn flush(&mut self) -> Vec<Envelope> {
        self.pending.drain(..).map(|m| m.message).collect()
    }
}
