//! Streaming channel
//!
//! The outbound multiplexed transport abstraction bound to exactly one
//! session. Frames are delivered to the single WebSocket sender task in the
//! exact order `send_*` was called. The channel is bounded: a slow or
//! unreachable client applies backpressure to the step runner instead of
//! growing memory without limit.

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::dialog::envelope::Envelope;
use crate::errors::gateway_error::{GatewayError, GatewayResult};

/// One outbound frame on the session's transport.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Raw binary chunk (audio bytes, opaque to the protocol).
    Binary(Bytes),
    /// JSON envelope with a mandatory `type` field.
    Json(Envelope),
    /// Routing marker: close the transport. Never serialized to the wire.
    Close,
}

/// Sender half of a session's outbound frame path.
///
/// Cloneable so the step runner and the session teardown path can both hold
/// it; ordering is preserved because all clones feed the same queue and only
/// one step runner writes during `STEP_ACTIVE`.
#[derive(Debug, Clone)]
pub struct StreamChannel {
    tx: mpsc::Sender<OutboundFrame>,
}

impl StreamChannel {
    /// Create a channel with the given buffer size, returning the receiver
    /// the WebSocket sender task drains.
    pub fn new(buffer: usize) -> (Self, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self { tx }, rx)
    }

    /// Send a raw binary frame, suspending under backpressure.
    pub async fn send_binary(&self, data: Bytes) -> GatewayResult<()> {
        self.tx
            .send(OutboundFrame::Binary(data))
            .await
            .map_err(|_| GatewayError::Disconnected)
    }

    /// Send a JSON envelope frame, suspending under backpressure.
    pub async fn send_json(&self, envelope: Envelope) -> GatewayResult<()> {
        self.tx
            .send(OutboundFrame::Json(envelope))
            .await
            .map_err(|_| GatewayError::Disconnected)
    }

    /// Ask the sender task to close the transport. Best-effort: a full or
    /// already-disconnected channel means the transport is going away anyway.
    pub fn close(&self) {
        let _ = self.tx.try_send(OutboundFrame::Close);
    }

    /// Whether the sender task is still draining frames.
    pub fn is_connected(&self) -> bool {
        !self.tx.is_closed()
    }
}
