//! Session state
//!
//! A [`Session`] is one client's logical connection lifetime: its dialog
//! log, its turn gate, and the one streaming channel it may bind. Sessions
//! are owned by the [`registry::SessionRegistry`]; per-session state is only
//! ever mutated by that session's own turn gate and step runner.

pub mod gate;
pub mod log;
pub mod registry;

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, SystemTime};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use uuid::Uuid;

use crate::dialog::channel::StreamChannel;
use crate::errors::gateway_error::{GatewayError, GatewayResult};
use gate::TurnGate;
use log::DialogLog;

pub use gate::GateState;

/// Unique session identifier.
pub type SessionId = Uuid;

/// Chat modality of a session, fixed at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    #[default]
    Audio,
}

/// One client connection lifetime.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    modality: Modality,
    created_at: SystemTime,
    last_activity: Mutex<Instant>,
    gate: TurnGate,
    log: DialogLog,
    channel: Mutex<Option<StreamChannel>>,
    killed: AtomicBool,
}

impl Session {
    pub(crate) fn new(modality: Modality, max_pending_inputs: Option<usize>) -> Self {
        Self {
            id: Uuid::new_v4(),
            modality,
            created_at: SystemTime::now(),
            last_activity: Mutex::new(Instant::now()),
            gate: TurnGate::new(max_pending_inputs),
            log: DialogLog::new(),
            channel: Mutex::new(None),
            killed: AtomicBool::new(false),
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn gate(&self) -> &TurnGate {
        &self.gate
    }

    pub fn log(&self) -> &DialogLog {
        &self.log
    }

    /// Record client or server activity, deferring the idle sweep.
    pub fn touch(&self) {
        *self.last_activity.lock() = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_activity.lock().elapsed()
    }

    /// Bind the session's one streaming channel. A session with a live
    /// channel rejects a second bind; a channel whose transport has gone
    /// away may be replaced by a reconnect.
    pub fn bind_channel(&self, channel: StreamChannel) -> GatewayResult<()> {
        let mut slot = self.channel.lock();
        if let Some(existing) = slot.as_ref() {
            if existing.is_connected() {
                return Err(GatewayError::ChannelAlreadyBound);
            }
        }
        *slot = Some(channel);
        Ok(())
    }

    /// The bound streaming channel, if any. A session with no bound channel
    /// cannot be stepped; input submitted before binding stays queued in
    /// the turn gate.
    pub fn channel(&self) -> Option<StreamChannel> {
        self.channel.lock().clone()
    }

    /// Ask the transport to close, if one is bound.
    pub fn close_channel(&self) {
        if let Some(channel) = self.channel.lock().as_ref() {
            channel.close();
        }
    }

    /// Mark the session for removal on the next sweep.
    pub fn kill(&self) {
        self.killed.store(true, Ordering::Release);
    }

    pub fn is_killed(&self) -> bool {
        self.killed.load(Ordering::Acquire)
    }
}
