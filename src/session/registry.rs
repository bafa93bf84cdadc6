//! Session registry
//!
//! Creates, looks up and expires sessions. Registry operations are safe for
//! concurrent access from any task; the state inside each session is still
//! only touched by that session's own turn gate and step runner.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::errors::gateway_error::{GatewayError, GatewayResult};
use crate::session::{Modality, Session, SessionId};

/// Concurrent map of live sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<SessionId, Arc<Session>>,
    max_pending_inputs: Option<usize>,
}

impl SessionRegistry {
    pub fn new(max_pending_inputs: Option<usize>) -> Self {
        Self {
            sessions: DashMap::new(),
            max_pending_inputs,
        }
    }

    /// Create a session with an empty log and an idle turn gate.
    pub fn create(&self, modality: Modality) -> Arc<Session> {
        let session = Arc::new(Session::new(modality, self.max_pending_inputs));
        self.sessions.insert(session.id(), session.clone());
        info!(session_id = %session.id(), ?modality, "Session created");
        session
    }

    pub fn get(&self, id: &SessionId) -> GatewayResult<Arc<Session>> {
        self.sessions
            .get(id)
            .map(|entry| entry.clone())
            .ok_or(GatewayError::SessionNotFound(*id))
    }

    /// Update the session's last-activity time.
    pub fn touch(&self, id: &SessionId) -> GatewayResult<()> {
        self.get(id)?.touch();
        Ok(())
    }

    /// Remove a session, closing its streaming channel first.
    pub fn remove(&self, id: &SessionId) -> GatewayResult<()> {
        let (_, session) = self
            .sessions
            .remove(id)
            .ok_or(GatewayError::SessionNotFound(*id))?;
        session.kill();
        session.gate().abort();
        session.close_channel();
        info!(session_id = %id, "Session removed");
        Ok(())
    }

    /// Remove every session that is marked killed or has been idle longer
    /// than `threshold`. Returns the number of sessions removed.
    pub fn expire_idle(&self, threshold: Duration) -> usize {
        let expired: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.is_killed() || entry.idle_for() > threshold)
            .map(|entry| entry.id())
            .collect();

        for id in &expired {
            if let Some((_, session)) = self.sessions.remove(id) {
                let reason = if session.is_killed() {
                    "marked for removal"
                } else {
                    "inactive"
                };
                session.kill();
                session.gate().abort();
                session.close_channel();
                info!(session_id = %id, reason, "Session expired");
            }
        }
        expired.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Periodic sweep removing killed and idle sessions. Runs for the lifetime
/// of the server.
pub async fn run_cleanup(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    idle_threshold: Duration,
) {
    info!(
        interval_secs = interval.as_secs(),
        idle_threshold_secs = idle_threshold.as_secs(),
        "Starting periodic session cleanup"
    );
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let removed = registry.expire_idle(idle_threshold);
        if removed > 0 {
            debug!(removed, live = registry.len(), "Session cleanup pass");
        }
    }
}
