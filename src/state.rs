//! Shared application state

use std::sync::Arc;

use crate::agent::Agent;
use crate::config::ServerConfig;
use crate::session::registry::SessionRegistry;

/// State shared by every handler: the configuration, the session registry
/// and the one agent capability the gateway is wired to.
pub struct AppState {
    pub config: ServerConfig,
    pub sessions: Arc<SessionRegistry>,
    pub agent: Arc<dyn Agent>,
}

impl AppState {
    pub fn new(config: ServerConfig, agent: Arc<dyn Agent>) -> Arc<Self> {
        let sessions = Arc::new(SessionRegistry::new(config.max_pending_inputs));
        Arc::new(Self {
            config,
            sessions,
            agent,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("sessions", &self.sessions.len())
            .field("agent", &self.agent.name())
            .finish()
    }
}
