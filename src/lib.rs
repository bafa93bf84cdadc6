pub mod agent;
pub mod config;
pub mod dialog;
pub mod errors;
pub mod handlers;
pub mod routes;
pub mod session;
pub mod state;

// Re-export commonly used items for convenience
pub use agent::{Agent, AgentError, StepEvent, StepInput, StepStream, TimedMessage};
pub use config::ServerConfig;
pub use dialog::channel::{OutboundFrame, StreamChannel};
pub use dialog::envelope::Envelope;
pub use errors::gateway_error::{GatewayError, GatewayResult};
pub use session::log::{DialogLog, Role, Turn};
pub use session::registry::SessionRegistry;
pub use session::{Modality, Session, SessionId};
pub use state::AppState;
