//! Gateway error taxonomy
//!
//! Every failure the protocol surfaces to a caller maps onto one of these
//! variants. Transport and capacity errors are recovered locally and returned
//! as synchronous rejections; agent failures are absorbed into the step
//! outcome and never propagate as process-level faults.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::session::SessionId;

/// Result alias used throughout the gateway.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors surfaced by the dialog protocol.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Operation referenced an unknown or expired session id.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// The pending-input queue bound was exceeded; the input was discarded.
    #[error("pending input queue full (limit {limit})")]
    CapacityExceeded { limit: usize },

    /// The streaming channel write failed; the client is assumed gone.
    #[error("streaming channel disconnected")]
    Disconnected,

    /// The agent capability errored or exceeded its per-step deadline.
    #[error("agent step failed: {0}")]
    AgentStepFailure(String),

    /// Inbound JSON was missing the mandatory `type` field or was not an
    /// object. Rejected at the boundary, never enqueued.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A session may bind exactly one streaming channel.
    #[error("session already has a bound streaming channel")]
    ChannelAlreadyBound,
}

impl GatewayError {
    /// HTTP status the error maps to at the REST boundary.
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::CapacityExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            GatewayError::Disconnected => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::AgentStepFailure(_) => StatusCode::BAD_GATEWAY,
            GatewayError::MalformedInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::ChannelAlreadyBound => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}
