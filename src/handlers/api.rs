//! REST API handlers
//!
//! Session lifecycle endpoints plus the two out-of-band input paths. Input
//! submitted here goes through the session's turn gate exactly like input
//! arriving on the WebSocket, so the single-active-step invariant holds no
//! matter which surface the client uses.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::agent::StepInput;
use crate::dialog::envelope::Envelope;
use crate::errors::gateway_error::{GatewayError, GatewayResult};
use crate::session::{Modality, SessionId};
use crate::state::AppState;

/// Health check endpoint
///
/// Returns basic service information. Used by load balancers and deployment
/// probes; always unauthenticated.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "dialog-gateway",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[derive(Debug, Deserialize)]
pub struct CreateSessionParams {
    #[serde(default)]
    pub modality: Modality,
}

#[derive(Debug, Serialize)]
pub struct SessionCreated {
    pub session_id: SessionId,
    pub modality: Modality,
}

/// Create a new dialog session
///
/// `POST /sessions?modality=audio|text`
///
/// The session starts with an empty dialog log and no streaming channel;
/// the client connects to `/ws/{session_id}` to bind one.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CreateSessionParams>,
) -> (StatusCode, Json<SessionCreated>) {
    let session = state.sessions.create(params.modality);
    (
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id(),
            modality: session.modality(),
        }),
    )
}

/// Submit an action message for a session
///
/// `POST /sessions/{session_id}/respond`
///
/// The body is a single JSON object with a mandatory `type` field. The
/// message is queued through the turn gate and processed as its own dialog
/// step once any in-flight step has finished.
pub async fn respond(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    Json(body): Json<Value>,
) -> GatewayResult<(StatusCode, Json<Value>)> {
    let session = state.sessions.get(&session_id)?;
    let envelope =
        Envelope::try_from(body).map_err(|e| GatewayError::MalformedInput(e.to_string()))?;

    session.gate().submit(StepInput::Action(envelope))?;
    session.touch();
    debug!(
        %session_id,
        pending = session.gate().pending_len(),
        "Action message queued"
    );
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))))
}

/// Submit an audio input for a session
///
/// `POST /sessions/{session_id}/audio`
///
/// The raw request body is the audio payload, forwarded to the agent
/// capability untouched.
pub async fn upload_audio(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
    body: Bytes,
) -> GatewayResult<(StatusCode, Json<Value>)> {
    if body.is_empty() {
        return Err(GatewayError::MalformedInput(
            "empty audio payload".to_string(),
        ));
    }
    let session = state.sessions.get(&session_id)?;
    session.gate().submit(StepInput::Audio(body))?;
    session.touch();
    Ok((StatusCode::ACCEPTED, Json(json!({ "status": "queued" }))))
}

/// Stop a session
///
/// `DELETE /sessions/{session_id}`
///
/// Drops pending input, asks the transport to close and removes the session
/// from the registry. Stopping is idempotent from the client's perspective
/// only in that a second call reports not-found.
pub async fn stop_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<SessionId>,
) -> GatewayResult<Json<Value>> {
    state.sessions.remove(&session_id)?;
    info!(%session_id, "Session stopped by client");
    Ok(Json(json!({ "status": "stopped" })))
}
