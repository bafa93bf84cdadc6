//! Dialog WebSocket handler
//!
//! Binds the session's streaming channel to a WebSocket transport and runs
//! the session's step driver for the lifetime of the connection. The socket
//! carries binary frames (audio chunks) downstream and both binary audio and
//! JSON action messages upstream.
//!
//! Three tasks cooperate per connection:
//! - the sender task drains outbound frames onto the socket,
//! - the driver task pulls admitted inputs from the turn gate and runs one
//!   dialog step at a time,
//! - the receive loop (this task) feeds client input into the gate and
//!   watches for idle connections.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::select;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::agent::StepInput;
use crate::dialog::channel::{OutboundFrame, StreamChannel};
use crate::dialog::envelope::Envelope;
use crate::dialog::step::{StepOutcome, run_step};
use crate::errors::gateway_error::GatewayError;
use crate::session::{Session, SessionId};
use crate::state::AppState;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How often we check if the connection is stale
const IDLE_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Dialog WebSocket handler
///
/// `GET /ws/{session_id}`
///
/// Upgrades the HTTP connection and binds it as the session's streaming
/// channel. A session with a live channel rejects a second connection with
/// 409; a session that does not exist rejects with 404.
pub async fn ws_dialog_handler(
    ws: WebSocketUpgrade,
    Path(session_id): Path<SessionId>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let session = match state.sessions.get(&session_id) {
        Ok(session) => session,
        Err(e) => return e.into_response(),
    };

    let (channel, frame_rx) = StreamChannel::new(state.config.channel_buffer_size);
    if let Err(e) = session.bind_channel(channel.clone()) {
        warn!(%session_id, "Rejected second streaming channel bind");
        return e.into_response();
    }

    info!(%session_id, "Dialog WebSocket connection upgrade requested");
    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_dialog_socket(socket, state, session, channel, frame_rx))
}

/// Handle the dialog WebSocket connection
async fn handle_dialog_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    session: Arc<Session>,
    channel: StreamChannel,
    mut frame_rx: mpsc::Receiver<OutboundFrame>,
) {
    let session_id = session.id();
    info!(%session_id, "Dialog WebSocket connection established");
    session.touch();

    let (mut sender, mut receiver) = socket.split();

    // Sender task for outgoing frames
    let sender_task = tokio::spawn(async move {
        while let Some(frame) = frame_rx.recv().await {
            let should_close = matches!(frame, OutboundFrame::Close);

            let result = match frame {
                OutboundFrame::Binary(data) => sender.send(Message::Binary(data)).await,
                OutboundFrame::Json(envelope) => {
                    sender.send(Message::Text(envelope.to_wire().into())).await
                }
                OutboundFrame::Close => sender.send(Message::Close(None)).await,
            };

            if let Err(e) = result {
                debug!("Failed to send WebSocket message: {}", e);
                break;
            }

            if should_close {
                break;
            }
        }
    });

    let cancel = CancellationToken::new();

    // Driver task: one dialog step at a time, inputs admitted by the gate
    let driver_task = {
        let session = session.clone();
        let agent = state.agent.clone();
        let channel = channel.clone();
        let deadline = state.config.step_deadline();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            loop {
                let input = select! {
                    _ = cancel.cancelled() => break,
                    input = session.gate().next_input() => input,
                };
                match run_step(&session, agent.as_ref(), input, &channel, deadline).await {
                    StepOutcome::Disconnected => break,
                    StepOutcome::Completed { .. } | StepOutcome::Failed { .. } => session.touch(),
                }
            }
        })
    };

    // First-speaker policy: the assistant opens the conversation once a
    // channel is bound, but only before any turn exists.
    if state.config.ai_speaks_first
        && session.log().is_empty()
        && let Err(e) = session.gate().submit(StepInput::Opening)
    {
        warn!(%session_id, error = %e, "Failed to queue opening step");
    }

    let idle_timeout = state.config.idle_timeout();
    loop {
        select! {
            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(msg)) => {
                        session.touch();
                        if !process_client_message(msg, &session, &channel).await {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(%session_id, "Dialog WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(%session_id, "Dialog WebSocket closed by client");
                        break;
                    }
                }
            }
            _ = tokio::time::sleep(IDLE_CHECK_INTERVAL) => {
                if session.idle_for() > idle_timeout {
                    warn!(
                        %session_id,
                        idle_secs = session.idle_for().as_secs(),
                        "Closing idle dialog connection"
                    );
                    break;
                }
            }
        }
    }

    // Teardown: dropping the frame receiver unblocks a mid-step driver,
    // then the cancel token stops it between steps.
    sender_task.abort();
    cancel.cancel();
    let _ = driver_task.await;
    let _ = state.sessions.remove(&session_id);

    info!(%session_id, "Dialog WebSocket connection terminated");
}

/// Process one incoming WebSocket message. Returns false when the
/// connection should close.
async fn process_client_message(
    msg: Message,
    session: &Session,
    channel: &StreamChannel,
) -> bool {
    match msg {
        Message::Binary(data) => {
            if let Err(e) = session.gate().submit(StepInput::Audio(data)) {
                report_rejection(session, channel, &e).await;
            }
            true
        }
        Message::Text(text) => {
            let parsed = serde_json::from_str::<Value>(&text)
                .map_err(|e| GatewayError::MalformedInput(e.to_string()))
                .and_then(|value| {
                    Envelope::try_from(value)
                        .map_err(|e| GatewayError::MalformedInput(e.to_string()))
                });
            match parsed {
                Ok(envelope) => {
                    if let Err(e) = session.gate().submit(StepInput::Action(envelope)) {
                        report_rejection(session, channel, &e).await;
                    }
                }
                Err(e) => report_rejection(session, channel, &e).await,
            }
            true
        }
        Message::Close(_) => false,
        // Ping/Pong are answered by the protocol layer
        _ => true,
    }
}

/// A rejected input is reported on the stream; the dialog itself continues.
async fn report_rejection(session: &Session, channel: &StreamChannel, error: &GatewayError) {
    warn!(session_id = %session.id(), error = %error, "Client input rejected");
    let message = json!({ "type": "error", "message": error.to_string() });
    if let Ok(envelope) = Envelope::try_from(message) {
        let _ = channel.send_json(envelope).await;
    }
}
