use axum::{
    Router,
    routing::{delete, post},
};
use tower_http::trace::TraceLayer;

use crate::handlers::api;
use crate::state::AppState;
use std::sync::Arc;

/// Create the session API router
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(api::create_session))
        .route("/sessions/{session_id}/respond", post(api::respond))
        .route("/sessions/{session_id}/audio", post(api::upload_audio))
        .route("/sessions/{session_id}", delete(api::stop_session))
        .layer(TraceLayer::new_for_http())
}
