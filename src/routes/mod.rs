//! Route definitions for the dialog gateway

pub mod api;
pub mod ws;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;

use crate::handlers;
use crate::state::AppState;

/// Build the full application router: health check, session API and the
/// streaming WebSocket.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(handlers::api::health_check))
        .route("/health", get(handlers::api::health_check))
        .merge(api::create_api_router())
        .merge(ws::create_ws_router())
        .with_state(state)
}
