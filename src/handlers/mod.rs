//! HTTP and WebSocket request handlers
//!
//! This module organizes all API handlers into logical groups:
//! - `api` - Session lifecycle and input submission REST endpoints
//! - `ws` - The per-session streaming WebSocket

pub mod api;
pub mod ws;

// Re-export commonly used handlers for convenient access
pub use ws::ws_dialog_handler;
