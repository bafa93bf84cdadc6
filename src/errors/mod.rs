//! Error types for the dialog gateway.

pub mod gateway_error;

pub use gateway_error::{GatewayError, GatewayResult};
