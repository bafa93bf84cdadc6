//! JSON message envelopes
//!
//! Everything the gateway sends as a text frame is a JSON object with a
//! mandatory string `type` field. Only two `type` values are reserved by the
//! protocol: the response terminator and the dialog-step terminator. All
//! other types are opaque application payloads forwarded byte-for-byte as
//! produced by the agent or orchestrator.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::errors::gateway_error::GatewayError;

/// Reserved `type`: one response within the step has finished; more
/// responses may follow before the step terminator.
pub const END_OF_RESPONSE: &str = "end_of_response";

/// Reserved `type`: the dialog step is complete and the server will accept
/// new input again. The casing is part of the wire protocol.
pub const END_OF_DIALOG_STEP: &str = "END_OF_DIALOG_STEP";

/// Incremental text chunk frame, the text-modality counterpart of a binary
/// audio chunk.
pub const TEXT_CHUNK: &str = "text_chunk";

/// A JSON object guaranteed to carry a string `type` field.
///
/// The payload beyond the `type` discriminator is intentionally opaque: the
/// protocol never enumerates application message schemas, it only forwards
/// them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Value")]
#[serde(into = "Value")]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Build an envelope from an arbitrary JSON value, enforcing the
    /// mandatory `type` field.
    pub fn from_value(value: Value) -> Result<Self, GatewayError> {
        let Value::Object(map) = value else {
            return Err(GatewayError::MalformedInput(
                "payload must be a JSON object".to_string(),
            ));
        };
        match map.get("type") {
            Some(Value::String(t)) if !t.is_empty() => Ok(Envelope(map)),
            Some(Value::String(_)) => Err(GatewayError::MalformedInput(
                "'type' field must not be empty".to_string(),
            )),
            Some(_) => Err(GatewayError::MalformedInput(
                "'type' field must be a string".to_string(),
            )),
            None => Err(GatewayError::MalformedInput(
                "payload missing 'type' field".to_string(),
            )),
        }
    }

    /// The message type discriminator.
    pub fn message_type(&self) -> &str {
        match self.0.get("type") {
            Some(Value::String(t)) => t,
            // from_value is the only constructor path; the field is always a
            // non-empty string.
            _ => "",
        }
    }

    /// Access to a payload field beyond the discriminator.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_end_of_response(&self) -> bool {
        self.message_type() == END_OF_RESPONSE
    }

    pub fn is_end_of_dialog_step(&self) -> bool {
        self.message_type() == END_OF_DIALOG_STEP
    }

    /// The response terminator frame.
    pub fn end_of_response() -> Self {
        Self::from_value(json!({ "type": END_OF_RESPONSE }))
            .unwrap_or_else(|_| unreachable!("literal envelope"))
    }

    /// The step terminator frame, optionally carrying a server-side error
    /// description so the client can distinguish a failed step from a clean
    /// one.
    pub fn end_of_dialog_step(server_error: Option<&str>) -> Self {
        let value = match server_error {
            Some(err) => json!({ "type": END_OF_DIALOG_STEP, "server_error": err }),
            None => json!({ "type": END_OF_DIALOG_STEP, "server_error": Value::Null }),
        };
        Self::from_value(value).unwrap_or_else(|_| unreachable!("literal envelope"))
    }

    /// An incremental text chunk frame.
    pub fn text_chunk(content: &str) -> Self {
        Self::from_value(json!({ "type": TEXT_CHUNK, "content": content }))
            .unwrap_or_else(|_| unreachable!("literal envelope"))
    }

    /// Serialize to the wire representation.
    pub fn to_wire(&self) -> String {
        // A Map of Values cannot fail to serialize.
        serde_json::to_string(&self.0).unwrap_or_default()
    }
}

impl TryFrom<Value> for Envelope {
    type Error = GatewayError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Envelope::from_value(value)
    }
}

impl From<Envelope> for Value {
    fn from(envelope: Envelope) -> Self {
        Value::Object(envelope.0)
    }
}
