//! Dialog log
//!
//! Append-only ordered history of the turns a session has consumed and
//! produced. Turns are immutable once appended; the log never reorders or
//! edits assistant text in place. Agents receive an owned snapshot, so the
//! live log is structurally out of their reach.
//!
//! The log never contains system-role entries, and there is no guarantee
//! that user and assistant turns alternate: agent handoffs may append
//! several assistant turns in a row, and either role may open the dialog
//! depending on the first-speaker policy.

use std::time::SystemTime;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Author of a logged turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One immutable contribution to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    /// Display text. For assistant turns this is a convenience projection;
    /// the provider's actual context may live in `context`.
    pub content: String,
    /// Opaque provider continuation token (e.g. an audio reference the
    /// agent needs for context). Forwarded untouched, never interpreted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    pub created_at: SystemTime,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            context: None,
            created_at: SystemTime::now(),
        }
    }

    pub fn assistant(content: impl Into<String>, context: Option<Value>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            context,
            created_at: SystemTime::now(),
        }
    }

    /// Neutral assistant turn recorded when a step fails, so the history
    /// reflects that the step happened without inventing content.
    pub fn no_response(error: &str) -> Self {
        Self::assistant(
            String::new(),
            Some(serde_json::json!({ "error": error })),
        )
    }
}

/// Append-only turn history. Single-writer (the session's step runner), but
/// readable concurrently by diagnostics.
#[derive(Debug, Default)]
pub struct DialogLog {
    turns: RwLock<Vec<Turn>>,
}

impl DialogLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn. Always permitted; there is no edit or remove.
    pub fn append(&self, turn: Turn) {
        self.turns.write().push(turn);
    }

    /// An owned, ordered copy of the committed turns. This is the view
    /// handed to agents.
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns.read().clone()
    }

    pub fn len(&self) -> usize {
        self.turns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.read().is_empty()
    }
}
