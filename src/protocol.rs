//! Wire protocol control messages
//!
//! Defines the JSON envelopes the server itself emits: the `ready` greeting
//! and the `error` envelope for recoverable faults. Everything else on the
//! wire is produced by the dispatcher as untyped JSON values.

use serde::{Deserialize, Serialize};

/// Server-emitted control envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Greeting sent immediately after a connection is accepted
    Ready,
    /// Recoverable failure surfaced to the client
    Error { reason: String },
}

impl ControlMessage {
    /// Build an error envelope from any displayable reason
    pub fn error(reason: impl Into<String>) -> Self {
        Self::Error {
            reason: reason.into(),
        }
    }
}
