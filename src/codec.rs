//! Line codec for the wire protocol
//!
//! Every logical message is one compact JSON object followed by a single
//! newline. Encoding is deterministic; decoding distinguishes malformed
//! input from every other failure in the crate.

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Decode failure for a single input line
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("message is not a JSON object")]
    NotAnObject,
}

/// Encode a message as one compact JSON line, terminated by exactly one newline.
pub fn encode<T: Serialize>(message: &T) -> Result<String, serde_json::Error> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode one input line into a message value.
///
/// Messages must be JSON objects so the dispatcher can inspect their `type`
/// field; any other JSON value is rejected alongside malformed text.
pub fn decode(line: &str) -> Result<Value, DecodeError> {
    let value: Value = serde_json::from_str(line)?;
    if value.is_object() {
        Ok(value)
    } else {
        Err(DecodeError::NotAnObject)
    }
}
