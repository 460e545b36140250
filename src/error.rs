//! Error types for linewire

use thiserror::Error;

/// Main error type for linewire server operations
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server is already running")]
    AlreadyStarted,

    #[error("Connection I/O error: {0}")]
    ConnectionIo(#[from] std::io::Error),

    #[error("Failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type alias for linewire server operations
pub type Result<T> = std::result::Result<T, ServerError>;
