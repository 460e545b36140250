//! Linewire: line-oriented JSON message server
//!
//! This library provides a long-lived TCP server that exchanges one JSON
//! object per line with each client. The server owns the transport loop
//! (read, decode, dispatch, encode, write) while message semantics live
//! behind the [`Dispatcher`] trait, so applications plug in their own
//! handling without touching connection management.
//!
//! # Protocol
//!
//! - On connect the server writes `{"type":"ready"}`.
//! - Each request line yields at most one response line, in request order.
//! - Lines that fail to decode produce `{"type":"error","reason":"invalid_json"}`
//!   and the connection keeps serving.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use linewire::{DefaultDispatcher, Server};
//!
//! let mut server = Server::new("127.0.0.1", 31337, Arc::new(DefaultDispatcher::new()));
//! server.start().await?;
//! // ... serve until shutdown ...
//! server.stop().await;
//! ```

pub mod codec;
pub mod dispatch;
pub mod error;
pub mod managers;
pub mod protocol;
pub mod rules;
pub mod server;

// Re-export commonly used types
pub use dispatch::{DefaultDispatcher, Dispatcher};
pub use error::{Result, ServerError};
pub use managers::{PromptManager, ResourceManager, ToolManager};
pub use protocol::ControlMessage;
pub use server::{ClientHandle, ClientId, ClientRegistry, Server};

// Re-export rule helpers
pub use rules::{closure_from_edges, RuleDispatcher, RuleStore};
