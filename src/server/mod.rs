//! Linewire Line-Protocol Server
//!
//! A long-lived TCP daemon that exchanges one JSON object per line with
//! each client and hands every decoded message to a pluggable dispatcher.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                  LINEWIRE SERVER (linewire-daemon)                 │
//! │              one daemon, many concurrent line clients              │
//! ├────────────────────────────────────────────────────────────────────┤
//! │                                                                    │
//! │  TcpListener ──► accept loop (task)                                │
//! │                    │ registers a handle, spawns a handler          │
//! │                    ▼                                               │
//! │  ┌────────────────────────────────────────────────────────────┐    │
//! │  │              ClientRegistry (Mutex<HashMap>)               │    │
//! │  │                                                            │    │
//! │  │  cli_1a2b3c4d ──► ClientHandle { id, peer, cancel }        │    │
//! │  │  cli_9f8e7d6c ──► ClientHandle { ... }                     │    │
//! │  └────────────────────────────────────────────────────────────┘    │
//! │                                                                    │
//! │  ConnectionHandler per client (task)                               │
//! │    - read line ─► decode ─► dispatch ─► write response             │
//! │    - strict per-connection request order                           │
//! │    - cancellation races every await                                │
//! │                                                                    │
//! │  stop(): close socket ─► cancel snapshot ─► await drain ─► clear   │
//! │                                                                    │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol
//!
//! All messages are JSON, one object per line:
//!
//! ```json
//! // Server -> Client, immediately on connect
//! {"type": "ready"}
//!
//! // Client -> Server
//! {"type": "echo", "payload": "hi"}
//!
//! // Server -> Client
//! {"type": "echo", "payload": "hi"}
//! {"type": "error", "reason": "unknown_type"}
//! {"type": "error", "reason": "invalid_json"}
//! ```

pub mod listener;
pub mod registry;

mod connection;

pub use listener::Server;
pub use registry::{ClientHandle, ClientId, ClientRegistry};
