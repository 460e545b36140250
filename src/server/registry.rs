//! Client registry and connection handles
//!
//! Tracks every live connection so shutdown can reach all of them. A handle
//! is a cheap clone carrying identity, peer address, and a cancellation
//! signal; the socket itself stays with the connection handler.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;

/// Unique identifier for one accepted connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    fn generate() -> Self {
        let mut hex = uuid::Uuid::new_v4().simple().to_string();
        hex.truncate(8);
        Self(format!("cli_{}", hex))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Registry-facing view of one live connection
#[derive(Clone)]
pub struct ClientHandle {
    id: ClientId,
    peer: SocketAddr,
    cancel: Arc<Notify>,
}

impl ClientHandle {
    pub(crate) fn new(peer: SocketAddr) -> Self {
        Self {
            id: ClientId::generate(),
            peer,
            cancel: Arc::new(Notify::new()),
        }
    }

    pub fn id(&self) -> &ClientId {
        &self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    /// Ask the owning connection handler to stop at its next suspension point.
    ///
    /// The signal is buffered, so a handler that is not currently suspended
    /// still observes it on its next await.
    pub fn cancel(&self) {
        self.cancel.notify_one();
    }

    pub(crate) fn cancel_signal(&self) -> Arc<Notify> {
        Arc::clone(&self.cancel)
    }
}

/// Set of currently active connections
///
/// A handle is a member exactly while its connection handler is live:
/// inserted by the accept loop before the handler task starts, removed by
/// the handler's own cleanup.
#[derive(Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<ClientId, ClientHandle>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, handle: ClientHandle) {
        self.clients.lock().insert(handle.id.clone(), handle);
    }

    /// Remove a handle by id; safe to call if already removed
    pub fn unregister(&self, id: &ClientId) {
        self.clients.lock().remove(id);
    }

    /// Clone out the current members so callers can iterate without the lock
    pub fn snapshot(&self) -> Vec<ClientHandle> {
        self.clients.lock().values().cloned().collect()
    }

    pub fn clear(&self) {
        self.clients.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.lock().is_empty()
    }
}
