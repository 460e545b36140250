//! TCP listener and shutdown orchestration
//!
//! `Server` binds the listening socket, spawns one task per accepted
//! connection, and coordinates graceful shutdown: close the socket, cancel
//! every registered connection, wait for the drain, clear the registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::{oneshot, Notify};
use tokio::task::{JoinHandle, JoinSet};

use crate::dispatch::Dispatcher;
use crate::error::{Result, ServerError};
use crate::server::connection::ConnectionHandler;
use crate::server::registry::{ClientHandle, ClientRegistry};

/// Line-protocol server over one listening socket
pub struct Server {
    host: String,
    port: u16,
    dispatcher: Arc<dyn Dispatcher>,
    registry: Arc<ClientRegistry>,
    drain_timeout: Option<Duration>,
    running: Option<Running>,
}

/// Live state between start() and stop()
struct Running {
    local_addr: SocketAddr,
    shutdown: Arc<Notify>,
    accept_closed: oneshot::Receiver<()>,
    accept_task: JoinHandle<()>,
}

impl Drop for Running {
    fn drop(&mut self) {
        // Aborting the accept task drops its JoinSet, which aborts every
        // connection task still running
        self.accept_task.abort();
    }
}

impl Server {
    /// Create a server that will bind `host:port` and hand every decoded
    /// message to `dispatcher`
    pub fn new(host: impl Into<String>, port: u16, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            host: host.into(),
            port,
            dispatcher,
            registry: Arc::new(ClientRegistry::new()),
            drain_timeout: None,
            running: None,
        }
    }

    /// Bound the shutdown drain: connections still live after `timeout` are
    /// aborted instead of awaited. The default is an unbounded drain.
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Bind the listening socket and begin accepting connections.
    ///
    /// Returns once the socket is listening; connections are served on
    /// background tasks. Fails if the address cannot be bound or the server
    /// is already running. A stopped server may be started again.
    pub async fn start(&mut self) -> Result<()> {
        if self.running.is_some() {
            return Err(ServerError::AlreadyStarted);
        }

        let addr = format!("{}:{}", self.host, self.port);
        let listener = TcpListener::bind((self.host.as_str(), self.port))
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ServerError::Bind { addr, source })?;

        let shutdown = Arc::new(Notify::new());
        let (closed_tx, closed_rx) = oneshot::channel();
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&shutdown),
            closed_tx,
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
        ));

        self.running = Some(Running {
            local_addr,
            shutdown,
            accept_closed: closed_rx,
            accept_task,
        });
        tracing::info!("Listening on {}", local_addr);
        Ok(())
    }

    /// Gracefully shut the server down. Idempotent; a no-op before start().
    ///
    /// Sequence: close the listening socket, snapshot the registry, cancel
    /// every member, wait for all connection tasks to finish cleanup
    /// (bounded by the drain timeout if one was configured), clear the
    /// registry. Accepting stops before cancellation begins, so no new
    /// handle can appear during the drain.
    pub async fn stop(&mut self) {
        let mut running = match self.running.take() {
            Some(running) => running,
            None => return,
        };
        tracing::info!("Stopping server on {}", running.local_addr);

        running.shutdown.notify_one();
        let _ = (&mut running.accept_closed).await;

        let clients = self.registry.snapshot();
        tracing::debug!("Cancelling {} active connection(s)", clients.len());
        for client in &clients {
            client.cancel();
        }

        self.await_drain(&mut running).await;
        self.registry.clear();
        tracing::info!("Server stopped");
    }

    /// Wait for the accept task, which in turn drains every connection task
    async fn await_drain(&self, running: &mut Running) {
        match self.drain_timeout {
            None => {
                if let Err(e) = (&mut running.accept_task).await {
                    tracing::error!("Accept task failed: {}", e);
                }
            }
            Some(limit) => match tokio::time::timeout(limit, &mut running.accept_task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!("Accept task failed: {}", e),
                Err(_) => {
                    tracing::warn!(
                        "Drain did not finish within {:?}; aborting {} remaining connection(s)",
                        limit,
                        self.registry.len()
                    );
                    running.accept_task.abort();
                    let _ = (&mut running.accept_task).await;
                }
            },
        }
    }

    /// Address actually bound, once running (binding port 0 picks a free one)
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|running| running.local_addr)
    }

    /// Number of currently registered connections
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }
}

/// Accept loop: owns the listening socket and every connection task.
///
/// On shutdown it closes the socket, confirms over `closed_tx`, then drains
/// its JoinSet; awaiting this task therefore waits for every connection
/// handler to reach terminal cleanup.
async fn accept_loop(
    listener: TcpListener,
    shutdown: Arc<Notify>,
    closed_tx: oneshot::Sender<()>,
    registry: Arc<ClientRegistry>,
    dispatcher: Arc<dyn Dispatcher>,
) {
    let mut connections = JoinSet::new();

    loop {
        tokio::select! {
            _ = shutdown.notified() => break,

            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    let handle = ClientHandle::new(peer);
                    tracing::info!("Client {} connected from {}", handle.id(), peer);
                    // Register before the handler task exists so shutdown
                    // can always reach it
                    registry.register(handle.clone());
                    let conn = ConnectionHandler::new(
                        stream,
                        handle,
                        Arc::clone(&dispatcher),
                        Arc::clone(&registry),
                    );
                    connections.spawn(conn.run());
                }
                Err(e) => {
                    tracing::error!("Failed to accept connection: {}", e);
                }
            },

            // Reap finished connection tasks as we go
            Some(finished) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = finished {
                    tracing::error!("Connection task failed: {}", e);
                }
            }
        }
    }

    // Close the listening socket before confirming, so nothing can be
    // accepted once stop() proceeds to cancellation
    drop(listener);
    let _ = closed_tx.send(());

    while let Some(finished) = connections.join_next().await {
        if let Err(e) = finished {
            tracing::error!("Connection task failed during drain: {}", e);
        }
    }
}
