//! Per-connection handler
//!
//! Drives the greeting and the read → decode → dispatch → write cycle for
//! one client, then cleans up on every exit path: peer disconnect, fatal
//! transport error, or cancellation from shutdown.

use std::sync::Arc;

use futures_util::FutureExt;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use crate::codec;
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::protocol::ControlMessage;
use crate::server::registry::{ClientHandle, ClientRegistry};

/// State machine for a single client connection
pub(crate) struct ConnectionHandler {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    handle: ClientHandle,
    dispatcher: Arc<dyn Dispatcher>,
    registry: Arc<ClientRegistry>,
}

impl ConnectionHandler {
    pub(crate) fn new(
        stream: TcpStream,
        handle: ClientHandle,
        dispatcher: Arc<dyn Dispatcher>,
        registry: Arc<ClientRegistry>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer: write_half,
            handle,
            dispatcher,
            registry,
        }
    }

    /// Serve the connection to completion.
    ///
    /// Cancellation races the serve loop, so a shutdown request interrupts
    /// whichever suspension point the handler is parked at. Cleanup runs
    /// exactly once on every path.
    pub(crate) async fn run(mut self) {
        let cancel = self.handle.cancel_signal();
        tokio::select! {
            _ = cancel.notified() => {
                tracing::debug!("Client {} cancelled by shutdown", self.handle.id());
            }
            result = self.serve() => match result {
                Ok(()) => tracing::info!("Client {} disconnected", self.handle.id()),
                Err(e) => tracing::warn!("Client {} connection error: {}", self.handle.id(), e),
            },
        }
        self.cleanup().await;
    }

    /// Greeting, then the read loop.
    ///
    /// Only transport failures escape; malformed lines (non-UTF-8 bytes
    /// included) and dispatcher failures are answered with error envelopes
    /// and the loop continues. Request n+1 is never read before the
    /// response to request n (or its deliberate absence) has been fully
    /// written.
    async fn serve(&mut self) -> Result<()> {
        self.send(&ControlMessage::Ready).await?;

        loop {
            let line = match self.lines.next_line().await {
                Ok(Some(line)) => line,
                // Peer closed the stream
                Ok(None) => return Ok(()),
                // A non-UTF-8 line is undecodable input, not a transport
                // failure; the reader has already consumed it, so the loop
                // can keep going
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::debug!(
                        "Client {} sent a non-UTF-8 line: {}",
                        self.handle.id(),
                        e
                    );
                    self.send(&ControlMessage::error("invalid_json")).await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let message = match codec::decode(&line) {
                Ok(message) => message,
                Err(e) => {
                    tracing::debug!(
                        "Client {} sent an undecodable line: {}",
                        self.handle.id(),
                        e
                    );
                    self.send(&ControlMessage::error("invalid_json")).await?;
                    continue;
                }
            };

            let kind = message.get("type").and_then(Value::as_str).unwrap_or("?");
            tracing::debug!("Client {} request type: {}", self.handle.id(), kind);

            if let Some(response) = self.dispatch(message).await {
                self.send(&response).await?;
            }
        }
    }

    /// Invoke the dispatcher, containing failures and panics.
    ///
    /// The dispatcher is foreign code; neither an error nor a panic from it
    /// may take the connection down or leak into other connections.
    async fn dispatch(&self, message: Value) -> Option<Value> {
        let outcome = std::panic::AssertUnwindSafe(self.dispatcher.handle(message))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                tracing::warn!("Client {} handler failure: {:#}", self.handle.id(), e);
                Some(json!({"type": "error", "reason": e.to_string()}))
            }
            Err(panic) => {
                let reason = panic_reason(&*panic);
                tracing::error!("Client {} handler panicked: {}", self.handle.id(), reason);
                Some(json!({"type": "error", "reason": reason}))
            }
        }
    }

    async fn send<T: serde::Serialize>(&mut self, message: &T) -> Result<()> {
        let line = codec::encode(message)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Close the stream and drop the registry entry; close errors are logged,
    /// never propagated
    async fn cleanup(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            tracing::debug!("Client {} stream close failed: {}", self.handle.id(), e);
        }
        self.registry.unregister(self.handle.id());
    }
}

/// Best-effort text from a panic payload
fn panic_reason(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = panic.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = panic.downcast_ref::<String>() {
        text.clone()
    } else {
        "handler panicked".to_string()
    }
}
