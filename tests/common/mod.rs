//! Common test utilities for linewire integration tests
//!
//! This module provides:
//! - `start_server` for launching a server on an ephemeral loopback port
//! - `TestClient`, a line-oriented client speaking the wire protocol
//! - `ScriptedDispatcher` with on-demand failure modes

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

use linewire::{Dispatcher, Server};

/// Start a server on an ephemeral port and return it with its bound address
pub async fn start_server(dispatcher: Arc<dyn Dispatcher>) -> (Server, SocketAddr) {
    let mut server = Server::new("127.0.0.1", 0, dispatcher);
    server.start().await.expect("server should start");
    let addr = server
        .local_addr()
        .expect("started server should expose its address");
    (server, addr)
}

/// Line-oriented client for driving the server over real TCP
pub struct TestClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestClient {
    /// Connect and consume the ready greeting
    pub async fn connect(addr: SocketAddr) -> Self {
        let mut client = Self::connect_raw(addr).await;
        let ready = client.recv().await;
        assert_eq!(ready["type"], "ready", "greeting should come first");
        client
    }

    /// Connect without consuming the greeting
    pub async fn connect_raw(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr)
            .await
            .expect("connect should succeed");
        let (read_half, writer) = stream.into_split();
        Self {
            lines: BufReader::new(read_half).lines(),
            writer,
        }
    }

    /// Send one JSON message as a single line
    pub async fn send(&mut self, message: &Value) {
        self.send_raw(&message.to_string()).await;
    }

    /// Send one raw line, which need not be valid JSON
    pub async fn send_raw(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\n", line).as_bytes())
            .await
            .expect("write should succeed");
        self.writer.flush().await.expect("flush should succeed");
    }

    /// Send one raw line given as bytes, which need not be valid UTF-8
    pub async fn send_bytes(&mut self, line: &[u8]) {
        let mut framed = line.to_vec();
        framed.push(b'\n');
        self.writer
            .write_all(&framed)
            .await
            .expect("write should succeed");
        self.writer.flush().await.expect("flush should succeed");
    }

    /// Receive and decode the next response line
    pub async fn recv(&mut self) -> Value {
        let line = self
            .lines
            .next_line()
            .await
            .expect("read should succeed")
            .expect("server closed the connection before responding");
        serde_json::from_str(&line).expect("server should emit valid JSON")
    }

    /// Wait for the server to close this connection
    pub async fn expect_closed(&mut self) {
        match self.lines.next_line().await {
            Ok(None) => {}
            Ok(Some(line)) => panic!("expected close, got line: {line}"),
            // A reset from a torn-down peer also counts as closed.
            Err(_) => {}
        }
    }
}

/// Dispatcher with scripted behavior keyed on the `payload` field.
///
/// `"explode"` fails the dispatch, `"panic"` panics inside the handler,
/// `"void"` produces no response, `"hang"` stalls at an await for a minute,
/// and `"block"` holds the worker thread itself for 600 milliseconds.
/// Anything else echoes back.
pub struct ScriptedDispatcher;

#[async_trait]
impl Dispatcher for ScriptedDispatcher {
    async fn handle(&self, message: Value) -> anyhow::Result<Option<Value>> {
        let payload = message.get("payload").cloned().unwrap_or(Value::Null);
        match payload.as_str() {
            Some("explode") => anyhow::bail!("scripted failure"),
            Some("panic") => panic!("scripted panic"),
            Some("void") => Ok(None),
            Some("hang") => {
                tokio::time::sleep(Duration::from_secs(60)).await;
                Ok(None)
            }
            Some("block") => {
                // No await inside, so cancellation cannot take effect
                // until the call returns
                std::thread::sleep(Duration::from_millis(600));
                Ok(None)
            }
            _ => Ok(Some(json!({"type": "echo", "payload": payload}))),
        }
    }
}
