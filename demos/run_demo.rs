//! End-to-end demo of the line-oriented JSON server
//!
//! Starts a server wired with a seeded rule store, issues the example
//! requests over real TCP connections, then shuts the server down.
//!
//! Run with: cargo run --example run_demo

use std::net::SocketAddr;
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;

use linewire::{DefaultDispatcher, RuleDispatcher, RuleStore, Server};

/// Open a fresh connection, consume the ready line, send one request and
/// return its response.
async fn send_message(addr: SocketAddr, payload: &Value) -> anyhow::Result<Value> {
    let stream = TcpStream::connect(addr).await?;
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    // The server greets every connection before reading requests.
    let _ready = lines.next_line().await?;

    write_half
        .write_all(format!("{}\n", payload).as_bytes())
        .await?;
    write_half.flush().await?;

    match lines.next_line().await? {
        Some(line) => Ok(serde_json::from_str(&line)?),
        None => anyhow::bail!("connection closed before a response arrived"),
    }
}

/// bob -> alice, bob -> jack, alice -> sue
fn seeded_store() -> Arc<RuleStore> {
    let store = Arc::new(RuleStore::new());
    store.add_parent("bob", "alice");
    store.add_parent("bob", "jack");
    store.add_parent("alice", "sue");
    store.add_male("bob");
    store.add_male("jack");
    store.add_female("alice");
    store.add_female("sue");
    store
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    println!("=== Linewire Rule Server Demo ===\n");

    let dispatcher = RuleDispatcher::new(seeded_store(), Arc::new(DefaultDispatcher::new()));
    let mut server = Server::new("127.0.0.1", 0, Arc::new(dispatcher));
    server.start().await?;
    let addr = match server.local_addr() {
        Some(addr) => addr,
        None => anyhow::bail!("server reported no local address"),
    };
    println!("Server listening on {}\n", addr);

    let requests = [
        (
            "echo response",
            json!({"type": "echo", "payload": "hello demo"}),
        ),
        (
            "descendants of bob",
            json!({"type": "rule", "action": "descendants", "who": "bob"}),
        ),
        (
            "ancestors of sue",
            json!({"type": "rule", "action": "ancestors", "who": "sue"}),
        ),
        (
            "assign role response",
            json!({"type": "rule", "action": "assign_role", "role": "admin", "who": "alice"}),
        ),
        (
            "has_role alice admin",
            json!({"type": "rule", "action": "has_role", "role": "admin", "who": "alice"}),
        ),
    ];

    for (label, request) in &requests {
        let response = send_message(addr, request).await?;
        println!("{}: {}", label, response);
    }

    println!("\nStopping server...");
    server.stop().await;

    println!("=== Demo Complete ===");
    Ok(())
}
