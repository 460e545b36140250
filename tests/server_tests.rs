//! Server integration tests
//!
//! End-to-end coverage of the TCP listener, the per-connection protocol
//! loop, the dispatch boundary, and graceful shutdown. Every test drives a
//! real server over loopback TCP using the line-oriented test client.
//!
//! ```bash
//! cargo test --test server_tests
//! ```

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::json;
use tokio::net::TcpStream;
use tokio::time::timeout;

use common::{start_server, ScriptedDispatcher, TestClient};
use linewire::{DefaultDispatcher, RuleDispatcher, RuleStore, Server};

// ============================================================================
// PROTOCOL BASICS
// ============================================================================

#[tokio::test]
async fn test_ready_greeting_is_sent_first() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect_raw(addr).await;
    assert_eq!(client.recv().await, json!({"type": "ready"}));

    server.stop().await;
}

#[tokio::test]
async fn test_echo_round_trip() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"type": "echo", "payload": "hi"})).await;
    assert_eq!(client.recv().await, json!({"type": "echo", "payload": "hi"}));

    client
        .send(&json!({"type": "echo", "payload": {"nested": [1, 2, 3]}}))
        .await;
    assert_eq!(
        client.recv().await,
        json!({"type": "echo", "payload": {"nested": [1, 2, 3]}})
    );

    server.stop().await;
}

#[tokio::test]
async fn test_unrecognized_type_is_reported() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"type": "mystery"})).await;
    assert_eq!(
        client.recv().await,
        json!({"type": "error", "reason": "unknown_type"})
    );

    server.stop().await;
}

#[tokio::test]
async fn test_rule_requests_served_end_to_end() {
    let store = Arc::new(RuleStore::new());
    store.add_parent("bob", "alice");
    store.add_parent("bob", "jack");
    store.add_parent("alice", "sue");
    let dispatcher = RuleDispatcher::new(store, Arc::new(DefaultDispatcher::new()));
    let (mut server, addr) = start_server(Arc::new(dispatcher)).await;

    let mut client = TestClient::connect(addr).await;
    client
        .send(&json!({"type": "rule", "action": "descendants", "who": "bob"}))
        .await;
    assert_eq!(
        client.recv().await,
        json!({"type": "rule_response", "descendants": ["alice", "jack", "sue"]})
    );

    server.stop().await;
}

// ============================================================================
// MALFORMED INPUT
// ============================================================================

#[tokio::test]
async fn test_malformed_line_reports_invalid_json_and_connection_survives() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect(addr).await;
    client.send_raw("{this is not json").await;
    assert_eq!(
        client.recv().await,
        json!({"type": "error", "reason": "invalid_json"})
    );

    client.send(&json!({"type": "echo", "payload": "still here"})).await;
    assert_eq!(client.recv().await["payload"], "still here");

    server.stop().await;
}

#[tokio::test]
async fn test_non_object_and_blank_lines_are_invalid_json() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect(addr).await;
    client.send_raw("42").await;
    assert_eq!(client.recv().await["reason"], "invalid_json");

    client.send_raw("").await;
    assert_eq!(client.recv().await["reason"], "invalid_json");

    client.send(&json!({"type": "echo", "payload": "ok"})).await;
    assert_eq!(client.recv().await["payload"], "ok");

    server.stop().await;
}

#[tokio::test]
async fn test_non_utf8_line_reports_invalid_json_and_connection_survives() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect(addr).await;
    client
        .send_bytes(b"{\"type\": \"echo\", \"payload\": \"\xff\xfe\"}")
        .await;
    assert_eq!(
        client.recv().await,
        json!({"type": "error", "reason": "invalid_json"})
    );

    client.send(&json!({"type": "echo", "payload": "ok again"})).await;
    assert_eq!(client.recv().await["payload"], "ok again");

    server.stop().await;
}

// ============================================================================
// DISPATCH FAILURE CONTAINMENT
// ============================================================================

#[tokio::test]
async fn test_dispatch_failure_is_reported_in_band() {
    let (mut server, addr) = start_server(Arc::new(ScriptedDispatcher)).await;

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"payload": "explode"})).await;
    assert_eq!(
        client.recv().await,
        json!({"type": "error", "reason": "scripted failure"})
    );

    client.send(&json!({"payload": "next"})).await;
    assert_eq!(client.recv().await["payload"], "next");

    server.stop().await;
}

#[tokio::test]
async fn test_handler_panic_does_not_kill_the_connection() {
    let (mut server, addr) = start_server(Arc::new(ScriptedDispatcher)).await;

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"payload": "panic"})).await;
    assert_eq!(
        client.recv().await,
        json!({"type": "error", "reason": "scripted panic"})
    );

    client.send(&json!({"payload": "recovered"})).await;
    assert_eq!(client.recv().await["payload"], "recovered");

    server.stop().await;
}

#[tokio::test]
async fn test_void_response_writes_nothing_and_keeps_order() {
    let (mut server, addr) = start_server(Arc::new(ScriptedDispatcher)).await;

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"payload": "before"})).await;
    client.send(&json!({"payload": "void"})).await;
    client.send(&json!({"payload": "after"})).await;

    assert_eq!(client.recv().await["payload"], "before");
    assert_eq!(client.recv().await["payload"], "after");

    server.stop().await;
}

// ============================================================================
// ORDERING
// ============================================================================

#[tokio::test]
async fn test_single_connection_pipelines_in_fifo_order() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut client = TestClient::connect(addr).await;
    for i in 0..100 {
        client.send(&json!({"type": "echo", "payload": i})).await;
    }
    for i in 0..100 {
        assert_eq!(client.recv().await["payload"], i);
    }

    server.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_connections_are_isolated() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut workers = Vec::new();
    for conn in 0..2 {
        workers.push(tokio::spawn(async move {
            let mut client = TestClient::connect(addr).await;
            for seq in 0..100 {
                client
                    .send(&json!({"type": "echo", "payload": {"conn": conn, "seq": seq}}))
                    .await;
            }
            for seq in 0..100 {
                let response = client.recv().await;
                assert_eq!(response["payload"], json!({"conn": conn, "seq": seq}));
            }
        }));
    }
    for worker in workers {
        worker.await.expect("client worker should finish");
    }

    server.stop().await;
}

// ============================================================================
// SHUTDOWN
// ============================================================================

#[tokio::test]
async fn test_stop_closes_clients_and_clears_registry() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;

    let mut first = TestClient::connect(addr).await;
    let mut second = TestClient::connect(addr).await;
    assert_eq!(server.client_count(), 2);

    server.stop().await;

    first.expect_closed().await;
    second.expect_closed().await;
    assert_eq!(server.client_count(), 0);
    assert!(
        TcpStream::connect(addr).await.is_err(),
        "stopped server should refuse new connections"
    );
}

#[tokio::test]
async fn test_stop_is_idempotent_and_safe_before_start() {
    let mut server = Server::new("127.0.0.1", 0, Arc::new(DefaultDispatcher::new()));
    server.stop().await;

    server.start().await.expect("server should start");
    let addr = server.local_addr().expect("started server has an address");
    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"type": "echo", "payload": 1})).await;
    assert_eq!(client.recv().await["payload"], 1);

    server.stop().await;
    server.stop().await;
    assert_eq!(server.client_count(), 0);
}

#[tokio::test]
async fn test_stop_interrupts_a_hung_dispatcher() {
    let (mut server, addr) = start_server(Arc::new(ScriptedDispatcher)).await;

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"payload": "hang"})).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("stop should finish while a dispatch is in flight");
    client.expect_closed().await;
}

#[tokio::test]
async fn test_server_restarts_after_stop() {
    let (mut server, addr) = start_server(Arc::new(DefaultDispatcher::new())).await;
    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"type": "echo", "payload": "one"})).await;
    assert_eq!(client.recv().await["payload"], "one");
    server.stop().await;

    server.start().await.expect("restart should succeed");
    let addr = server.local_addr().expect("restarted server has an address");
    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"type": "echo", "payload": "two"})).await;
    assert_eq!(client.recv().await["payload"], "two");
    server.stop().await;
}

#[tokio::test]
async fn test_stop_with_drain_timeout_completes() {
    let mut server = Server::new("127.0.0.1", 0, Arc::new(ScriptedDispatcher))
        .with_drain_timeout(Duration::from_millis(100));
    server.start().await.expect("server should start");
    let addr = server.local_addr().expect("started server has an address");

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"payload": "hang"})).await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("stop should finish under its drain policy");
    client.expect_closed().await;
    assert_eq!(server.client_count(), 0);
}

// A dispatch that never yields cannot be cancelled, so the drain must give
// up at the timeout and abort what is left.
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_drain_timeout_expiry_aborts_a_blocked_connection() {
    let mut server = Server::new("127.0.0.1", 0, Arc::new(ScriptedDispatcher))
        .with_drain_timeout(Duration::from_millis(100));
    server.start().await.expect("server should start");
    let addr = server.local_addr().expect("started server has an address");

    let mut client = TestClient::connect(addr).await;
    client.send(&json!({"payload": "block"})).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let begun = Instant::now();
    timeout(Duration::from_secs(5), server.stop())
        .await
        .expect("stop should finish under its drain policy");
    assert!(
        begun.elapsed() < Duration::from_millis(400),
        "stop should abort the blocked dispatch at the timeout, not wait it out"
    );
    assert_eq!(server.client_count(), 0);
}
