//! Protocol engine integration tests, driven through the in-memory
//! transport.

use std::time::Duration;

use serde_json::{json, Value};

use mnemo_mcp::protocol::ProtocolServer;
use mnemo_mcp::transport::{MemoryClient, MemoryTransport};
use mnemo_mcp::types::{RpcError, ServerIdentity};

// ─────────────────────── helpers ───────────────────────

fn test_server() -> (ProtocolServer<MemoryTransport>, MemoryClient) {
    let (transport, client) = MemoryTransport::pair();
    let server = ProtocolServer::new(transport, ServerIdentity::new("test-server", "0.0.1"));
    (server, client)
}

fn request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

fn notification(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "method": method })
}

/// Dispatch one decoded message and return what (if anything) was sent.
async fn send(
    server: &mut ProtocolServer<MemoryTransport>,
    client: &MemoryClient,
    msg: Value,
) -> Option<Value> {
    let before = client.sent().len();
    server.dispatch(Ok(msg)).await.expect("dispatch failed");
    client.sent().get(before).cloned()
}

async fn send_unwrap(
    server: &mut ProtocolServer<MemoryTransport>,
    client: &MemoryClient,
    msg: Value,
) -> Value {
    send(server, client, msg).await.expect("expected a response")
}

/// Drive the run loop until `expected` frames are sent, then close the
/// inbound channel and let it finish.
async fn run_and_collect(
    mut server: ProtocolServer<MemoryTransport>,
    client: MemoryClient,
    expected: usize,
) -> Vec<Value> {
    let handle = tokio::spawn(async move { server.run().await });
    let mut sent = client.sent();
    for _ in 0..400 {
        if sent.len() >= expected {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        sent = client.sent();
    }
    drop(client);
    handle.await.unwrap().unwrap();
    sent
}

/// Exactly one of result/error — the invariant every outbound response
/// must hold.
fn assert_exclusive(msg: &Value) {
    let has_result = msg.get("result").is_some();
    let has_error = msg.get("error").is_some();
    assert!(
        has_result ^ has_error,
        "response must carry exactly one of result/error: {msg}"
    );
}

// ─────────────────────── handshake ───────────────────────

#[tokio::test]
async fn test_initialize_returns_fixed_identity() {
    let (mut server, client) = test_server();
    let msg = send_unwrap(
        &mut server,
        &client,
        request(1, "initialize", json!({ "protocolVersion": "2024-11-05" })),
    )
    .await;

    assert_eq!(msg["id"], 1);
    assert_eq!(msg["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(msg["result"]["capabilities"], json!({}));
    assert_eq!(msg["result"]["serverInfo"]["name"], "test-server");
    assert_eq!(msg["result"]["serverInfo"]["version"], "0.0.1");
    assert!(server.is_initialized());
}

#[tokio::test]
async fn test_initialize_is_idempotent_in_output() {
    let (mut server, client) = test_server();
    let first = send_unwrap(
        &mut server,
        &client,
        request(1, "initialize", json!({ "protocolVersion": "2024-11-05" })),
    )
    .await;
    let second = send_unwrap(
        &mut server,
        &client,
        request(
            2,
            "initialize",
            json!({ "protocolVersion": "1999-01-01", "capabilities": { "x": {} } }),
        ),
    )
    .await;

    assert_eq!(first["result"], second["result"]);
    assert!(server.is_initialized());
}

#[tokio::test]
async fn test_caller_version_is_ignored() {
    let (mut server, client) = test_server();
    let msg = send_unwrap(
        &mut server,
        &client,
        request(1, "initialize", json!({ "protocolVersion": "9999-12-31" })),
    )
    .await;
    // Always the server's fixed version, never the caller's.
    assert_eq!(msg["result"]["protocolVersion"], "2024-11-05");
}

#[tokio::test]
async fn test_ping_needs_no_handshake() {
    let (mut server, client) = test_server();
    assert!(!server.is_initialized());
    let msg = send_unwrap(&mut server, &client, request(5, "ping", json!({}))).await;
    assert_eq!(msg["result"], json!({ "ok": true }));
    assert!(!server.is_initialized());
}

// ─────────────────────── dispatch ───────────────────────

#[tokio::test]
async fn test_unknown_method_yields_method_not_found() {
    let (mut server, client) = test_server();
    let msg = send_unwrap(
        &mut server,
        &client,
        json!({ "jsonrpc": "2.0", "id": 2, "method": "unknown" }),
    )
    .await;

    assert_eq!(msg["id"], 2);
    assert_eq!(msg["error"]["code"], -32601);
    assert_eq!(msg["error"]["message"], "Method not found");
}

#[tokio::test]
async fn test_notifications_never_get_responses() {
    let (mut server, client) = test_server();

    // Known method, unknown method, failing handler: all silent.
    server.register("explode", |_params, _req| async {
        Err(RpcError::Internal("boom".to_string()))
    });
    for method in ["ping", "no_such_method", "explode"] {
        assert!(send(&mut server, &client, notification(method)).await.is_none());
    }
    assert_eq!(client.sent().len(), 0);
}

#[tokio::test]
async fn test_invalid_envelope_yields_null_id() {
    let (mut server, client) = test_server();
    let msg = send_unwrap(
        &mut server,
        &client,
        json!({ "jsonrpc": "1.0", "id": 99, "method": "initialize" }),
    )
    .await;

    assert_eq!(msg["id"], Value::Null);
    assert_eq!(msg["error"]["code"], -32600);
    assert_eq!(msg["error"]["message"], "Invalid request");
}

#[tokio::test]
async fn test_missing_method_is_invalid_envelope_not_method_not_found() {
    let (mut server, client) = test_server();
    let msg = send_unwrap(&mut server, &client, json!({ "jsonrpc": "2.0", "id": 3 })).await;
    assert_eq!(msg["error"]["code"], -32600);
    assert_eq!(msg["id"], Value::Null);
}

#[tokio::test]
async fn test_null_id_is_a_request_not_a_notification() {
    let (mut server, client) = test_server();
    let msg = send_unwrap(
        &mut server,
        &client,
        json!({ "jsonrpc": "2.0", "id": null, "method": "ping" }),
    )
    .await;
    assert_eq!(msg["id"], Value::Null);
    assert_eq!(msg["result"], json!({ "ok": true }));
}

#[tokio::test]
async fn test_decode_failure_yields_parse_error() {
    let (transport, client) = MemoryTransport::pair();
    let server = ProtocolServer::new(transport, ServerIdentity::new("test-server", "0.0.1"));
    client
        .push_decode_failure(RpcError::Parse("expected value at line 1".to_string()))
        .await;

    let sent = run_and_collect(server, client, 1).await;
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["id"], Value::Null);
    assert_eq!(sent[0]["error"]["code"], -32700);
}

#[tokio::test]
async fn test_handler_failure_maps_to_internal_error() {
    let (mut server, client) = test_server();
    server.register("explode", |_params, _req| async {
        Err(RpcError::Internal("backend unavailable".to_string()))
    });

    let msg = send_unwrap(&mut server, &client, request(7, "explode", json!({}))).await;
    assert_eq!(msg["id"], 7);
    assert_eq!(msg["error"]["code"], -32603);
    assert_eq!(msg["error"]["message"], "backend unavailable");
}

#[tokio::test]
async fn test_tagged_input_failure_keeps_invalid_params_code() {
    let (mut server, client) = test_server();
    server.register("strict", |_params, _req| async {
        Err(RpcError::InvalidParams("uri: is required".to_string()))
    });

    let msg = send_unwrap(&mut server, &client, request(8, "strict", json!({}))).await;
    assert_eq!(msg["error"]["code"], -32602);
    assert!(msg["error"]["message"]
        .as_str()
        .unwrap()
        .contains("uri: is required"));
}

#[tokio::test]
async fn test_untagged_handler_failure_never_leaks_its_code() {
    let (mut server, client) = test_server();
    // A handler sloppily returning a protocol-layer variant still reports
    // as an internal failure.
    server.register("weird", |_params, _req| async {
        Err(RpcError::MethodNotFound("inner".to_string()))
    });

    let msg = send_unwrap(&mut server, &client, request(9, "weird", json!({}))).await;
    assert_eq!(msg["error"]["code"], -32603);
}

#[tokio::test]
async fn test_every_path_upholds_result_error_exclusivity() {
    let (mut server, client) = test_server();
    server.register("explode", |_params, _req| async {
        Err(RpcError::Internal("boom".to_string()))
    });

    let inputs = vec![
        Ok(request(1, "ping", json!({}))),
        Ok(request(2, "nope", json!({}))),
        Ok(json!({ "jsonrpc": "1.0", "id": 3, "method": "ping" })),
        Ok(request(4, "explode", json!({}))),
        Err(RpcError::Parse("garbage".to_string())),
    ];
    for input in inputs {
        server.dispatch(input).await.unwrap();
    }

    let sent = client.sent();
    assert_eq!(sent.len(), 5);
    for msg in &sent {
        assert_exclusive(msg);
        assert_eq!(msg["jsonrpc"], "2.0");
    }
}

#[tokio::test]
async fn test_request_ids_echo_for_every_id_shape() {
    let (mut server, client) = test_server();
    for id in [json!(42), json!("alpha"), json!(null)] {
        let msg = send_unwrap(
            &mut server,
            &client,
            json!({ "jsonrpc": "2.0", "id": id.clone(), "method": "ping" }),
        )
        .await;
        assert_eq!(msg["id"], id);
    }
}

// ─────────────────────── discover ───────────────────────

#[tokio::test]
async fn test_discover_lists_registered_methods() {
    let (mut server, client) = test_server();
    server.register("beta", |_params, _req| async { Ok(Value::Null) });
    server.register("alpha", |_params, _req| async { Ok(Value::Null) });

    let msg = send_unwrap(&mut server, &client, request(1, "rpc.discover", json!({}))).await;
    assert_eq!(
        msg["result"]["methods"],
        json!(["alpha", "beta", "initialize", "ping"])
    );
}

#[tokio::test]
async fn test_discover_works_before_handshake() {
    let (mut server, client) = test_server();
    assert!(!server.is_initialized());
    let msg = send_unwrap(&mut server, &client, request(1, "rpc.discover", json!({}))).await;
    assert_eq!(msg["result"]["methods"], json!(["initialize", "ping"]));
}

#[tokio::test]
async fn test_discover_reflects_overwritten_registrations() {
    let (mut server, client) = test_server();
    server.register("echo", |_params, _req| async { Ok(json!("one")) });
    server.register("echo", |_params, _req| async { Ok(json!("two")) });

    let msg = send_unwrap(&mut server, &client, request(1, "rpc.discover", json!({}))).await;
    assert_eq!(
        msg["result"]["methods"],
        json!(["echo", "initialize", "ping"])
    );

    let msg = send_unwrap(&mut server, &client, request(2, "echo", json!({}))).await;
    assert_eq!(msg["result"], json!("two"));
}

// ─────────────────────── run loop ───────────────────────

#[tokio::test]
async fn test_responses_preserve_request_order() {
    let (transport, client) = MemoryTransport::pair();
    let mut server = ProtocolServer::new(transport, ServerIdentity::new("test-server", "0.0.1"));
    server.register("slow", |_params, _req| async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(json!("slow"))
    });
    server.register("fast", |_params, _req| async { Ok(json!("fast")) });

    client.push(request(10, "slow", json!({}))).await;
    client.push(request(11, "fast", json!({}))).await;

    let sent = run_and_collect(server, client, 2).await;
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0]["id"], 10);
    assert_eq!(sent[0]["result"], json!("slow"));
    assert_eq!(sent[1]["id"], 11);
    assert_eq!(sent[1]["result"], json!("fast"));
}

#[tokio::test]
async fn test_send_failure_propagates_out_of_dispatch() {
    let (mut server, client) = test_server();
    server.stop().await.unwrap();
    let result = server.dispatch(Ok(request(1, "ping", json!({})))).await;
    assert!(result.is_err());
    assert_eq!(client.sent().len(), 0);
}

#[tokio::test]
async fn test_notify_writes_a_notification_frame() {
    let (mut server, client) = test_server();
    server
        .notify("server.ready", Some(json!({})))
        .await
        .unwrap();

    let sent = client.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0]["method"], "server.ready");
    assert_eq!(sent[0]["params"], json!({}));
    assert!(sent[0].get("id").is_none());
}
