//! IPC integration tests — validates codec→dispatch→registry→signal round-trip.

use confsync::bus::SignalBus;
use confsync::client::{self, ClientCache, ClientSettings};
use confsync::ipc::codec::{
    read_frame, write_frame, MSG_ERROR, MSG_REQUEST, MSG_RESPONSE, MSG_SIGNAL, MSG_STREAM_END,
};
use confsync::ipc::{IpcClient, IpcServer};
use confsync::registry::{NoopStore, ObjectRegistry};
use confsync::types::AppId;
use confsync::{loader, ConfigRecord, Error, IpcConfig, Value};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;

const APP1: &str = "/prefix/app1";

/// Helper: spin up an IpcServer on a random port with the given registry.
async fn start_server(registry: ObjectRegistry) -> (std::net::SocketAddr, Arc<IpcServer>) {
    start_server_with(registry, IpcConfig::default()).await
}

async fn start_server_with(
    registry: ObjectRegistry,
    ipc_config: IpcConfig,
) -> (std::net::SocketAddr, Arc<IpcServer>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = Arc::new(IpcServer::new(Arc::new(registry), ipc_config));
    let serving = server.clone();
    tokio::spawn(async move {
        let _ = serving.serve_on(listener).await;
    });

    (addr, server)
}

/// Helper: server holding `{"Timeout": 500, "TimeoutPhrase": "hello"}` at /prefix/app1.
async fn start_scenario_server() -> (std::net::SocketAddr, Arc<IpcServer>) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("app1.json"),
        r#"{"Timeout": 500, "TimeoutPhrase": "hello"}"#,
    )
    .unwrap();

    let entries = loader::scan_directory(dir.path()).unwrap();
    let registry = ObjectRegistry::build(
        "/prefix",
        entries,
        Arc::new(SignalBus::new()),
        Arc::new(NoopStore),
    )
    .unwrap();
    start_server(registry).await
}

fn scenario_record(timeout: i64) -> ConfigRecord {
    [
        ("Timeout", Value::Integer(timeout)),
        ("TimeoutPhrase", Value::from("hello")),
    ]
    .into_iter()
    .collect()
}

/// Helper: send a raw request frame, receive and decode the reply.
async fn round_trip(
    stream: &mut TcpStream,
    path: &str,
    method: &str,
    body: serde_json::Value,
) -> (u8, serde_json::Value) {
    let request = serde_json::json!({
        "id": "test-1",
        "path": path,
        "method": method,
        "body": body,
    });
    let payload = rmp_serde::to_vec_named(&request).unwrap();
    write_frame(stream, MSG_REQUEST, &payload).await.unwrap();
    read_reply(stream).await
}

async fn read_reply(stream: &mut TcpStream) -> (u8, serde_json::Value) {
    let (msg_type, payload) = read_frame(stream, 1024 * 1024).await.unwrap().unwrap();
    (msg_type, rmp_serde::from_slice(&payload).unwrap())
}

fn error_code(response: &serde_json::Value) -> &str {
    response["error"]["code"].as_str().unwrap()
}

// =============================================================================
// Request/response
// =============================================================================

#[tokio::test]
async fn test_change_then_get_scenario() {
    let (addr, _server) = start_scenario_server().await;
    let mut client = IpcClient::connect(addr).await.unwrap();

    assert_eq!(client.get_configuration(APP1).await.unwrap(), scenario_record(500));

    client
        .change_configuration(APP1, "Timeout", &Value::Integer(750))
        .await
        .unwrap();

    assert_eq!(client.get_configuration(APP1).await.unwrap(), scenario_record(750));
}

#[tokio::test]
async fn test_raw_change_reply_is_empty() {
    let (addr, _server) = start_scenario_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let (msg_type, response) = round_trip(
        &mut stream,
        APP1,
        "ChangeConfiguration",
        serde_json::json!({"key": "Timeout", "value": 750}),
    )
    .await;

    assert_eq!(msg_type, MSG_RESPONSE);
    assert_eq!(response["ok"], serde_json::json!(true));
    assert_eq!(response["id"], serde_json::json!("test-1"));
    assert_eq!(response["body"], serde_json::json!({}));
}

#[tokio::test]
async fn test_unknown_key_leaves_record_unchanged() {
    let (addr, _server) = start_scenario_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    let (msg_type, response) = round_trip(
        &mut stream,
        APP1,
        "ChangeConfiguration",
        serde_json::json!({"key": "Unknown", "value": 1}),
    )
    .await;
    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(response["ok"], serde_json::json!(false));
    assert_eq!(error_code(&response), "KEY_NOT_FOUND");

    let (msg_type, response) =
        round_trip(&mut stream, APP1, "GetConfiguration", serde_json::json!({})).await;
    assert_eq!(msg_type, MSG_RESPONSE);
    assert_eq!(
        response["body"],
        serde_json::json!({"Timeout": 500, "TimeoutPhrase": "hello"})
    );
}

#[tokio::test]
async fn test_unknown_object_returns_error() {
    let (addr, _server) = start_scenario_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    for method in ["GetConfiguration", "ChangeConfiguration", "Subscribe"] {
        let (msg_type, response) = round_trip(
            &mut stream,
            "/prefix/nonexistent",
            method,
            serde_json::json!({"key": "Timeout", "value": 1}),
        )
        .await;
        assert_eq!(msg_type, MSG_ERROR, "{method}");
        assert_eq!(error_code(&response), "OBJECT_NOT_FOUND", "{method}");
    }

    // The connection stays usable after request-level errors.
    let (msg_type, _) = round_trip(&mut stream, APP1, "GetConfiguration", serde_json::json!({})).await;
    assert_eq!(msg_type, MSG_RESPONSE);
}

#[tokio::test]
async fn test_typed_client_errors() {
    let (addr, _server) = start_scenario_server().await;
    let mut client = IpcClient::connect(addr).await.unwrap();

    let err = client
        .change_configuration(APP1, "Unknown", &Value::Integer(1))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::KeyNotFound(ref k) if k == "Unknown"));

    let err = client.get_configuration("/prefix/nonexistent").await.unwrap_err();
    assert!(matches!(err, Error::ObjectNotFound(ref p) if p == "/prefix/nonexistent"));
}

#[tokio::test]
async fn test_change_may_switch_value_type() {
    let (addr, _server) = start_scenario_server().await;
    let mut client = IpcClient::connect(addr).await.unwrap();

    client
        .change_configuration(APP1, "Timeout", &Value::Float(1.5))
        .await
        .unwrap();

    let record = client.get_configuration(APP1).await.unwrap();
    assert_eq!(record.get("Timeout"), Some(&Value::Float(1.5)));
}

#[tokio::test]
async fn test_unexpected_message_type() {
    let (addr, _server) = start_scenario_server().await;
    let mut stream = TcpStream::connect(addr).await.unwrap();

    write_frame(&mut stream, MSG_RESPONSE, b"").await.unwrap();
    let (msg_type, response) = read_reply(&mut stream).await;

    assert_eq!(msg_type, MSG_ERROR);
    assert_eq!(error_code(&response), "INVALID_ARGUMENT");
}

// =============================================================================
// Signals
// =============================================================================

#[tokio::test]
async fn test_subscribers_receive_full_snapshot() {
    let (addr, _server) = start_scenario_server().await;

    let mut first = IpcClient::connect(addr).await.unwrap().subscribe(APP1).await.unwrap();
    let mut second = IpcClient::connect(addr).await.unwrap().subscribe(APP1).await.unwrap();

    let mut client = IpcClient::connect(addr).await.unwrap();
    client
        .change_configuration(APP1, "Timeout", &Value::Integer(750))
        .await
        .unwrap();

    for stream in [&mut first, &mut second] {
        let signal = tokio::time::timeout(Duration::from_secs(5), stream.next_signal())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert_eq!(signal.path, APP1);
        assert_eq!(signal.member, "configurationChanged");
        assert_eq!(signal.record, scenario_record(750));
    }
}

#[tokio::test]
async fn test_raw_subscribe_ack_then_signal() {
    let (addr, _server) = start_scenario_server().await;
    let mut sub = TcpStream::connect(addr).await.unwrap();

    let (msg_type, ack) = round_trip(
        &mut sub,
        APP1,
        "Subscribe",
        serde_json::json!({"subscriber_id": "raw-sub"}),
    )
    .await;
    assert_eq!(msg_type, MSG_RESPONSE);
    assert_eq!(ack["body"]["subscriber_id"], serde_json::json!("raw-sub"));

    let mut client = IpcClient::connect(addr).await.unwrap();
    client
        .change_configuration(APP1, "TimeoutPhrase", &Value::from("bye"))
        .await
        .unwrap();

    let (msg_type, frame) = read_reply(&mut sub).await;
    assert_eq!(msg_type, MSG_SIGNAL);
    assert_eq!(frame["id"], serde_json::json!("test-1"));
    assert_eq!(
        frame["body"]["record"],
        serde_json::json!({"Timeout": 500, "TimeoutPhrase": "bye"})
    );
}

#[tokio::test]
async fn test_failed_change_emits_nothing() {
    let (addr, _server) = start_scenario_server().await;
    let mut stream = IpcClient::connect(addr).await.unwrap().subscribe(APP1).await.unwrap();

    let mut client = IpcClient::connect(addr).await.unwrap();
    let _ = client
        .change_configuration(APP1, "Unknown", &Value::Integer(1))
        .await;
    client
        .change_configuration(APP1, "Timeout", &Value::Integer(600))
        .await
        .unwrap();

    // The first signal seen is from the successful change.
    let signal = stream.next_signal().await.unwrap().unwrap();
    assert_eq!(signal.record, scenario_record(600));
}

#[tokio::test]
async fn test_shutdown_ends_signal_stream() {
    let (addr, server) = start_scenario_server().await;
    let mut sub = TcpStream::connect(addr).await.unwrap();
    let (msg_type, _) = round_trip(&mut sub, APP1, "Subscribe", serde_json::json!({})).await;
    assert_eq!(msg_type, MSG_RESPONSE);

    server.shutdown();

    let (msg_type, _) = tokio::time::timeout(Duration::from_secs(5), read_reply(&mut sub))
        .await
        .unwrap();
    assert_eq!(msg_type, MSG_STREAM_END);
}

#[tokio::test]
async fn test_disconnected_subscribers_release_their_slots() {
    let bus = Arc::new(SignalBus::new());
    let registry = ObjectRegistry::build(
        "/prefix",
        vec![(AppId::derive("app1").unwrap(), scenario_record(500))],
        bus.clone(),
        Arc::new(NoopStore),
    )
    .unwrap();
    let ipc_config = IpcConfig {
        max_connections: 3,
        ..IpcConfig::default()
    };
    let (addr, _server) = start_server_with(registry, ipc_config).await;

    let mut subscribers = Vec::new();
    for _ in 0..3 {
        let mut sub = TcpStream::connect(addr).await.unwrap();
        let (msg_type, _) = round_trip(&mut sub, APP1, "Subscribe", serde_json::json!({})).await;
        assert_eq!(msg_type, MSG_RESPONSE);
        subscribers.push(sub);
    }
    assert_eq!(bus.get_stats().await.active_subscribers, 3);

    // No change is ever published, so only the closed sockets can free the slots.
    drop(subscribers);

    tokio::time::timeout(Duration::from_secs(5), async {
        while bus.get_stats().await.active_subscribers > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    // Connection slots are released along with the subscriptions.
    let record = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(mut client) = IpcClient::connect(addr).await {
                if let Ok(record) = client.get_configuration(APP1).await {
                    return record;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(record, scenario_record(500));
}

// =============================================================================
// Client cache end-to-end
// =============================================================================

async fn wait_for<F>(cache: &ClientCache, mut done: F)
where
    F: FnMut(&confsync::client::CacheSnapshot) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if done(&cache.snapshot().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn test_client_cache_follows_server_changes() {
    let (addr, _server) = start_scenario_server().await;

    let cache = Arc::new(ClientCache::new(ClientSettings {
        interval_ms: 500,
        phrase: "hello".to_string(),
    }));
    let stream = IpcClient::connect(addr).await.unwrap().subscribe(APP1).await.unwrap();
    let listener = tokio::spawn(client::listen(stream, cache.clone()));

    let mut ctl = IpcClient::connect(addr).await.unwrap();
    ctl.change_configuration(APP1, "TimeoutPhrase", &Value::from("changed"))
        .await
        .unwrap();
    wait_for(&cache, |s| s.phrase == "changed").await;
    assert_eq!(cache.snapshot().await.interval_ms, 500);

    ctl.change_configuration(APP1, "Timeout", &Value::Integer(750))
        .await
        .unwrap();
    wait_for(&cache, |s| s.interval_ms == 750).await;
    assert_eq!(cache.snapshot().await.phrase, "changed");

    listener.abort();
}

#[tokio::test]
async fn test_listener_fails_when_server_stops() {
    let (addr, server) = start_scenario_server().await;

    let cache = Arc::new(ClientCache::new(ClientSettings {
        interval_ms: 500,
        phrase: "hello".to_string(),
    }));
    let stream = IpcClient::connect(addr).await.unwrap().subscribe(APP1).await.unwrap();
    let listener = tokio::spawn(client::listen(stream, cache));

    server.shutdown();

    let result = tokio::time::timeout(Duration::from_secs(5), listener)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(result, Err(Error::Transport(_))));
}
