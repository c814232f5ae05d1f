//! End-to-end tests over real WebSocket connections.

use futures_util::{SinkExt, StreamExt};
use pairpad::{config::Config, create_app, AppState};
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::time::{timeout, Duration};
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DEFAULT_CODE: &str = "// Start coding here...\n";

/// Start a server on a free port and return its state and address.
async fn start_test_server() -> (AppState, String) {
    let config = Config {
        default_code: DEFAULT_CODE.to_string(),
        ..Config::default()
    };
    let state = AppState::new(config);
    let app = create_app(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (state, addr)
}

async fn connect(addr: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
    ws
}

async fn send(client: &mut Client, value: Value) {
    client.send(Message::Text(value.to_string().into())).await.unwrap();
}

async fn recv(client: &mut Client) -> Value {
    loop {
        let frame = timeout(Duration::from_secs(2), client.next())
            .await
            .expect("timed out waiting for a message")
            .expect("connection closed")
            .unwrap();
        if let Message::Text(text) = frame {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

async fn assert_silent(client: &mut Client) {
    assert!(timeout(Duration::from_millis(150), client.next()).await.is_err(), "unexpected message");
}

async fn join(client: &mut Client, session_id: &str) {
    send(client, json!({"type": "join-session", "sessionId": session_id})).await;
}

#[tokio::test]
async fn join_edit_and_leave_flow() {
    let (state, addr) = start_test_server().await;
    let session_id = state.gateway.open_session().await.unwrap().id;

    // Scenario A
    let mut x = connect(&addr).await;
    join(&mut x, &session_id).await;
    assert_eq!(recv(&mut x).await, json!({"type": "code-update", "code": DEFAULT_CODE}));
    assert_eq!(recv(&mut x).await, json!({"type": "user-count", "count": 1}));

    // Scenario B
    let mut y = connect(&addr).await;
    join(&mut y, &session_id).await;
    assert_eq!(recv(&mut y).await, json!({"type": "code-update", "code": DEFAULT_CODE}));
    assert_eq!(recv(&mut y).await, json!({"type": "user-count", "count": 2}));
    assert_eq!(recv(&mut x).await, json!({"type": "user-count", "count": 2}));

    // Scenario C
    send(&mut x, json!({"type": "code-change", "sessionId": session_id, "code": "print(1)"})).await;
    assert_eq!(recv(&mut y).await, json!({"type": "code-update", "code": "print(1)"}));
    assert_silent(&mut x).await;

    // Scenario D
    x.close(None).await.unwrap();
    assert_eq!(recv(&mut y).await, json!({"type": "user-count", "count": 1}));
    let session = state.gateway.registry().get(&session_id).await.unwrap();
    assert_eq!(session.participant_count, 1);
    assert_eq!(session.buffer, "print(1)");
}

#[tokio::test]
async fn join_unknown_session_reports_error() {
    let (_state, addr) = start_test_server().await;
    let mut x = connect(&addr).await;

    join(&mut x, "missing").await;
    assert_eq!(recv(&mut x).await, json!({"type": "error", "message": "Session not found"}));

    // Connection stays usable
    send(&mut x, json!({"type": "ping"})).await;
    assert_eq!(recv(&mut x).await["type"], "pong");
}

#[tokio::test]
async fn malformed_frames_and_early_edits_are_rejected() {
    let (state, addr) = start_test_server().await;
    let session_id = state.gateway.open_session().await.unwrap().id;
    let mut x = connect(&addr).await;

    x.send(Message::Text("not json".into())).await.unwrap();
    assert_eq!(recv(&mut x).await["type"], "error");

    send(&mut x, json!({"type": "code-change", "sessionId": session_id, "code": "x"})).await;
    assert_eq!(recv(&mut x).await["type"], "error");
    assert_eq!(state.gateway.registry().get(&session_id).await.unwrap().buffer, DEFAULT_CODE);
}

#[tokio::test]
async fn dropped_connection_leaves_room() {
    let (state, addr) = start_test_server().await;
    let session_id = state.gateway.open_session().await.unwrap().id;

    let mut x = connect(&addr).await;
    join(&mut x, &session_id).await;
    recv(&mut x).await;
    recv(&mut x).await;
    drop(x);

    let registry = state.gateway.registry();
    timeout(Duration::from_secs(2), async {
        while registry.get(&session_id).await.unwrap().participant_count != 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("participant was never removed");
}
