use axum::{
    extract::{ws::{Message, WebSocket, WebSocketUpgrade}, State},
    response::Response,
};
use futures_util::{stream::SplitStream, SinkExt, StreamExt};
use tracing::{debug, error, info, warn};

use crate::models::{ReceivedMessage, SendMessage};
use crate::AppState;
use super::connection::{outbox_channel, ConnCtx};
use super::gateway::SyncGateway;
use super::msg_edit_handler::handle_edit_message;
use super::msg_join_handler::handle_join_message;
use super::msg_ping_handler::handle_ping_message;

/// WebSocket handler
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    debug!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let gateway = state.gateway;
    let (outbox, mut inbox) = outbox_channel();
    let mut conn = ConnCtx::new(outbox);
    let connection_id = conn.id().to_string();
    info!("WebSocket connection established with connection_id: {}", connection_id);

    let (mut sender, mut receiver) = socket.split();

    // Writer: drains this connection's outbox onto the socket
    let writer_id = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = inbox.recv().await {
            let text = match serde_json::to_string(&msg) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize message for connection {}: {}", writer_id, e);
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                debug!("Connection {} stopped accepting messages", writer_id);
                break;
            }
        }
    });

    // Reader runs until the peer goes away or the writer fails
    tokio::select! {
        _ = read_loop(&gateway, &mut conn, &mut receiver) => {},
        _ = (&mut send_task) => {},
    };
    send_task.abort();

    gateway.disconnect(&mut conn).await;
    info!("WebSocket connection {} terminated", connection_id);
}

async fn read_loop(gateway: &SyncGateway, conn: &mut ConnCtx, receiver: &mut SplitStream<WebSocket>) {
    while let Some(frame) = receiver.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                debug!("Connection {} read error: {}", conn.id(), e);
                break;
            }
        };

        let msg: ReceivedMessage = match serde_json::from_str(&text) {
            Ok(msg) => msg,
            Err(e) => {
                warn!("Failed to parse message from connection {}: {}", conn.id(), e);
                conn.send(SendMessage::error(format!("Invalid message: {}", e)));
                continue;
            }
        };

        match msg {
            ReceivedMessage::Join(join_msg) => handle_join_message(gateway, conn, join_msg).await,
            ReceivedMessage::Edit(edit_msg) => handle_edit_message(gateway, conn, edit_msg).await,
            ReceivedMessage::Ping => handle_ping_message(conn),
        }
    }
}
