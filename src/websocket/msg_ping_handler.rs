use chrono::Utc;
use tracing::debug;

use crate::models::{PongMessage, SendMessage};
use super::connection::ConnCtx;

/// Handle PingMessage
pub fn handle_ping_message(conn: &ConnCtx) {
    debug!("Ping received from connection {}", conn.id());
    conn.send(SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() }));
}
