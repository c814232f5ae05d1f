use tracing::{info, warn};

use crate::models::{JoinMessage, SendMessage};
use super::connection::{ConnCtx, ConnState};
use super::gateway::SyncGateway;

/// Handle JoinMessage
pub async fn handle_join_message(gateway: &SyncGateway, conn: &mut ConnCtx, join_msg: JoinMessage) {
    match conn.state() {
        ConnState::Closed => return,
        ConnState::Joined(current) if *current != join_msg.session_id => {
            warn!("Connection {} tried to join {} while in {}", conn.id(), join_msg.session_id, current);
            conn.send(SendMessage::error("Already joined to another session"));
            return;
        }
        _ => {}
    }

    let (mut session, count) = match gateway.registry().join(&join_msg.session_id, conn.id(), conn.outbox()).await {
        Ok(joined) => joined,
        Err(e) => {
            info!("Connection {} failed to join {}: {}", conn.id(), join_msg.session_id, e);
            conn.send(SendMessage::error(e.to_string()));
            return;
        }
    };
    gateway.lifecycle().cancel(&mut session);

    // Buffer first so the joiner has content before it hears the count.
    conn.send(SendMessage::code_update(session.buffer()));
    gateway.announce_presence(&session);
    drop(session);

    conn.mark_joined(join_msg.session_id.clone());
    info!("Connection {} joined session {} ({} online)", conn.id(), join_msg.session_id, count);
}
