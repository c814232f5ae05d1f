use tracing::{debug, error, warn};

use crate::models::{EditMessage, SendMessage};
use super::connection::ConnCtx;
use super::gateway::SyncGateway;

/// Handle EditMessage
pub async fn handle_edit_message(gateway: &SyncGateway, conn: &ConnCtx, edit_msg: EditMessage) {
    let Some(joined) = conn.session_id() else {
        warn!("Connection {} sent an edit before joining", conn.id());
        conn.send(SendMessage::error("Join a session before editing"));
        return;
    };
    if joined != edit_msg.session_id {
        warn!("Connection {} sent an edit for {} while joined to {}", conn.id(), edit_msg.session_id, joined);
        conn.send(SendMessage::error("Not joined to this session"));
        return;
    }

    let (session, count) = match gateway.registry().apply_edit(joined, conn.id(), edit_msg.code).await {
        Ok(edited) => edited,
        Err(e) => {
            // A room with members is never reclaimed, so this means the invariant broke.
            error!("Edit from {} hit missing session {}: {}", conn.id(), joined, e);
            conn.send(SendMessage::error(e.to_string()));
            return;
        }
    };

    let update = SendMessage::code_update(session.buffer());
    let delivered = gateway.fan_out(&session, &update, Some(conn.id()));
    debug!("Session {} edited by {}, relayed to {}/{} peers", joined, conn.id(), delivered, count.saturating_sub(1));
}
