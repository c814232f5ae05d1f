use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::SendMessage;
use crate::session::{LifecycleManager, Presence, Session, SessionError, SessionRegistry, SessionSnapshot};
use super::connection::{ConnCtx, Outbox};

pub type Registry = SessionRegistry<Outbox>;

/// Relays connection events into registry mutations and fans the results out to rooms.
///
/// Fan-out happens while the session lock is held, but only enqueues onto
/// bounded per-connection outboxes; the socket writes happen in each
/// connection's writer task. This keeps per-recipient delivery in mutation
/// order without ever blocking the lock on a slow peer. A peer whose outbox
/// is full misses messages until it catches up.
#[derive(Debug)]
pub struct SyncGateway {
    registry: Arc<Registry>,
    lifecycle: LifecycleManager<Outbox>,
}

impl SyncGateway {
    pub fn new(default_code: impl Into<String>, idle_timeout: Duration) -> Self {
        let registry = Arc::new(Registry::new(default_code));
        let lifecycle = LifecycleManager::new(Arc::clone(&registry), idle_timeout);
        Self { registry, lifecycle }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn lifecycle(&self) -> &LifecycleManager<Outbox> {
        &self.lifecycle
    }

    /// Create a fresh session. It is reclaimed if nobody joins within the idle window.
    pub async fn open_session(&self) -> Result<SessionSnapshot, SessionError> {
        let session_id = Uuid::new_v4().to_string();
        let snapshot = self.registry.create(&session_id).await?;
        if let Ok(mut session) = self.registry.lock(&session_id).await {
            self.lifecycle.schedule(&mut session);
        }
        Ok(snapshot)
    }

    /// Queue `msg` for every room member except `skip`. Returns how many were reached.
    pub fn fan_out(&self, session: &Session<Outbox>, msg: &SendMessage, skip: Option<&str>) -> usize {
        let mut delivered = 0;
        for (participant_id, outbox) in session.participants() {
            if skip == Some(participant_id) {
                continue;
            }
            match outbox.try_send(msg.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!("Dropping message for lagging participant {} in session {}", participant_id, session.id())
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Dropping message for departed participant {} in session {}", participant_id, session.id())
                }
            }
        }
        delivered
    }

    /// Broadcast the room's presence as it is right now.
    pub fn announce_presence(&self, session: &Session<Outbox>) {
        let presence = Presence::of(session);
        self.fan_out(session, &SendMessage::user_count(presence.count), None);
    }

    /// Close the connection and take it out of its room.
    pub async fn disconnect(&self, conn: &mut ConnCtx) {
        let Some(session_id) = conn.close() else {
            debug!("Connection {} closed without joining", conn.id());
            return;
        };

        let (mut session, count) = match self.registry.leave(&session_id, conn.id()).await {
            Ok(left) => left,
            Err(e) => {
                error!("Connection {} left session {}: {}", conn.id(), session_id, e);
                return;
            }
        };
        self.announce_presence(&session);
        info!("Connection {} left session {} ({} remaining)", conn.id(), session_id, count);

        if count == 0 {
            self.lifecycle.schedule(&mut session);
        }
    }
}
