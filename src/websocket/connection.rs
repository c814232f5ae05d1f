use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::models::SendMessage;

/// Messages a connection may have waiting before further ones are dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// Queue feeding one connection's writer task.
pub type Outbox = mpsc::Sender<SendMessage>;

/// Create the bounded outbox for a new connection.
pub fn outbox_channel() -> (Outbox, mpsc::Receiver<SendMessage>) {
    mpsc::channel(OUTBOX_CAPACITY)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    Unjoined,
    Joined(String),
    Closed,
}

/// Per-connection context, owned by the connection's reader loop.
#[derive(Debug)]
pub struct ConnCtx {
    id: String,
    outbox: Outbox,
    state: ConnState,
}

impl ConnCtx {
    pub fn new(outbox: Outbox) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            outbox,
            state: ConnState::Unjoined,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn outbox(&self) -> Outbox {
        self.outbox.clone()
    }

    pub fn state(&self) -> &ConnState {
        &self.state
    }

    pub fn session_id(&self) -> Option<&str> {
        match &self.state {
            ConnState::Joined(session_id) => Some(session_id.as_str()),
            _ => None,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.state == ConnState::Closed
    }

    pub(crate) fn mark_joined(&mut self, session_id: impl Into<String>) {
        if !self.is_closed() {
            self.state = ConnState::Joined(session_id.into());
        }
    }

    /// Move to Closed, returning the session that was joined, if any.
    pub(crate) fn close(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, ConnState::Closed) {
            ConnState::Joined(session_id) => Some(session_id),
            _ => None,
        }
    }

    /// Queue a message for this connection only. Dropped if the peer is gone or lagging.
    pub fn send(&self, msg: SendMessage) {
        match self.outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => debug!("Connection {} is lagging, dropping message", self.id),
            Err(TrySendError::Closed(_)) => debug!("Connection {} is gone, dropping message", self.id),
        }
    }
}
