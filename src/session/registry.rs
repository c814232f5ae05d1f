use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::AbortHandle;
use tracing::{debug, info};

pub type ParticipantId = String;

/// Exclusive access to one session. Held only for in-memory work, never across network I/O.
pub type SessionGuard<H> = OwnedMutexGuard<Session<H>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound(String),
    #[error("Session '{0}' already exists")]
    Duplicate(String),
}

/// A shared buffer and the participants currently joined to it.
///
/// `H` is whatever per-participant handle the caller needs to reach that
/// participant again (the gateway stores an outbox, tests use `()`).
#[derive(Debug)]
pub struct Session<H> {
    id: String,
    buffer: String,
    participants: HashMap<ParticipantId, H>,
    removed: bool,
    reaper: Option<AbortHandle>,
}

impl<H> Session<H> {
    fn new(id: String, buffer: String) -> Self {
        Self {
            id,
            buffer,
            participants: HashMap::new(),
            removed: false,
            reaper: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    pub fn participants(&self) -> impl Iterator<Item = (&str, &H)> {
        self.participants.iter().map(|(id, handle)| (id.as_str(), handle))
    }

    /// Add a participant. Re-joining with the same id replaces its handle.
    pub fn join(&mut self, participant_id: impl Into<ParticipantId>, handle: H) -> usize {
        self.participants.insert(participant_id.into(), handle);
        self.participants.len()
    }

    /// Replace the buffer unconditionally (last write wins).
    pub fn apply_edit(&mut self, buffer: impl Into<String>) -> usize {
        self.buffer = buffer.into();
        self.participants.len()
    }

    /// Remove a participant; a no-op when it was never joined.
    pub fn leave(&mut self, participant_id: &str) -> usize {
        self.participants.remove(participant_id);
        self.participants.len()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            buffer: self.buffer.clone(),
            participant_count: self.participants.len(),
        }
    }

    /// Install a pending reaper, aborting the one it replaces.
    pub(crate) fn arm_reaper(&mut self, handle: AbortHandle) {
        if let Some(previous) = self.reaper.replace(handle) {
            previous.abort();
        }
    }

    /// Abort the pending reaper, if any. Returns whether one was pending.
    pub(crate) fn disarm_reaper(&mut self) -> bool {
        match self.reaper.take() {
            Some(handle) => {
                handle.abort();
                true
            }
            None => false,
        }
    }

    pub fn has_pending_reaper(&self) -> bool {
        self.reaper.is_some()
    }
}

/// Read-only copy of a session's state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub id: String,
    pub buffer: String,
    pub participant_count: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub sessions: usize,
    pub participants: usize,
    pub empty_sessions: usize,
    pub pending_reclaims: usize,
}

/// Maps session ids to sessions, each behind its own lock.
///
/// The outer map lock is only held long enough to look up or insert an
/// entry, so work on one session never waits on another.
#[derive(Debug)]
pub struct SessionRegistry<H> {
    sessions: RwLock<HashMap<String, Arc<Mutex<Session<H>>>>>,
    default_buffer: String,
}

impl<H: Send + 'static> SessionRegistry<H> {
    pub fn new(default_buffer: impl Into<String>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            default_buffer: default_buffer.into(),
        }
    }

    /// Insert a new session with the default buffer and no participants.
    pub async fn create(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(id) {
            return Err(SessionError::Duplicate(id.to_string()));
        }
        let session = Session::new(id.to_string(), self.default_buffer.clone());
        let snapshot = session.snapshot();
        sessions.insert(id.to_string(), Arc::new(Mutex::new(session)));
        info!("Session {} created", id);
        Ok(snapshot)
    }

    /// Lock a session for exclusive access.
    pub async fn lock(&self, id: &str) -> Result<SessionGuard<H>, SessionError> {
        let entry = self
            .sessions
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(id.to_string()))?;
        let guard = entry.lock_owned().await;
        // Deleted while we were waiting for the lock
        if guard.removed {
            return Err(SessionError::NotFound(id.to_string()));
        }
        Ok(guard)
    }

    pub async fn get(&self, id: &str) -> Result<SessionSnapshot, SessionError> {
        Ok(self.lock(id).await?.snapshot())
    }

    /// Add a participant and hand back the still-locked session with the new count,
    /// so the caller can notify the room before any other mutation lands.
    pub async fn join(&self, id: &str, participant_id: &str, handle: H) -> Result<(SessionGuard<H>, usize), SessionError> {
        let mut session = self.lock(id).await?;
        let count = session.join(participant_id, handle);
        Ok((session, count))
    }

    /// Replace the buffer (last write wins). Returns the locked session and its participant count.
    pub async fn apply_edit(&self, id: &str, participant_id: &str, buffer: impl Into<String>) -> Result<(SessionGuard<H>, usize), SessionError> {
        let mut session = self.lock(id).await?;
        debug!("Participant {} replaced buffer of session {}", participant_id, id);
        let count = session.apply_edit(buffer);
        Ok((session, count))
    }

    /// Remove a participant; leaving twice is a no-op. Returns the locked session and the new count.
    pub async fn leave(&self, id: &str, participant_id: &str) -> Result<(SessionGuard<H>, usize), SessionError> {
        let mut session = self.lock(id).await?;
        let count = session.leave(participant_id);
        Ok((session, count))
    }

    /// Remove a session. Deleting an absent id is a no-op.
    pub async fn delete(&self, id: &str) -> bool {
        self.remove_where(id, |_| true).await
    }

    /// Remove a session only if it still has no participants when its lock is held.
    pub async fn delete_if_empty(&self, id: &str) -> bool {
        self.remove_where(id, Session::is_empty).await
    }

    async fn remove_where(&self, id: &str, predicate: impl FnOnce(&Session<H>) -> bool) -> bool {
        let Ok(mut session) = self.lock(id).await else {
            return false;
        };
        if !predicate(&*session) {
            return false;
        }
        // Lock order is session then map; lookups never hold the map while waiting on a session.
        self.sessions.write().await.remove(id);
        session.removed = true;
        // Dropping the handle does not abort; the reaper may be the caller.
        session.reaper.take();
        true
    }

    /// Number of sessions currently registered.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn stats(&self) -> RegistryStats {
        let entries: Vec<_> = self.sessions.read().await.values().cloned().collect();
        let mut stats = RegistryStats::default();
        for entry in entries {
            let session = entry.lock().await;
            if session.removed {
                continue;
            }
            stats.sessions += 1;
            stats.participants += session.participant_count();
            if session.is_empty() {
                stats.empty_sessions += 1;
            }
            if session.has_pending_reaper() {
                stats.pending_reclaims += 1;
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    fn registry() -> SessionRegistry<()> {
        SessionRegistry::new("// start")
    }

    #[tokio::test]
    async fn create_rejects_duplicate_ids() {
        let registry = registry();
        let created = registry.create("s1").await.unwrap();
        assert_eq!(created.buffer, "// start");
        assert_eq!(created.participant_count, 0);

        assert_eq!(registry.create("s1").await, Err(SessionError::Duplicate("s1".into())));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let registry = registry();
        assert_eq!(registry.get("nope").await, Err(SessionError::NotFound("nope".into())));
        assert!(matches!(registry.join("nope", "p1", ()).await, Err(SessionError::NotFound(_))));
        assert!(matches!(registry.apply_edit("nope", "p1", "x").await, Err(SessionError::NotFound(_))));
        assert!(matches!(registry.leave("nope", "p1").await, Err(SessionError::NotFound(_))));
        assert!(!registry.delete_if_empty("nope").await);
    }

    #[tokio::test]
    async fn join_returns_buffer_and_count_and_is_idempotent() {
        let registry = registry();
        registry.create("s1").await.unwrap();

        {
            let (session, count) = registry.join("s1", "p1", ()).await.unwrap();
            assert_eq!(session.buffer(), "// start");
            assert_eq!(count, 1);
        }
        assert_eq!(registry.join("s1", "p2", ()).await.unwrap().1, 2);
        assert_eq!(registry.join("s1", "p2", ()).await.unwrap().1, 2);
    }

    #[tokio::test]
    async fn counts_follow_joins_minus_leaves() {
        let registry = registry();
        registry.create("s1").await.unwrap();

        let steps: &[(&str, &str, usize)] = &[
            ("join", "a", 1),
            ("join", "b", 2),
            ("leave", "a", 1),
            ("leave", "a", 1),
            ("join", "c", 2),
            ("leave", "b", 1),
            ("leave", "c", 0),
            ("leave", "c", 0),
        ];
        for (op, participant, expected) in steps {
            let count = match *op {
                "join" => registry.join("s1", participant, ()).await.unwrap().1,
                _ => registry.leave("s1", participant).await.unwrap().1,
            };
            assert_eq!(count, *expected, "{op} {participant}");
        }
        assert_eq!(registry.get("s1").await.unwrap().participant_count, 0);
    }

    #[tokio::test]
    async fn last_edit_wins() {
        let registry = registry();
        registry.create("s1").await.unwrap();
        registry.join("s1", "a", ()).await.unwrap();
        registry.join("s1", "b", ()).await.unwrap();

        assert_eq!(registry.apply_edit("s1", "a", "print(1)").await.unwrap().1, 2);
        assert_eq!(registry.apply_edit("s1", "b", "print(2)").await.unwrap().1, 2);
        assert_eq!(registry.get("s1").await.unwrap().buffer, "print(2)");
    }

    #[tokio::test]
    async fn delete_if_empty_spares_occupied_sessions() {
        let registry = registry();
        registry.create("s1").await.unwrap();
        registry.join("s1", "a", ()).await.unwrap();

        assert!(!registry.delete_if_empty("s1").await);
        assert!(registry.get("s1").await.is_ok());

        registry.leave("s1", "a").await.unwrap();
        assert!(registry.delete_if_empty("s1").await);
        assert!(registry.get("s1").await.is_err());
        assert!(!registry.delete("s1").await);
    }

    #[tokio::test]
    async fn deleted_id_can_be_recreated() {
        let registry = registry();
        registry.create("s1").await.unwrap();
        assert!(registry.delete("s1").await);
        assert!(registry.create("s1").await.is_ok());
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn stats_cover_all_sessions() {
        let registry = registry();
        registry.create("s1").await.unwrap();
        registry.create("s2").await.unwrap();
        registry.join("s1", "a", ()).await.unwrap();
        registry.join("s1", "b", ()).await.unwrap();

        assert_eq!(
            registry.stats().await,
            RegistryStats { sessions: 2, participants: 2, empty_sessions: 1, pending_reclaims: 0 }
        );
    }

    #[tokio::test]
    async fn busy_session_does_not_block_others() {
        let registry = registry();
        registry.create("a").await.unwrap();
        registry.create("b").await.unwrap();

        let _held = registry.lock("a").await.unwrap();
        let limit = Duration::from_millis(200);

        let (_, count) = timeout(limit, registry.join("b", "p1", ())).await.expect("join on b blocked").unwrap();
        assert_eq!(count, 1);
        timeout(limit, registry.apply_edit("b", "p1", "x")).await.expect("edit on b blocked").unwrap();
        timeout(limit, registry.leave("b", "p1")).await.expect("leave on b blocked").unwrap();
        assert!(timeout(limit, registry.delete_if_empty("b")).await.expect("delete on b blocked"));
        timeout(limit, registry.create("c")).await.expect("create blocked").unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_joins_are_not_lost() {
        let registry = Arc::new(registry());
        registry.create("s1").await.unwrap();

        let tasks: Vec<_> = (0..64)
            .map(|i| {
                let registry = Arc::clone(&registry);
                tokio::spawn(async move {
                    registry.join("s1", &format!("p{i}"), ()).await.unwrap();
                    registry.apply_edit("s1", &format!("p{i}"), format!("edit {i}")).await.unwrap();
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.get("s1").await.unwrap().participant_count, 64);
    }
}
