use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::registry::{Session, SessionRegistry};

/// Reclaims sessions that stay empty for a whole idle window.
///
/// Each session holds at most one pending reaper task. The reaper re-checks
/// emptiness under the session lock when it fires, so a stale timer can never
/// delete a room someone has rejoined.
#[derive(Debug)]
pub struct LifecycleManager<H> {
    registry: Arc<SessionRegistry<H>>,
    idle_timeout: Duration,
}

impl<H: Send + 'static> LifecycleManager<H> {
    pub fn new(registry: Arc<SessionRegistry<H>>, idle_timeout: Duration) -> Self {
        Self { registry, idle_timeout }
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Arm the reaper for an empty session. Call with the session lock held.
    pub fn schedule(&self, session: &mut Session<H>) {
        let registry = Arc::clone(&self.registry);
        let id = session.id().to_string();
        let idle_timeout = self.idle_timeout;

        debug!("Session {} is empty, reclaiming in {:?} unless rejoined", id, idle_timeout);
        let task = tokio::spawn(async move {
            tokio::time::sleep(idle_timeout).await;
            if registry.delete_if_empty(&id).await {
                info!("Session {} reclaimed after {:?} idle", id, idle_timeout);
            } else {
                debug!("Session {} survived its idle check", id);
            }
        });
        session.arm_reaper(task.abort_handle());
    }

    /// Disarm the pending reaper because someone joined.
    pub fn cancel(&self, session: &mut Session<H>) {
        if session.disarm_reaper() {
            debug!("Session {} rejoined, reclamation cancelled", session.id());
        }
    }
}
