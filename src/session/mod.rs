pub mod lifecycle;
pub mod presence;
pub mod registry;

pub use lifecycle::LifecycleManager;
pub use presence::Presence;
pub use registry::{ParticipantId, RegistryStats, Session, SessionError, SessionGuard, SessionRegistry, SessionSnapshot};
