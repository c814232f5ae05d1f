use super::registry::Session;

/// Number of participants in a room, read from the session it describes.
///
/// Take it while the session lock is still held, right after the mutation
/// that changed membership, so every broadcast carries the count that
/// mutation produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Presence {
    pub count: usize,
}

impl Presence {
    pub fn of<H>(session: &Session<H>) -> Self {
        Self {
            count: session.participant_count(),
        }
    }
}
