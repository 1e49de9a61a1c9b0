//! Engine error taxonomy

use crate::game::{ActorId, MapId, SessionId};

/// Errors surfaced by engine operations
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Map not found: {0}")]
    UnknownMap(MapId),

    #[error("Player token has not been found")]
    InvalidToken,

    #[error("Unknown move code: {0:?}")]
    InvalidMoveCode(String),

    #[error("Player name must not be empty")]
    InvalidName,

    #[error("Duplicate registration: {0}")]
    DuplicateRegistration(String),

    #[error("Session {0} is not known to the player directory")]
    UnknownSession(SessionId),

    #[error("Actor {actor} does not exist in session {session}")]
    UnknownActor { session: SessionId, actor: ActorId },

    #[error("Actor {actor} in session {session} is off the road network at ({x}, {y})")]
    OffRoad {
        session: SessionId,
        actor: ActorId,
        x: f64,
        y: f64,
    },

    #[error("Snapshot cannot be restored: {0}")]
    Restore(String),
}

impl GameError {
    /// Invariant violations, as opposed to errors caused by caller input
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            GameError::DuplicateRegistration(_)
                | GameError::UnknownSession(_)
                | GameError::UnknownActor { .. }
                | GameError::OffRoad { .. }
                | GameError::Restore(_)
        )
    }
}
