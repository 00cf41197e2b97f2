//! Error types for the room layer.

use drawsync_protocol::{PlayerId, RoomCode};

use crate::Phase;

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// No live room has this code.
    #[error("room {0} not found")]
    NotFound(RoomCode),

    /// The room is full: no more player slots available.
    #[error("room {0} is full")]
    Full(RoomCode),

    /// The room's round is over (finished or aborted); no more joins.
    #[error("room {0} has already finished")]
    AlreadyFinished(RoomCode),

    /// The room is in a phase that doesn't allow this operation.
    /// For example, trying to leave a room mid-round.
    #[error("cannot {operation} room {code} while {phase}")]
    InvalidPhase {
        code: RoomCode,
        phase: Phase,
        operation: &'static str,
    },

    /// The player is not in this room.
    #[error("player {0} not in room {1}")]
    NotInRoom(PlayerId, RoomCode),

    /// A collaborator (word source, scorer, archive) failed.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

/// Failures reported by the external collaborators.
///
/// The orchestrator never lets these abort a round: word lookups fall
/// back to a built-in list and failed evaluations score zero. They only
/// surface to callers from archive queries.
#[derive(Debug, thiserror::Error)]
pub enum DependencyError {
    /// The service could not be reached or timed out.
    #[error("{service} unavailable: {reason}")]
    Unavailable {
        service: &'static str,
        reason: String,
    },

    /// The service answered, but not with something usable.
    #[error("{service} returned an invalid response: {reason}")]
    InvalidResponse {
        service: &'static str,
        reason: String,
    },
}

impl DependencyError {
    /// Shorthand for [`DependencyError::Unavailable`].
    pub fn unavailable(service: &'static str, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            service,
            reason: reason.into(),
        }
    }

    /// Shorthand for [`DependencyError::InvalidResponse`].
    pub fn invalid_response(service: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            service,
            reason: reason.into(),
        }
    }
}
