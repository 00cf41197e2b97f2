//! Unified error type for DrawSync.

use drawsync_protocol::ProtocolError;
use drawsync_room::{DependencyError, RoomError};

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `drawsync` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum DrawSyncError {
    /// A protocol-level error (encode, decode, bad room code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A room-level error (full, not found, wrong phase).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// A collaborator failed outside of a room operation.
    #[error(transparent)]
    Dependency(#[from] DependencyError),

    /// A configuration value is unusable.
    #[error("invalid configuration: {key} = {value:?} ({reason})")]
    Config {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}
