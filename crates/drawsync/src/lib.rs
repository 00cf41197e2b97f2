//! # DrawSync
//!
//! Game-session orchestration for real-time drawing-and-guessing games.
//!
//! DrawSync keeps every live game room in memory, drives each one
//! through `Lobby → Playing → Finished` on its own countdown, and
//! scores the round's drawings in a deferred pass once the clock runs
//! out. You plug in three collaborators:
//!
//! - a [`ScoringOracle`] that picks words and scores drawings,
//! - an [`ArchiveStore`] that keeps ended rooms,
//! - a [`BroadcastSink`] that pushes notifications to players.
//!
//! The bundled [`FallbackOracle`], [`MemoryArchive`], and
//! [`ChannelSink`] cover development and tests.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use drawsync::prelude::*;
//!
//! # async fn run() -> Result<(), DrawSyncError> {
//! drawsync::init_tracing();
//! let (orchestrator, _archive, sink) = DrawSyncBuilder::from_env()?.build_local();
//! let _notifications = sink.subscribe();
//!
//! let room = orchestrator.create(PlayerId::from("ana")).await;
//! orchestrator.join(room.code(), PlayerId::from("bo")).await?;
//! orchestrator.start(room.code()).await;
//! # Ok(())
//! # }
//! ```

mod archive;
mod builder;
mod config;
mod error;
mod oracle;
mod sink;

pub use archive::MemoryArchive;
pub use builder::{DrawSyncBuilder, LocalOrchestrator};
pub use config::DrawSyncConfig;
pub use error::DrawSyncError;
pub use oracle::{FALLBACK_SCORES, FallbackOracle};
pub use sink::{ChannelSink, Published};

pub use drawsync_protocol as protocol;
pub use drawsync_room as room;
pub use drawsync_tick as tick;

pub use drawsync_room::{ArchiveStore, BroadcastSink, ScoringOracle};

/// Installs a `tracing` subscriber that prints to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Returns
/// `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init()
        .is_ok()
}

pub mod prelude {
    //! The types most programs need.

    pub use crate::{
        ArchiveStore, BroadcastSink, ChannelSink, DrawSyncBuilder, DrawSyncConfig, DrawSyncError,
        FallbackOracle, LocalOrchestrator, MemoryArchive, Published, ScoringOracle,
    };
    pub use drawsync_protocol::{Notification, PlayerId, RoomCode, Scoreboard, Topic, TopicKind};
    pub use drawsync_room::{Outcome, Phase, Room, RoomError, RoomSettings, SessionOrchestrator};
}
