//! Room lifecycle and round orchestration for DrawSync.
//!
//! Every live room sits in a shared [`RoomTable`] behind its own lock.
//! The [`SessionOrchestrator`] is the only thing that mutates rooms: it
//! runs the lobby operations, arms a per-room countdown on the shared
//! [`Scheduler`](drawsync_tick::Scheduler), and schedules a deferred
//! scoring pass once each round ends.
//!
//! # Key types
//!
//! - [`SessionOrchestrator`]: create/join/leave/start/submit/abort
//! - [`Room`]: one game session (snapshots are handed out by value)
//! - [`Phase`]: lifecycle state machine
//! - [`ScoringOracle`], [`ArchiveStore`], [`BroadcastSink`]: the
//!   collaborators you plug in
//! - [`RoomSettings`], [`OrchestratorConfig`]: settings

mod collaborators;
mod config;
mod error;
mod orchestrator;
mod room;
mod table;
mod timers;
mod words;

pub use collaborators::{ArchiveStore, BroadcastSink, ScoringOracle};
pub use config::{OrchestratorConfig, Phase, RoomSettings};
pub use error::{DependencyError, RoomError};
pub use orchestrator::{ABORT_REASON, SessionOrchestrator};
pub use room::{ABANDONED, ABORTED, Outcome, Room};
pub use table::{RoomEntry, RoomTable, generate_code};
pub use timers::TimerRegistry;
pub use words::{FALLBACK_WORDS, fallback_word, normalize_word};
