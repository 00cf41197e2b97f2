//! [`DrawSyncBuilder`]: wires a [`SessionOrchestrator`] together.

use std::time::Duration;

use drawsync_room::{
    ArchiveStore, BroadcastSink, RoomTable, ScoringOracle, SessionOrchestrator,
};
use drawsync_tick::{Scheduler, SchedulerConfig};

use crate::{ChannelSink, DrawSyncConfig, DrawSyncError, FallbackOracle, MemoryArchive};

/// An orchestrator running entirely in-process.
pub type LocalOrchestrator = SessionOrchestrator<FallbackOracle, MemoryArchive, ChannelSink>;

/// Builder for configuring a DrawSync orchestrator.
///
/// # Example
///
/// ```rust,no_run
/// use drawsync::prelude::*;
///
/// # async fn run() -> Result<(), DrawSyncError> {
/// let builder = DrawSyncBuilder::from_env()?.round_secs(30);
/// let sink = builder.channel_sink();
/// let archive = MemoryArchive::new();
/// let orchestrator = builder.build(FallbackOracle, archive.clone(), sink.clone());
///
/// let room = orchestrator.create(PlayerId::from("ana")).await;
/// orchestrator.start(room.code()).await;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct DrawSyncBuilder {
    config: DrawSyncConfig,
    scheduler: SchedulerConfig,
    code_len: Option<usize>,
}

impl DrawSyncBuilder {
    /// Creates a builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder from `DRAWSYNC_*` environment variables.
    ///
    /// # Errors
    /// See [`DrawSyncConfig::from_env`].
    pub fn from_env() -> Result<Self, DrawSyncError> {
        Ok(Self::new().config(DrawSyncConfig::from_env()?))
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: DrawSyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the default room capacity.
    pub fn max_players(mut self, max_players: usize) -> Self {
        self.config.max_players = max_players;
        self
    }

    /// Sets the default round length.
    pub fn round_secs(mut self, secs: u32) -> Self {
        self.config.round_secs = secs;
        self
    }

    /// Sets the delay between a round's end and its evaluation.
    pub fn grace_period(mut self, grace: Duration) -> Self {
        self.config.grace_millis = grace.as_millis() as u64;
        self
    }

    /// Sets the countdown resolution.
    pub fn tick_interval(mut self, interval: Duration) -> Self {
        self.config.tick_millis = interval.as_millis() as u64;
        self
    }

    /// Sets how many rooms a history query returns.
    pub fn recent_limit(mut self, limit: usize) -> Self {
        self.config.recent_limit = limit;
        self
    }

    /// Sets the buffer size of sinks made by [`channel_sink`](Self::channel_sink).
    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.config.broadcast_capacity = capacity;
        self
    }

    /// Sets the scheduler's overrun handling.
    pub fn scheduler_config(mut self, config: SchedulerConfig) -> Self {
        self.scheduler = config;
        self
    }

    /// Sets the length of generated room codes.
    pub fn code_len(mut self, len: usize) -> Self {
        self.code_len = Some(len);
        self
    }

    /// The configuration as it stands.
    pub fn settings(&self) -> &DrawSyncConfig {
        &self.config
    }

    /// A JSON [`ChannelSink`] sized by the configured capacity.
    pub fn channel_sink(&self) -> ChannelSink {
        ChannelSink::new(self.config.broadcast_capacity)
    }

    /// Builds an orchestrator around the given collaborators.
    pub fn build<O, A, B>(self, oracle: O, archive: A, sink: B) -> SessionOrchestrator<O, A, B>
    where
        O: ScoringOracle,
        A: ArchiveStore,
        B: BroadcastSink,
    {
        let rooms = match self.code_len {
            Some(len) => RoomTable::with_code_len(len),
            None => RoomTable::new(),
        };
        tracing::info!(
            max_players = self.config.max_players,
            round_secs = self.config.round_secs,
            grace_millis = self.config.grace_millis,
            "building DrawSync orchestrator"
        );
        SessionOrchestrator::with_parts(
            self.config.orchestrator_config(),
            rooms,
            Scheduler::new(self.scheduler),
            oracle,
            archive,
            sink,
        )
    }

    /// Builds an orchestrator with the bundled in-process collaborators.
    ///
    /// Returns the archive and sink too, so callers can read history and
    /// subscribe to notifications.
    pub fn build_local(self) -> (LocalOrchestrator, MemoryArchive, ChannelSink) {
        let archive = MemoryArchive::new();
        let sink = self.channel_sink();
        let orchestrator = self.build(FallbackOracle, archive.clone(), sink.clone());
        (orchestrator, archive, sink)
    }
}
