//! The session orchestrator: every room operation, the countdown, and
//! the deferred evaluation pass.
//!
//! # Locking
//!
//! Each room has its own mutex (see [`RoomTable`]). Operations take it
//! for short, non-blocking critical sections. Calls to the oracle or the
//! archive always happen with the lock released, and the room's phase is
//! re-checked afterwards, because an `abort` may have slipped in.
//!
//! # Timers
//!
//! `start` arms a repeating countdown through the [`TimerRegistry`].
//! When the clock runs out the countdown retires itself and arms a
//! one-shot evaluation in the same registry slot. `abort` disarms
//! whichever of the two is live.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use drawsync_protocol::{Notification, PlayerId, RoomCode};
use drawsync_tick::Scheduler;
use tracing::{debug, error, info, trace, warn};

use crate::room::Tick;
use crate::table::RoomEntry;
use crate::words::{fallback_word, normalize_word};
use crate::{
    ArchiveStore, BroadcastSink, OrchestratorConfig, Outcome, Phase, Room, RoomError, RoomSettings,
    RoomTable, ScoringOracle, TimerRegistry,
};

/// Reason broadcast on the abort topic.
pub const ABORT_REASON: &str = "Game aborted by creator";

/// Highest score the oracle can award.
const MAX_SCORE: u32 = 100;

struct Inner<O, A, B> {
    config: OrchestratorConfig,
    rooms: RoomTable,
    timers: TimerRegistry,
    scheduler: Scheduler,
    oracle: O,
    archive: A,
    sink: B,
}

/// Owns the live rooms and drives them through their lifecycle.
///
/// Cheap to clone: clones share the same rooms, timers, and
/// collaborators. Operations that arm timers must run inside a Tokio
/// runtime.
pub struct SessionOrchestrator<O, A, B> {
    inner: Arc<Inner<O, A, B>>,
}

impl<O, A, B> Clone for SessionOrchestrator<O, A, B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O, A, B> SessionOrchestrator<O, A, B>
where
    O: ScoringOracle,
    A: ArchiveStore,
    B: BroadcastSink,
{
    /// Creates an orchestrator with default settings, an empty table,
    /// and its own scheduler.
    pub fn new(oracle: O, archive: A, sink: B) -> Self {
        Self::with_parts(
            OrchestratorConfig::default(),
            RoomTable::new(),
            Scheduler::default(),
            oracle,
            archive,
            sink,
        )
    }

    /// Creates an orchestrator from explicitly constructed parts.
    pub fn with_parts(
        config: OrchestratorConfig,
        rooms: RoomTable,
        scheduler: Scheduler,
        oracle: O,
        archive: A,
        sink: B,
    ) -> Self {
        debug!(
            tick = ?config.tick_interval,
            grace = ?config.grace_period,
            "session orchestrator created"
        );
        Self {
            inner: Arc::new(Inner {
                config,
                rooms,
                timers: TimerRegistry::new(),
                scheduler,
                oracle,
                archive,
                sink,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Lobby operations
    // -----------------------------------------------------------------------

    /// Opens a room with the default settings and `creator` as its only
    /// player.
    pub async fn create(&self, creator: PlayerId) -> Room {
        self.create_with(creator, self.inner.config.room_defaults.clone())
            .await
    }

    /// Opens a room with explicit settings. No timer is armed.
    pub async fn create_with(&self, creator: PlayerId, settings: RoomSettings) -> Room {
        let settings = settings.validated();
        let created_at_ms = unix_millis();
        let entry = self
            .inner
            .rooms
            .insert_new(|code| Room::new(code, creator, settings, created_at_ms))
            .await;
        let room = entry.lock().await.clone();
        info!(
            room = %room.code(),
            max_players = room.max_players(),
            round_secs = room.round_duration_secs(),
            "room created"
        );
        room
    }

    /// Adds `player` to the room. Allowed in `Lobby` and mid-round.
    ///
    /// Repeated joins by the same id are not deduplicated here.
    ///
    /// # Errors
    /// `NotFound`, `AlreadyFinished` once the round is over or aborted,
    /// `Full` at capacity.
    pub async fn join(&self, code: &RoomCode, player: PlayerId) -> Result<Room, RoomError> {
        let entry = self.entry(code).await?;
        let mut room = entry.lock().await;
        if !room.phase().is_joinable() {
            return Err(RoomError::AlreadyFinished(code.clone()));
        }
        if room.is_full() {
            return Err(RoomError::Full(code.clone()));
        }

        room.add_player(player.clone());
        self.publish(
            code,
            Notification::Roster {
                players: room.players().to_vec(),
            },
        );
        info!(room = %code, %player, players = room.players().len(), "player joined");
        Ok(room.clone())
    }

    /// Removes `player` from a room in `Lobby`.
    ///
    /// Returns `Ok(None)` when they were the last player: the room is
    /// marked abandoned, archived (with them still on the roster), and
    /// dropped from the table.
    ///
    /// # Errors
    /// `NotFound`, `InvalidPhase` outside `Lobby`, `NotInRoom`.
    pub async fn leave(&self, code: &RoomCode, player: &PlayerId) -> Result<Option<Room>, RoomError> {
        let entry = self.entry(code).await?;
        let mut room = entry.lock().await;
        if room.phase() != Phase::Lobby {
            return Err(RoomError::InvalidPhase {
                code: code.clone(),
                phase: room.phase(),
                operation: "leave",
            });
        }
        if !room.contains(player) {
            return Err(RoomError::NotInRoom(player.clone(), code.clone()));
        }

        if room.players().len() == 1 {
            room.end_early(Outcome::Abandoned, "leave")?;
            let snapshot = room.clone();
            drop(room);

            self.inner.rooms.remove_entry(code, &entry).await;
            info!(room = %code, %player, "last player left: room abandoned");
            self.archive(snapshot).await;
            return Ok(None);
        }

        room.remove_player(player);
        self.publish(
            code,
            Notification::Roster {
                players: room.players().to_vec(),
            },
        );
        info!(room = %code, %player, players = room.players().len(), "player left");
        Ok(Some(room.clone()))
    }

    // -----------------------------------------------------------------------
    // Round operations
    // -----------------------------------------------------------------------

    /// Starts the round: `Lobby → Playing`, picks a word, arms the
    /// countdown.
    ///
    /// Silently ignored if the room is unknown or not in `Lobby`, so a
    /// second `start` never arms a second countdown.
    pub async fn start(&self, code: &RoomCode) {
        let Some(entry) = self.inner.rooms.get(code).await else {
            debug!(room = %code, "start ignored: no such room");
            return;
        };

        {
            let mut room = entry.lock().await;
            if let Err(e) = room.begin_round() {
                debug!(room = %code, error = %e, "start ignored");
                return;
            }
            info!(room = %code, players = room.players().len(), "round started");
        }

        // The word source may be slow; the room stays unlocked meanwhile.
        let word = self.pick_word(code).await;

        let mut room = entry.lock().await;
        if room.phase() != Phase::Playing {
            info!(room = %code, phase = %room.phase(), "room ended before the round began");
            return;
        }
        room.set_word(word.clone());
        self.publish(code, Notification::Word { word });

        // An abort that marked the room before this lock was retaken is
        // caught by the phase check above. One that disarmed before
        // `arm_with` but is still waiting for the room lock leaves this
        // countdown armed; its first tick sees `Aborted` and retires it.
        let this = self.clone();
        let countdown_code = code.clone();
        let countdown_entry = Arc::clone(&entry);
        let interval = self.inner.config.tick_interval;
        self.inner
            .timers
            .arm_with(code, |generation| {
                self.inner.scheduler.schedule_repeating(interval, move || {
                    let this = this.clone();
                    let code = countdown_code.clone();
                    let entry = Arc::clone(&countdown_entry);
                    async move { this.on_tick(code, entry, generation).await }
                })
            })
            .await;
    }

    /// Stores `drawing` as `player`'s submission, replacing any earlier
    /// one. Accepted in every phase; whatever is stored when evaluation
    /// runs is what gets scored.
    ///
    /// # Errors
    /// `NotFound` if the room is gone.
    pub async fn submit_drawing(
        &self,
        code: &RoomCode,
        player: PlayerId,
        drawing: String,
    ) -> Result<(), RoomError> {
        let entry = self.entry(code).await?;
        let mut room = entry.lock().await;
        let bytes = drawing.len();
        let replaced = room.record_submission(player.clone(), drawing);
        debug!(room = %code, %player, bytes, replaced, phase = %room.phase(), "drawing submitted");
        Ok(())
    }

    /// Ends a room immediately, whatever its phase.
    ///
    /// Removes it from the table, cancels its countdown or pending
    /// evaluation, marks it aborted, broadcasts the abort notice, and
    /// archives it. Returns `false` if no such room was live.
    pub async fn abort(&self, code: &RoomCode) -> bool {
        let Some(entry) = self.inner.rooms.remove(code).await else {
            debug!(room = %code, "abort ignored: no such room");
            return false;
        };
        self.inner.timers.disarm(code).await;

        let snapshot = {
            let mut room = entry.lock().await;
            if let Err(e) = room.end_early(Outcome::Aborted, "abort") {
                // Already abandoned, or evaluation concluded first.
                debug!(room = %code, error = %e, "room had already ended");
                return true;
            }
            self.publish(
                code,
                Notification::Aborted {
                    reason: ABORT_REASON.to_string(),
                },
            );
            room.clone()
        };

        info!(room = %code, "room aborted");
        self.archive(snapshot).await;
        true
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// Snapshots of every live room in `Lobby`, oldest first.
    pub async fn get_available(&self) -> Vec<Room> {
        let mut lobbies = Vec::new();
        for entry in self.inner.rooms.entries().await {
            let room = entry.lock().await;
            if room.phase() == Phase::Lobby {
                lobbies.push(room.clone());
            }
        }
        lobbies.sort_by(|a, b| {
            a.created_at_ms()
                .cmp(&b.created_at_ms())
                .then_with(|| a.code().cmp(b.code()))
        });
        lobbies
    }

    /// Snapshot of a live room.
    pub async fn get_game(&self, code: &RoomCode) -> Option<Room> {
        let entry = self.inner.rooms.get(code).await?;
        let room = entry.lock().await;
        Some(room.clone())
    }

    /// `player`'s most recent finished rooms from the archive, newest
    /// first, capped at the configured limit.
    ///
    /// # Errors
    /// `Dependency` if the archive query fails.
    pub async fn recent_games(&self, player: &PlayerId) -> Result<Vec<Room>, RoomError> {
        let rooms = self
            .inner
            .archive
            .recent_finished(player, self.inner.config.recent_limit)
            .await?;
        Ok(rooms)
    }

    /// Number of live rooms.
    pub async fn room_count(&self) -> usize {
        self.inner.rooms.len().await
    }

    /// Whether `code` currently has a live countdown or pending
    /// evaluation.
    pub async fn has_timer(&self, code: &RoomCode) -> bool {
        self.inner.timers.is_armed(code).await
    }

    /// The orchestrator's settings.
    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    /// The scheduler running the countdowns and evaluations.
    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    // -----------------------------------------------------------------------
    // Countdown and evaluation
    // -----------------------------------------------------------------------

    async fn on_tick(&self, code: RoomCode, entry: RoomEntry, generation: u64) {
        let mut room = entry.lock().await;
        match room.tick() {
            Tick::Counted(remaining) => {
                trace!(room = %code, remaining, "tick");
                self.publish(&code, Notification::Tick { remaining });
            }
            Tick::Expired => {
                self.publish(&code, Notification::Tick { remaining: 0 });
                info!(
                    room = %code,
                    submissions = room.submissions().len(),
                    "round finished: evaluating after grace period"
                );
                drop(room);

                self.inner.timers.release(&code, generation).await;
                let this = self.clone();
                let eval_code = code.clone();
                let grace = self.inner.config.grace_period;
                self.inner
                    .timers
                    .arm_with(&code, |generation| {
                        self.inner.scheduler.schedule_once(grace, move || async move {
                            this.evaluate(eval_code, entry, generation).await
                        })
                    })
                    .await;
            }
            Tick::Stale(phase) => {
                drop(room);
                debug!(room = %code, %phase, "countdown outlived its round: stopping");
                self.inner.timers.release(&code, generation).await;
            }
        }
    }

    async fn evaluate(&self, code: RoomCode, entry: RoomEntry, generation: u64) {
        let (word, submissions) = {
            let room = entry.lock().await;
            if room.phase() != Phase::Finished {
                debug!(room = %code, phase = %room.phase(), "evaluation skipped");
                drop(room);
                self.inner.timers.release(&code, generation).await;
                return;
            }
            (
                room.current_word().unwrap_or_default().to_string(),
                room.submissions().clone(),
            )
        };

        let mut results = Vec::with_capacity(submissions.len());
        for (player, drawing) in submissions {
            let score = match self.inner.oracle.evaluate_drawing(&drawing, &word).await {
                Ok(score) => score.min(MAX_SCORE),
                Err(e) => {
                    warn!(room = %code, %player, error = %e, "evaluation failed: scoring 0");
                    0
                }
            };
            trace!(room = %code, %player, score, "drawing scored");
            results.push((player, score));
        }

        let snapshot = {
            let mut room = entry.lock().await;
            match room.conclude_round(results) {
                Ok(outcome) => info!(room = %code, %outcome, "round evaluated"),
                Err(e) => {
                    // Aborted while the oracle was working.
                    info!(room = %code, error = %e, "discarding evaluation");
                    return;
                }
            }
            room.clone()
        };

        self.archive(snapshot.clone()).await;
        self.inner.rooms.remove_entry(&code, &entry).await;
        self.inner.timers.release(&code, generation).await;
        self.publish(
            &code,
            Notification::Scores {
                scores: snapshot.scores().clone(),
            },
        );
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn entry(&self, code: &RoomCode) -> Result<RoomEntry, RoomError> {
        self.inner
            .rooms
            .get(code)
            .await
            .ok_or_else(|| RoomError::NotFound(code.clone()))
    }

    async fn pick_word(&self, code: &RoomCode) -> String {
        match self.inner.oracle.random_word().await {
            Ok(raw) => match normalize_word(&raw) {
                Some(word) => word,
                None => {
                    warn!(room = %code, "word source returned a blank word: using fallback list");
                    fallback_word()
                }
            },
            Err(e) => {
                warn!(room = %code, error = %e, "word source failed: using fallback list");
                fallback_word()
            }
        }
    }

    async fn archive(&self, room: Room) {
        let code = room.code().clone();
        let phase = room.phase();
        match self.inner.archive.save(room).await {
            Ok(()) => debug!(room = %code, %phase, "room archived"),
            Err(e) => error!(room = %code, %phase, error = %e, "failed to archive room"),
        }
    }

    fn publish(&self, code: &RoomCode, notification: Notification) {
        self.inner.sink.publish(notification.topic(code), notification);
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
