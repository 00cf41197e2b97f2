//! The room entity: roster, phase, countdown, word, submissions, scores.
//!
//! A `Room` is plain data. It is always reached through the
//! orchestrator's table, which wraps each one in a `tokio::sync::Mutex`,
//! so every method here runs with the room's lock held. Callers outside
//! the crate only ever see cloned snapshots.

use std::collections::BTreeMap;
use std::fmt;

use drawsync_protocol::{PlayerId, RoomCode, Scoreboard};
use serde::{Deserialize, Serialize};

use crate::{Phase, RoomError, RoomSettings};

/// Winner label stored for rooms whose last player left.
pub const ABANDONED: &str = "Abandoned";

/// Winner label stored for rooms aborted by their creator.
pub const ABORTED: &str = "Aborted";

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// How a room ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Evaluation picked a highest scorer.
    Winner(PlayerId),
    /// Evaluation ran but nobody scored.
    NoWinner,
    /// The last player left the lobby.
    Abandoned,
    /// The room was aborted.
    Aborted,
}

impl Outcome {
    /// The label clients see in the `winner` slot.
    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Winner(player) => Some(player.as_str()),
            Self::NoWinner => None,
            Self::Abandoned => Some(ABANDONED),
            Self::Aborted => Some(ABORTED),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label().unwrap_or("no winner"))
    }
}

/// What one countdown tick did to the room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tick {
    /// One second came off the clock; this many remain.
    Counted(u32),
    /// The clock was already at zero; the room is now `Finished`.
    Expired,
    /// The room is not `Playing` any more. The countdown should stop.
    Stale(Phase),
}

// ---------------------------------------------------------------------------
// Room
// ---------------------------------------------------------------------------

/// One game session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    code: RoomCode,
    players: Vec<PlayerId>,
    max_players: usize,
    round_duration_secs: u32,
    time_remaining_secs: u32,
    is_private: bool,
    phase: Phase,
    current_word: Option<String>,
    submissions: BTreeMap<PlayerId, String>,
    scores: Scoreboard,
    outcome: Option<Outcome>,
    created_at_ms: u64,
}

impl Room {
    /// A fresh lobby holding only its creator.
    pub(crate) fn new(
        code: RoomCode,
        creator: PlayerId,
        settings: RoomSettings,
        created_at_ms: u64,
    ) -> Self {
        let mut scores = Scoreboard::new();
        scores.ensure(&creator);
        Self {
            code,
            players: vec![creator],
            max_players: settings.max_players,
            round_duration_secs: settings.round_duration_secs,
            time_remaining_secs: settings.round_duration_secs,
            is_private: settings.is_private,
            phase: Phase::Lobby,
            current_word: None,
            submissions: BTreeMap::new(),
            scores,
            outcome: None,
            created_at_ms,
        }
    }

    // -- Accessors ----------------------------------------------------------

    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Players in join order.
    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn max_players(&self) -> usize {
        self.max_players
    }

    pub fn round_duration_secs(&self) -> u32 {
        self.round_duration_secs
    }

    pub fn time_remaining_secs(&self) -> u32 {
        self.time_remaining_secs
    }

    pub fn is_private(&self) -> bool {
        self.is_private
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The word to draw, once the round has started and a word arrived.
    pub fn current_word(&self) -> Option<&str> {
        self.current_word.as_deref()
    }

    /// Latest drawing per player.
    pub fn submissions(&self) -> &BTreeMap<PlayerId, String> {
        &self.submissions
    }

    pub fn scores(&self) -> &Scoreboard {
        &self.scores
    }

    /// How the room ended, if it has.
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    /// The winner label: a player id, `"Abandoned"`, `"Aborted"`, or
    /// `None` while undecided or when nobody scored.
    pub fn winner(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(Outcome::label)
    }

    /// Creation time, in milliseconds since the Unix epoch.
    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    pub fn contains(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= self.max_players
    }

    // -- Mutation (crate only) ---------------------------------------------

    /// Moves to `target` if the phase table allows it.
    pub(crate) fn transition(&mut self, target: Phase, operation: &'static str) -> Result<(), RoomError> {
        if !self.phase.can_transition_to(target) {
            return Err(RoomError::InvalidPhase {
                code: self.code.clone(),
                phase: self.phase,
                operation,
            });
        }
        tracing::debug!(room = %self.code, from = %self.phase, to = %target, "phase change");
        self.phase = target;
        Ok(())
    }

    /// Appends `player` to the roster and gives them a zero score.
    ///
    /// Capacity and phase are the caller's to check.
    pub(crate) fn add_player(&mut self, player: PlayerId) {
        self.scores.ensure(&player);
        self.players.push(player);
    }

    /// Drops one roster entry for `player`. Their score and drawing go
    /// with it once no entry is left. Returns `false` if absent.
    pub(crate) fn remove_player(&mut self, player: &PlayerId) -> bool {
        let Some(index) = self.players.iter().position(|p| p == player) else {
            return false;
        };
        self.players.remove(index);
        if !self.contains(player) {
            self.scores.remove(player);
            self.submissions.remove(player);
        }
        true
    }

    /// `Lobby → Playing` with a full clock.
    pub(crate) fn begin_round(&mut self) -> Result<(), RoomError> {
        self.transition(Phase::Playing, "start")?;
        self.time_remaining_secs = self.round_duration_secs;
        for player in &self.players {
            self.scores.ensure(player);
        }
        Ok(())
    }

    /// Sets the round's word. Only the first call per round wins.
    pub(crate) fn set_word(&mut self, word: String) -> bool {
        if self.current_word.is_some() {
            return false;
        }
        self.current_word = Some(word);
        true
    }

    /// Advances the countdown by one tick.
    ///
    /// At zero, the next tick ends the round instead of decrementing.
    pub(crate) fn tick(&mut self) -> Tick {
        if self.phase != Phase::Playing {
            return Tick::Stale(self.phase);
        }
        if self.time_remaining_secs > 0 {
            self.time_remaining_secs -= 1;
            return Tick::Counted(self.time_remaining_secs);
        }
        match self.transition(Phase::Finished, "finish") {
            Ok(()) => Tick::Expired,
            Err(_) => Tick::Stale(self.phase),
        }
    }

    /// Stores `drawing` as `player`'s latest submission.
    ///
    /// Returns `true` if it replaced an earlier one.
    pub(crate) fn record_submission(&mut self, player: PlayerId, drawing: String) -> bool {
        self.submissions.insert(player, drawing).is_some()
    }

    /// Writes evaluation results and picks the winner.
    ///
    /// Only valid once per round, while `Finished` and unconcluded.
    pub(crate) fn conclude_round(&mut self, results: Vec<(PlayerId, u32)>) -> Result<&Outcome, RoomError> {
        if self.phase != Phase::Finished || self.outcome.is_some() {
            return Err(RoomError::InvalidPhase {
                code: self.code.clone(),
                phase: self.phase,
                operation: "evaluate",
            });
        }
        for (player, score) in results {
            self.scores.set(&player, score);
        }
        let outcome = match self.scores.leader() {
            Some(leader) => Outcome::Winner(leader.clone()),
            None => Outcome::NoWinner,
        };
        Ok(self.outcome.insert(outcome))
    }

    /// Ends the room early with `outcome` (`Abandoned` or `Aborted`).
    ///
    /// A room whose evaluation already concluded can't be aborted.
    pub(crate) fn end_early(&mut self, outcome: Outcome, operation: &'static str) -> Result<(), RoomError> {
        if self.outcome.is_some() {
            return Err(RoomError::InvalidPhase {
                code: self.code.clone(),
                phase: self.phase,
                operation,
            });
        }
        self.transition(Phase::Aborted, operation)?;
        self.outcome = Some(outcome);
        Ok(())
    }
}
