//! Room settings, orchestrator settings, and the phase state machine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomSettings
// ---------------------------------------------------------------------------

/// Per-room options chosen by the creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Maximum players allowed in the room. Joins fail once reached.
    pub max_players: usize,

    /// Length of a round in seconds.
    pub round_duration_secs: u32,

    /// Hidden from public discovery. The orchestrator itself ignores it.
    pub is_private: bool,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            max_players: 4,
            round_duration_secs: 60,
            is_private: false,
        }
    }
}

impl RoomSettings {
    /// Fix values that would make a room unusable.
    ///
    /// A room always admits its creator, so `max_players` is at least 1.
    pub fn validated(mut self) -> Self {
        if self.max_players == 0 {
            tracing::warn!("max_players of 0: raising to 1");
            self.max_players = 1;
        }
        self
    }
}

// ---------------------------------------------------------------------------
// OrchestratorConfig
// ---------------------------------------------------------------------------

/// Timing and query settings for the session orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Countdown resolution. One tick removes one second from the clock.
    pub tick_interval: Duration,

    /// Delay between a round's end and its evaluation, so drawings sent
    /// right at the buzzer still make it in.
    pub grace_period: Duration,

    /// How many archived rooms [`recent_games`] returns.
    ///
    /// [`recent_games`]: crate::SessionOrchestrator::recent_games
    pub recent_limit: usize,

    /// Settings used by [`create`](crate::SessionOrchestrator::create).
    pub room_defaults: RoomSettings,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            grace_period: Duration::from_secs(10),
            recent_limit: 3,
            room_defaults: RoomSettings::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a room.
///
/// ```text
/// Lobby ──start──→ Playing ──countdown hits 0──→ Finished
///   │                 │                              │
///   └──abort/leave────┴──────────abort───────────────┴──→ Aborted
/// ```
///
/// - **Lobby**: accepting players, no timer.
/// - **Playing**: countdown running, drawings being submitted.
/// - **Finished**: round over; evaluation pending or done.
/// - **Aborted**: ended early. Terminal.
///
/// `Finished → Aborted` is only reachable while evaluation is still
/// pending; the room-level guard lives in `Room::end_early`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    Playing,
    Finished,
    Aborted,
}

impl Phase {
    /// Returns `true` if the room accepts new players.
    ///
    /// Late joins during `Playing` are allowed.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Lobby | Self::Playing)
    }

    /// Returns `true` once the room's round can no longer change.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Aborted)
    }

    /// The single table of legal transitions.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Lobby, Self::Playing)
                | (Self::Playing, Self::Finished)
                | (Self::Lobby, Self::Aborted)
                | (Self::Playing, Self::Aborted)
                | (Self::Finished, Self::Aborted)
        )
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::Playing => write!(f, "Playing"),
            Self::Finished => write!(f, "Finished"),
            Self::Aborted => write!(f, "Aborted"),
        }
    }
}
