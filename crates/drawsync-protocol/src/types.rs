//! Core protocol types: identifiers, topics, and notification payloads.
//!
//! Everything here is serializable because it leaves the process: either
//! pushed to clients through a broadcast sink or written to an archive.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player identifier, as issued by the (external) identity layer.
///
/// Newtype over `String` so a player name can't be passed where a room
/// code is expected. `#[serde(transparent)]` keeps the JSON a plain
/// string: `PlayerId("ana")` serializes as `"ana"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    /// Creates a player id from anything string-like.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The short, human-shareable code that identifies a live room.
///
/// Codes are uppercase ASCII alphanumerics. [`FromStr`] accepts user
/// input in any case and normalizes it, so `"ab12"` and `"AB12"` name
/// the same room.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Longest code accepted from outside.
    pub const MAX_LEN: usize = 16;

    /// Wraps an already-normalized code. Used by the code generator.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty()
            || trimmed.len() > Self::MAX_LEN
            || !trimmed.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(ProtocolError::InvalidRoomCode(s.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }
}

// ---------------------------------------------------------------------------
// Topics
// ---------------------------------------------------------------------------

/// The channels a room publishes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicKind {
    /// Roster updates after a join or leave.
    Players,
    /// The round's target word, once per round.
    Word,
    /// Per-second countdown values.
    Timer,
    /// Notice that the room was aborted.
    Abort,
    /// Final score mapping after evaluation.
    Scores,
}

impl TopicKind {
    /// The path segment used in the topic address.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Players => "players",
            Self::Word => "word",
            Self::Timer => "timer",
            Self::Abort => "abort",
            Self::Scores => "scores",
        }
    }
}

/// A fully-qualified publish address: one room, one kind of event.
///
/// Displays as `/topic/{code}/{kind}`, which is what clients subscribe to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Topic {
    /// The room this topic belongs to.
    pub room: RoomCode,
    /// What kind of event travels on it.
    pub kind: TopicKind,
}

impl Topic {
    /// Builds the topic for `room` and `kind`.
    pub fn new(room: RoomCode, kind: TopicKind) -> Self {
        Self { room, kind }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "/topic/{}/{}", self.room, self.kind.as_str())
    }
}

// ---------------------------------------------------------------------------
// Scoreboard
// ---------------------------------------------------------------------------

/// One player's score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Who scored.
    pub player: PlayerId,
    /// Score in the oracle's 0–100 range.
    pub score: u32,
}

/// Player → score, in first-seen order.
///
/// Order matters: it breaks ties when picking a winner. A `Vec` is
/// used instead of a hash map because rosters are tiny (a handful of
/// players) and iteration order has to be stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scoreboard(Vec<ScoreEntry>);

impl Scoreboard {
    /// Creates an empty scoreboard.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the score recorded for `player`, if any.
    pub fn get(&self, player: &PlayerId) -> Option<u32> {
        self.0
            .iter()
            .find(|e| &e.player == player)
            .map(|e| e.score)
    }

    /// Adds `player` with a score of 0 unless they already have an entry.
    pub fn ensure(&mut self, player: &PlayerId) {
        if self.get(player).is_none() {
            self.0.push(ScoreEntry {
                player: player.clone(),
                score: 0,
            });
        }
    }

    /// Records `score` for `player`, keeping their original position if
    /// they already had an entry.
    pub fn set(&mut self, player: &PlayerId, score: u32) {
        match self.0.iter_mut().find(|e| &e.player == player) {
            Some(entry) => entry.score = score,
            None => self.0.push(ScoreEntry {
                player: player.clone(),
                score,
            }),
        }
    }

    /// Removes `player`'s entry. Returns `true` if one existed.
    pub fn remove(&mut self, player: &PlayerId) -> bool {
        let before = self.0.len();
        self.0.retain(|e| &e.player != player);
        self.0.len() != before
    }

    /// The player with the strictly highest score.
    ///
    /// Ties go to whoever appears first. Returns `None` when the board is
    /// empty or every score is 0: nobody won.
    pub fn leader(&self) -> Option<&PlayerId> {
        let mut best: Option<&ScoreEntry> = None;
        for entry in &self.0 {
            if best.is_none_or(|b| entry.score > b.score) {
                best = Some(entry);
            }
        }
        best.filter(|b| b.score > 0).map(|b| &b.player)
    }

    /// Iterates entries in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = &ScoreEntry> {
        self.0.iter()
    }

    /// Number of players on the board.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if nobody is on the board.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Notification: what gets published
// ---------------------------------------------------------------------------

/// A state-change notification pushed to a room's subscribers.
///
/// Internally tagged, so the JSON reads
/// `{ "type": "Tick", "remaining": 42 }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Notification {
    /// The roster after a join or leave, in join order.
    Roster { players: Vec<PlayerId> },

    /// The word to draw this round.
    Word { word: String },

    /// Seconds left on the countdown. A final `0` marks the round's end.
    Tick { remaining: u32 },

    /// The room was aborted and is gone.
    Aborted { reason: String },

    /// Final scores once every submission has been evaluated.
    Scores { scores: Scoreboard },
}

impl Notification {
    /// The topic kind this notification is published under.
    pub fn kind(&self) -> TopicKind {
        match self {
            Self::Roster { .. } => TopicKind::Players,
            Self::Word { .. } => TopicKind::Word,
            Self::Tick { .. } => TopicKind::Timer,
            Self::Aborted { .. } => TopicKind::Abort,
            Self::Scores { .. } => TopicKind::Scores,
        }
    }

    /// The full topic for this notification in `room`.
    pub fn topic(&self, room: &RoomCode) -> Topic {
        Topic::new(room.clone(), self.kind())
    }
}

// =========================================================================
// Tests
// =========================================================================
