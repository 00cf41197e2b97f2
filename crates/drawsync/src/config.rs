//! Configuration loaded from environment variables.
//!
//! All settings come from `DRAWSYNC_*` environment variables, or from a
//! `.env` file picked up by `dotenvy`. Unset variables use the defaults
//! below; set-but-unparsable ones are logged and also fall back.
//!
//! | variable | default |
//! |---|---|
//! | `DRAWSYNC_MAX_PLAYERS` | 4 |
//! | `DRAWSYNC_ROUND_SECS` | 60 |
//! | `DRAWSYNC_GRACE_MILLIS` | 10000 |
//! | `DRAWSYNC_TICK_MILLIS` | 1000 |
//! | `DRAWSYNC_RECENT_LIMIT` | 3 |
//! | `DRAWSYNC_BROADCAST_CAPACITY` | 1024 |

use std::str::FromStr;
use std::time::Duration;

use drawsync_room::{OrchestratorConfig, RoomSettings};

use crate::DrawSyncError;

/// Process-level DrawSync settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawSyncConfig {
    /// Default room capacity.
    pub max_players: usize,

    /// Default round length in seconds.
    pub round_secs: u32,

    /// Milliseconds between a round's end and its evaluation.
    pub grace_millis: u64,

    /// Countdown resolution in milliseconds.
    pub tick_millis: u64,

    /// Rooms returned by a history query.
    pub recent_limit: usize,

    /// Buffered notifications per [`ChannelSink`](crate::ChannelSink)
    /// before slow subscribers start missing some.
    pub broadcast_capacity: usize,
}

impl Default for DrawSyncConfig {
    fn default() -> Self {
        Self {
            max_players: 4,
            round_secs: 60,
            grace_millis: 10_000,
            tick_millis: 1_000,
            recent_limit: 3,
            broadcast_capacity: 1_024,
        }
    }
}

impl DrawSyncConfig {
    /// Loads configuration from the process environment.
    ///
    /// Calls `dotenvy::dotenv().ok()` first to optionally load a `.env`
    /// file.
    ///
    /// # Errors
    ///
    /// Returns [`DrawSyncError::Config`] if a value parses but is out of
    /// range (see [`validate`](Self::validate)).
    pub fn from_env() -> Result<Self, DrawSyncError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup.
    ///
    /// [`from_env`](Self::from_env) passes the process environment; tests
    /// pass a map.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DrawSyncError> {
        let defaults = Self::default();
        let config = Self {
            max_players: parse_var(&lookup, "DRAWSYNC_MAX_PLAYERS", defaults.max_players),
            round_secs: parse_var(&lookup, "DRAWSYNC_ROUND_SECS", defaults.round_secs),
            grace_millis: parse_var(&lookup, "DRAWSYNC_GRACE_MILLIS", defaults.grace_millis),
            tick_millis: parse_var(&lookup, "DRAWSYNC_TICK_MILLIS", defaults.tick_millis),
            recent_limit: parse_var(&lookup, "DRAWSYNC_RECENT_LIMIT", defaults.recent_limit),
            broadcast_capacity: parse_var(
                &lookup,
                "DRAWSYNC_BROADCAST_CAPACITY",
                defaults.broadcast_capacity,
            ),
        };
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the orchestrator can't run with.
    ///
    /// # Errors
    ///
    /// [`DrawSyncError::Config`] naming the first offending variable.
    pub fn validate(&self) -> Result<(), DrawSyncError> {
        let checks: [(&'static str, u64); 3] = [
            ("DRAWSYNC_MAX_PLAYERS", self.max_players as u64),
            ("DRAWSYNC_TICK_MILLIS", self.tick_millis),
            ("DRAWSYNC_BROADCAST_CAPACITY", self.broadcast_capacity as u64),
        ];
        for (key, value) in checks {
            if value == 0 {
                return Err(DrawSyncError::Config {
                    key,
                    value: value.to_string(),
                    reason: "must be at least 1",
                });
            }
        }
        Ok(())
    }

    /// Default settings for new rooms.
    pub fn room_settings(&self) -> RoomSettings {
        RoomSettings {
            max_players: self.max_players,
            round_duration_secs: self.round_secs,
            is_private: false,
        }
    }

    /// The orchestrator half of the configuration.
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            tick_interval: Duration::from_millis(self.tick_millis),
            grace_period: Duration::from_millis(self.grace_millis),
            recent_limit: self.recent_limit,
            room_defaults: self.room_settings(),
        }
    }
}

/// Parses `key` as `T`, returning `default` on missing or invalid values.
fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(key, value = %raw, "unparsable setting: using default");
            default
        }
    }
}
