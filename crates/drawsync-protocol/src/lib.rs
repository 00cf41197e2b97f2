//! Wire-level vocabulary for DrawSync.
//!
//! This crate defines what the orchestrator says to the outside world:
//!
//! - **Identity** ([`PlayerId`], [`RoomCode`]): who and where.
//! - **Topics** ([`Topic`], [`TopicKind`]): the address a notification
//!   is published under (`/topic/{code}/timer`, ...).
//! - **Payloads** ([`Notification`], [`Scoreboard`]): what is published.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how payloads become
//!   bytes for a transport.
//!
//! It knows nothing about rooms, timers, or scoring. Those live in
//! `drawsync-room`.
//!
//! ```text
//! Orchestrator (room) → Notification → Codec → bytes → Broadcast sink
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    Notification, PlayerId, RoomCode, ScoreEntry, Scoreboard, Topic,
    TopicKind,
};
