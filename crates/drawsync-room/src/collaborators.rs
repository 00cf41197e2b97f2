//! The seams to the outside world.
//!
//! The orchestrator owns rooms and timers; everything else is someone
//! else's job, reached through one of these traits:
//!
//! - [`ScoringOracle`]: picks words and scores drawings (typically an
//!   AI service, slow and fallible)
//! - [`ArchiveStore`]: keeps ended rooms (typically a database)
//! - [`BroadcastSink`]: pushes notifications to subscribers (typically
//!   a pub/sub transport)
//!
//! Each is `Send + Sync + 'static` because the orchestrator shares it
//! with every room's timer task.

use std::future::Future;
use std::sync::Arc;

use drawsync_protocol::{Notification, PlayerId, Topic};

use crate::{DependencyError, Room};

/// Source of round words and drawing scores.
///
/// Implementations may take seconds per call. The orchestrator never
/// holds a room lock while awaiting one.
///
/// # Example
///
/// ```rust
/// use drawsync_room::{DependencyError, ScoringOracle};
///
/// struct AlwaysCat;
///
/// impl ScoringOracle for AlwaysCat {
///     async fn random_word(&self) -> Result<String, DependencyError> {
///         Ok("Gato".to_string())
///     }
///
///     async fn evaluate_drawing(&self, _drawing: &str, _word: &str) -> Result<u32, DependencyError> {
///         Ok(50)
///     }
/// }
/// ```
pub trait ScoringOracle: Send + Sync + 'static {
    /// A word for the next round.
    ///
    /// On error, or if the word is blank after trimming, the
    /// orchestrator uses its built-in list instead.
    fn random_word(&self) -> impl Future<Output = Result<String, DependencyError>> + Send;

    /// Scores `drawing` (an encoded image) against `word`, 0–100.
    ///
    /// On error the drawing scores 0. Values above 100 are capped.
    fn evaluate_drawing(
        &self,
        drawing: &str,
        word: &str,
    ) -> impl Future<Output = Result<u32, DependencyError>> + Send;
}

/// Durable record of ended rooms.
pub trait ArchiveStore: Send + Sync + 'static {
    /// Stores a room that just reached `Finished` or `Aborted`.
    ///
    /// Failures are logged by the orchestrator and otherwise ignored;
    /// the round's outcome has already been broadcast or decided.
    fn save(&self, room: Room) -> impl Future<Output = Result<(), DependencyError>> + Send;

    /// Up to `limit` `Finished` rooms `player` took part in, newest
    /// first.
    fn recent_finished(
        &self,
        player: &PlayerId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Room>, DependencyError>> + Send;
}

/// Fire-and-forget publisher for room notifications.
///
/// `publish` is synchronous and must not block: it is called with a
/// room's lock held. Delivery problems are the sink's to log.
pub trait BroadcastSink: Send + Sync + 'static {
    fn publish(&self, topic: Topic, notification: Notification);
}

// ---------------------------------------------------------------------------
// Shared collaborators
// ---------------------------------------------------------------------------

// Callers often keep a handle on a collaborator (to read an archive
// back, or subscribe to a sink), so an `Arc` of one is one too.

impl<T: ScoringOracle> ScoringOracle for Arc<T> {
    fn random_word(&self) -> impl Future<Output = Result<String, DependencyError>> + Send {
        (**self).random_word()
    }

    fn evaluate_drawing(
        &self,
        drawing: &str,
        word: &str,
    ) -> impl Future<Output = Result<u32, DependencyError>> + Send {
        (**self).evaluate_drawing(drawing, word)
    }
}

impl<T: ArchiveStore> ArchiveStore for Arc<T> {
    fn save(&self, room: Room) -> impl Future<Output = Result<(), DependencyError>> + Send {
        (**self).save(room)
    }

    fn recent_finished(
        &self,
        player: &PlayerId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<Room>, DependencyError>> + Send {
        (**self).recent_finished(player, limit)
    }
}

impl<T: BroadcastSink> BroadcastSink for Arc<T> {
    fn publish(&self, topic: Topic, notification: Notification) {
        (**self).publish(topic, notification);
    }
}
