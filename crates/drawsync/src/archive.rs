//! [`MemoryArchive`]: an in-process [`ArchiveStore`].
//!
//! Keeps every ended room for the life of the process. Good enough for
//! development, demos, and tests; a real deployment plugs in a database.

use std::sync::Arc;

use drawsync_protocol::PlayerId;
use drawsync_room::{ArchiveStore, DependencyError, Phase, Room};
use tokio::sync::RwLock;

/// Ended rooms, in the order they were saved.
///
/// Cheap to clone; clones share storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryArchive {
    rooms: Arc<RwLock<Vec<Room>>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every saved room, oldest save first.
    pub async fn all(&self) -> Vec<Room> {
        self.rooms.read().await.clone()
    }

    /// Number of saved rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl ArchiveStore for MemoryArchive {
    async fn save(&self, room: Room) -> Result<(), DependencyError> {
        tracing::debug!(room = %room.code(), phase = %room.phase(), "archiving room");
        self.rooms.write().await.push(room);
        Ok(())
    }

    async fn recent_finished(&self, player: &PlayerId, limit: usize) -> Result<Vec<Room>, DependencyError> {
        let rooms = self.rooms.read().await;
        // Walk newest save first so equal timestamps keep save order.
        let mut matching: Vec<Room> = rooms
            .iter()
            .rev()
            .filter(|room| room.phase() == Phase::Finished && room.contains(player))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at_ms().cmp(&a.created_at_ms()));
        matching.truncate(limit);
        Ok(matching)
    }
}
