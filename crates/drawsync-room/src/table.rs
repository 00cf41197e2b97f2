//! Live room storage with per-room locking.
//!
//! [`RoomTable`] maps room codes to rooms. The outer map sits behind a
//! `RwLock`; each room sits behind its own `Mutex`, so operations on
//! different rooms never wait on each other.
//!
//! Lock order: never lock a room while holding the table lock. Methods
//! here clone the `Arc` out and release the map before returning.

use std::collections::HashMap;
use std::sync::Arc;

use drawsync_protocol::RoomCode;
use rand::Rng;
use tokio::sync::{Mutex, RwLock};

use crate::Room;

/// Characters a generated code is drawn from.
const CODE_ALPHABET: &[u8] = b"0123456789ABCDEF";

/// Collisions tolerated at one length before codes get one char longer.
const ATTEMPTS_PER_LENGTH: usize = 32;

/// Shared handle to one live room.
pub type RoomEntry = Arc<Mutex<Room>>;

/// The set of live rooms, keyed by code.
#[derive(Debug)]
pub struct RoomTable {
    rooms: RwLock<HashMap<RoomCode, RoomEntry>>,
    code_len: usize,
}

impl RoomTable {
    /// Default length of generated codes.
    pub const DEFAULT_CODE_LEN: usize = 4;

    /// Creates an empty table issuing 4-character codes.
    pub fn new() -> Self {
        Self::with_code_len(Self::DEFAULT_CODE_LEN)
    }

    /// Creates an empty table issuing codes of `code_len` characters.
    pub fn with_code_len(code_len: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            code_len: code_len.clamp(1, RoomCode::MAX_LEN),
        }
    }

    /// Picks an unused code, builds the room with it, and inserts it.
    ///
    /// The code is chosen and claimed under one write lock, so two
    /// concurrent creations can't end up with the same code.
    pub async fn insert_new(&self, build: impl FnOnce(RoomCode) -> Room) -> RoomEntry {
        let mut map = self.rooms.write().await;
        let mut len = self.code_len;
        let code = 'search: loop {
            for _ in 0..ATTEMPTS_PER_LENGTH {
                let candidate = generate_code(len);
                if !map.contains_key(&candidate) {
                    break 'search candidate;
                }
            }
            tracing::warn!(len, "room code space crowded: lengthening codes");
            len = (len + 1).min(RoomCode::MAX_LEN);
        };
        let entry = Arc::new(Mutex::new(build(code.clone())));
        map.insert(code, Arc::clone(&entry));
        entry
    }

    /// Returns the room for `code`, if live.
    pub async fn get(&self, code: &RoomCode) -> Option<RoomEntry> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Removes and returns the room for `code`.
    pub async fn remove(&self, code: &RoomCode) -> Option<RoomEntry> {
        self.rooms.write().await.remove(code)
    }

    /// Removes `code` only if it still maps to `entry`.
    ///
    /// Protects a newer room that happens to reuse the code.
    pub async fn remove_entry(&self, code: &RoomCode, entry: &RoomEntry) -> bool {
        let mut map = self.rooms.write().await;
        match map.get(code) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                map.remove(code);
                true
            }
            _ => false,
        }
    }

    /// Every live room. The table lock is released before returning.
    pub async fn entries(&self) -> Vec<RoomEntry> {
        self.rooms.read().await.values().cloned().collect()
    }

    /// Returns the number of live rooms.
    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    /// Returns `true` if no rooms are live.
    pub async fn is_empty(&self) -> bool {
        self.rooms.read().await.is_empty()
    }
}

impl Default for RoomTable {
    fn default() -> Self {
        Self::new()
    }
}

/// A random code of `len` uppercase hex characters.
pub fn generate_code(len: usize) -> RoomCode {
    let mut rng = rand::rng();
    let code: String = (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RoomCode::new(code)
}

#[cfg(test)]
mod tests {
    use drawsync_protocol::PlayerId;

    use super::*;
    use crate::RoomSettings;

    fn build(code: RoomCode) -> Room {
        Room::new(code, PlayerId::from("ana"), RoomSettings::default(), 0)
    }

    #[test]
    fn test_generate_code_is_uppercase_hex() {
        for _ in 0..100 {
            let code = generate_code(4);
            assert_eq!(code.as_str().len(), 4);
            assert!(
                code.as_str()
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)),
                "unexpected code {code}"
            );
        }
    }

    #[tokio::test]
    async fn test_insert_new_registers_room_under_its_code() {
        let table = RoomTable::new();
        let entry = table.insert_new(build).await;
        let code = entry.lock().await.code().clone();

        let found = table.get(&code).await.unwrap();
        assert!(Arc::ptr_eq(&found, &entry));
        assert_eq!(table.len().await, 1);
    }

    #[tokio::test]
    async fn test_insert_new_never_reuses_a_live_code() {
        // One-char codes: only 16 exist, so collisions are guaranteed
        // well before 16 rooms and the generator must work around them.
        let table = RoomTable::with_code_len(1);
        for _ in 0..40 {
            table.insert_new(build).await;
        }
        assert_eq!(table.len().await, 40);
    }

    #[tokio::test]
    async fn test_remove_entry_ignores_replaced_room() {
        let table = RoomTable::new();
        let entry = table.insert_new(build).await;
        let code = entry.lock().await.code().clone();
        let stranger = Arc::new(Mutex::new(build(code.clone())));

        assert!(!table.remove_entry(&code, &stranger).await);
        assert!(table.get(&code).await.is_some());
        assert!(table.remove_entry(&code, &entry).await);
        assert!(table.is_empty().await);
    }

    #[tokio::test]
    async fn test_get_unknown_code_returns_none() {
        let table = RoomTable::new();
        assert!(table.get(&RoomCode::new("ZZZZ")).await.is_none());
        assert!(table.remove(&RoomCode::new("ZZZZ")).await.is_none());
    }
}
