//! Per-room timer bookkeeping.
//!
//! A room owns at most one scheduled task at a time: its countdown
//! while `Playing`, then its evaluation while `Finished`. Arming a new
//! task for a room cancels whatever was there.
//!
//! Each arming gets a generation number. A task that wants to retire
//! itself calls [`TimerRegistry::release`] with its own generation, so
//! it can't clobber a task armed after it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use drawsync_protocol::RoomCode;
use drawsync_tick::TaskHandle;
use tokio::sync::Mutex;
use tracing::{debug, trace};

#[derive(Debug)]
struct Armed {
    generation: u64,
    handle: TaskHandle,
}

/// Room code → the room's active timer.
#[derive(Debug, Default)]
pub struct TimerRegistry {
    timers: Mutex<HashMap<RoomCode, Armed>>,
    next_generation: AtomicU64,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a task for `code` and records it, cancelling any
    /// previous one. Returns the new task's generation.
    ///
    /// `schedule` receives the generation before the task exists and
    /// runs with the registry locked. A task that immediately tries to
    /// [`release`](Self::release) itself therefore waits until it has
    /// been recorded.
    pub async fn arm_with(&self, code: &RoomCode, schedule: impl FnOnce(u64) -> TaskHandle) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let mut timers = self.timers.lock().await;
        let handle = schedule(generation);
        debug!(room = %code, task = handle.id(), generation, "timer armed");
        if let Some(previous) = timers.insert(code.clone(), Armed { generation, handle }) {
            debug!(room = %code, task = previous.handle.id(), "replacing existing timer");
            previous.handle.cancel();
        }
        generation
    }

    /// Cancels and forgets `code`'s timer. Returns `true` if one existed.
    pub async fn disarm(&self, code: &RoomCode) -> bool {
        match self.timers.lock().await.remove(code) {
            Some(armed) => {
                armed.handle.cancel();
                debug!(room = %code, task = armed.handle.id(), "timer disarmed");
                true
            }
            None => false,
        }
    }

    /// Cancels and forgets `code`'s timer, but only if it is still
    /// `generation`. Returns `true` if it was.
    ///
    /// A `false` return means the task was already replaced or disarmed,
    /// and therefore already cancelled.
    pub async fn release(&self, code: &RoomCode, generation: u64) -> bool {
        let mut timers = self.timers.lock().await;
        match timers.get(code) {
            Some(armed) if armed.generation == generation => {
                if let Some(armed) = timers.remove(code) {
                    armed.handle.cancel();
                    trace!(room = %code, generation, "timer released");
                }
                true
            }
            _ => false,
        }
    }

    /// Whether `code` has a timer that hasn't ended yet.
    pub async fn is_armed(&self, code: &RoomCode) -> bool {
        self.timers
            .lock()
            .await
            .get(code)
            .is_some_and(|armed| !armed.handle.is_cancelled() && !armed.handle.is_finished())
    }

    /// Number of rooms with a recorded timer.
    pub async fn len(&self) -> usize {
        self.timers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.timers.lock().await.is_empty()
    }
}
