//! Cancellable timer scheduling for DrawSync.
//!
//! A [`Scheduler`] runs two kinds of work on the shared Tokio worker pool:
//!
//! - **Repeating**: [`Scheduler::schedule_repeating`] fires immediately,
//!   then every `interval`, until its [`TaskHandle`] is cancelled. Room
//!   countdowns use this.
//! - **One-shot**: [`Scheduler::schedule_once`] fires once after `delay`
//!   unless cancelled first. The post-round evaluation uses this.
//!
//! # Cancellation
//!
//! Cancellation is best-effort. A callback that is already running is
//! never interrupted (it is not raced against the cancel signal), but no
//! further invocation starts once [`TaskHandle::cancel`] returns. A
//! callback may cancel its own handle.
//!
//! # Overruns
//!
//! Each repeating task keeps its own deadline. When a tick fires late
//! (the runtime was busy, or the previous callback was slow), the
//! configured [`TickPolicy`] decides whether the cadence restarts from
//! now or keeps the original schedule.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::Notify;
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a repeating task wakes up late.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Skip the missed tick(s) and schedule the next one from now.
    /// Never produces a burst of back-to-back callbacks.
    #[default]
    Skip,
    /// Keep the original cadence. Missed ticks fire back to back until
    /// the schedule catches up.
    Drop,
}

/// Scheduler-wide settings.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Overrun handling for repeating tasks.
    pub policy: TickPolicy,
    /// Fraction (0.0–1.0) of the interval a callback may run before a
    /// warning is logged. Default: 0.80.
    pub budget_warn_threshold: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
        }
    }
}

impl SchedulerConfig {
    /// Clamp out-of-range values so the config is safe to use.
    ///
    /// Called automatically by [`Scheduler::new`].
    pub fn validated(mut self) -> Self {
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters shared by every task of one scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerMetrics {
    /// Tasks that have been scheduled and have not yet ended.
    pub live_tasks: usize,
    /// Tasks scheduled since the scheduler was created.
    pub total_scheduled: u64,
    /// Callback invocations across all tasks.
    pub total_invocations: u64,
    /// Repeating-task wakeups that were detected as late.
    pub total_overruns: u64,
}

#[derive(Debug, Default)]
struct Counters {
    live_tasks: AtomicUsize,
    total_scheduled: AtomicU64,
    total_invocations: AtomicU64,
    total_overruns: AtomicU64,
}

// ---------------------------------------------------------------------------
// TaskHandle
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct TaskState {
    cancelled: AtomicBool,
    finished: AtomicBool,
    wake: Notify,
}

/// Handle to a scheduled task. Dropping it does **not** cancel the task.
#[derive(Debug)]
pub struct TaskHandle {
    id: u64,
    state: Arc<TaskState>,
}

impl TaskHandle {
    /// Scheduler-unique task id, for logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stops future invocations. Idempotent.
    ///
    /// An invocation already in progress runs to completion.
    pub fn cancel(&self) {
        if !self.state.cancelled.swap(true, Ordering::SeqCst) {
            // `notify_one` stores a permit if the task isn't waiting yet,
            // so the wakeup can't be lost.
            self.state.wake.notify_one();
            trace!(task = self.id, "task cancelled");
        }
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Whether the task has ended (cancelled and drained, or a one-shot
    /// that already ran).
    pub fn is_finished(&self) -> bool {
        self.state.finished.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Cadence: deadline bookkeeping for one repeating task
// ---------------------------------------------------------------------------

struct Cadence {
    interval: Duration,
    policy: TickPolicy,
    tick: u64,
}

impl Cadence {
    /// Given the deadline that just fired and when we actually woke,
    /// returns the next deadline and whether this wakeup was an overrun.
    fn advance(&mut self, due: TokioInstant, now: TokioInstant) -> (TokioInstant, bool) {
        self.tick += 1;
        let late_by = now.saturating_duration_since(due);
        let overrun = late_by > self.interval / 10; // >10% late = overrun

        let next = match self.policy {
            TickPolicy::Skip => {
                if overrun {
                    let skipped = late_by.as_nanos() / self.interval.as_nanos().max(1);
                    if skipped > 0 {
                        warn!(
                            tick = self.tick,
                            skipped = skipped as u64,
                            late_ms = late_by.as_secs_f64() * 1000.0,
                            "timer overrun: skipping ahead"
                        );
                    }
                }
                now + self.interval
            }
            TickPolicy::Drop => {
                if overrun {
                    warn!(
                        tick = self.tick,
                        late_ms = late_by.as_secs_f64() * 1000.0,
                        "timer overrun: keeping original schedule"
                    );
                }
                due + self.interval
            }
        };
        (next, overrun)
    }
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Shared facility for repeating and delayed callbacks.
///
/// Cheap to clone; clones share counters and config. Must be used from
/// inside a Tokio runtime, whose worker threads execute the callbacks.
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: Arc<SchedulerConfig>,
    next_id: Arc<AtomicU64>,
    counters: Arc<Counters>,
}

impl Scheduler {
    /// Shortest interval accepted for repeating tasks.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

    /// Creates a scheduler from config.
    pub fn new(config: SchedulerConfig) -> Self {
        let config = config.validated();
        debug!(policy = ?config.policy, "scheduler created");
        Self {
            config: Arc::new(config),
            next_id: Arc::new(AtomicU64::new(1)),
            counters: Arc::new(Counters::default()),
        }
    }

    /// Runs `callback` now and then every `interval` until cancelled.
    ///
    /// Invocations of one task never overlap: the next deadline is only
    /// awaited after the current callback's future completes.
    pub fn schedule_repeating<F, Fut>(&self, interval: Duration, mut callback: F) -> TaskHandle
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let interval = if interval < Self::MIN_INTERVAL {
            warn!(?interval, min = ?Self::MIN_INTERVAL, "interval too short: clamping");
            Self::MIN_INTERVAL
        } else {
            interval
        };

        let (handle, state) = self.register();
        let id = handle.id;
        let counters = Arc::clone(&self.counters);
        let warn_threshold = self.config.budget_warn_threshold;
        let mut cadence = Cadence {
            interval,
            policy: self.config.policy,
            tick: 0,
        };

        tokio::spawn(async move {
            // First deadline is "now": the callback fires immediately.
            let mut due = TokioInstant::now();
            loop {
                tokio::select! {
                    _ = time::sleep_until(due) => {}
                    _ = state.wake.notified() => {}
                }
                if state.cancelled.load(Ordering::SeqCst) {
                    break;
                }

                let (next, overrun) = cadence.advance(due, TokioInstant::now());
                if overrun {
                    counters.total_overruns.fetch_add(1, Ordering::Relaxed);
                }

                let started = Instant::now();
                counters.total_invocations.fetch_add(1, Ordering::Relaxed);
                trace!(task = id, tick = cadence.tick, "repeating task firing");
                callback().await;
                check_budget(id, started.elapsed(), interval, warn_threshold);

                due = next;
            }
            finish(&state, &counters, id);
        });

        handle
    }

    /// Runs `callback` once after `delay`, unless cancelled first.
    pub fn schedule_once<F, Fut>(&self, delay: Duration, callback: F) -> TaskHandle
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (handle, state) = self.register();
        let id = handle.id;
        let counters = Arc::clone(&self.counters);

        tokio::spawn(async move {
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = state.wake.notified() => {}
            }
            if !state.cancelled.load(Ordering::SeqCst) {
                counters.total_invocations.fetch_add(1, Ordering::Relaxed);
                trace!(task = id, "one-shot firing");
                callback().await;
            }
            finish(&state, &counters, id);
        });

        handle
    }

    /// Snapshot of the scheduler's counters.
    pub fn metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            live_tasks: self.counters.live_tasks.load(Ordering::SeqCst),
            total_scheduled: self.counters.total_scheduled.load(Ordering::Relaxed),
            total_invocations: self.counters.total_invocations.load(Ordering::Relaxed),
            total_overruns: self.counters.total_overruns.load(Ordering::Relaxed),
        }
    }

    /// Number of tasks that have not yet ended.
    pub fn live_tasks(&self) -> usize {
        self.counters.live_tasks.load(Ordering::SeqCst)
    }

    /// The scheduler's (validated) configuration.
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn register(&self) -> (TaskHandle, Arc<TaskState>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let state = Arc::new(TaskState::default());
        self.counters.live_tasks.fetch_add(1, Ordering::SeqCst);
        self.counters.total_scheduled.fetch_add(1, Ordering::Relaxed);
        (
            TaskHandle {
                id,
                state: Arc::clone(&state),
            },
            state,
        )
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

fn finish(state: &TaskState, counters: &Counters, id: u64) {
    state.finished.store(true, Ordering::SeqCst);
    counters.live_tasks.fetch_sub(1, Ordering::SeqCst);
    trace!(task = id, "task ended");
}

fn check_budget(id: u64, elapsed: Duration, budget: Duration, warn_threshold: f64) {
    let utilization = elapsed.as_secs_f64() / budget.as_secs_f64();
    if utilization >= 1.0 {
        warn!(
            task = id,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            budget_ms = budget.as_secs_f64() * 1000.0,
            "CRITICAL: callback exceeded its interval"
        );
    } else if utilization >= warn_threshold {
        warn!(
            task = id,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            utilization_pct = format!("{:.1}", utilization * 100.0),
            "callback approaching its interval"
        );
    }
}
