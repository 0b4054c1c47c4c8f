//! Debounced recompute scheduling.
//!
//! Viewport triggers call [`RecomputeScheduler::request`]. Each request
//! cancels the pending timer, bumps a generation counter and schedules a new
//! timer that captures the generation. When a timer fires it runs the settle
//! callback only if the generation still matches, so a timer that escaped
//! cancellation after reconfiguration is a no-op.
//!
//! ```text
//! Idle --request--> PendingDebounce --quiet for debounce--> Recomputing --> Idle
//!                     ^          |
//!                     +-request--+
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;

use horizon_cluster_core::logging::targets;
use horizon_cluster_core::{EventLoop, ScheduledTaskId, TaskId, TaskResult};

/// Where the scheduler is in its debounce cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Nothing pending.
    Idle,
    /// A timer is waiting for the quiet period to end.
    PendingDebounce,
    /// The settle callback is running.
    Recomputing,
}

/// The callback run when a debounce window closes.
pub type SettleFn = Box<dyn Fn() -> TaskResult + Send + Sync>;

#[derive(Debug, Clone, Copy)]
enum Pending {
    Timer(ScheduledTaskId),
    Task(TaskId),
}

#[derive(Debug)]
struct SchedulerInner {
    debounce: Duration,
    pending: Option<Pending>,
    state: SchedulerState,
    paused: bool,
}

struct Shared {
    event_loop: Arc<EventLoop>,
    generation: AtomicU64,
    inner: Mutex<SchedulerInner>,
    settle: SettleFn,
}

impl Shared {
    /// Invalidate the pending timer. Must be called with `inner` locked.
    fn invalidate(&self, inner: &mut SchedulerInner) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let Some(pending) = inner.pending.take() else {
            return false;
        };
        match pending {
            Pending::Timer(id) => {
                if self.event_loop.cancel_scheduled(id).is_err() {
                    tracing::trace!(target: targets::SCHEDULER, ?id, "timer already gone");
                }
            }
            Pending::Task(id) => {
                self.event_loop.cancel_task(id);
            }
        }
        if inner.state == SchedulerState::PendingDebounce {
            inner.state = SchedulerState::Idle;
        }
        true
    }
}

/// Coalesces recompute requests into settled recomputes.
pub struct RecomputeScheduler {
    shared: Arc<Shared>,
}

impl RecomputeScheduler {
    pub fn new<F>(event_loop: Arc<EventLoop>, debounce: Duration, settle: F) -> Self
    where
        F: Fn() -> TaskResult + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                event_loop,
                generation: AtomicU64::new(0),
                inner: Mutex::new(SchedulerInner {
                    debounce,
                    pending: None,
                    state: SchedulerState::Idle,
                    paused: false,
                }),
                settle: Box::new(settle),
            }),
        }
    }

    /// Request a debounced recompute, restarting the quiet period.
    ///
    /// A zero debounce defers to the next tick. Returns `false` while paused.
    pub fn request(&self) -> bool {
        self.schedule(false)
    }

    /// Request a recompute on the next tick, skipping the quiet period.
    pub fn request_immediate(&self) -> bool {
        self.schedule(true)
    }

    fn schedule(&self, immediate: bool) -> bool {
        let shared = &self.shared;
        let mut inner = shared.inner.lock();
        if inner.paused {
            tracing::trace!(target: targets::SCHEDULER, "paused, ignoring request");
            return false;
        }

        shared.invalidate(&mut inner);
        let generation = shared.generation.load(Ordering::SeqCst);
        let weak = Arc::downgrade(shared);
        let task = move || fire(weak, generation);

        let debounce = inner.debounce;
        let pending = if immediate || debounce.is_zero() {
            Pending::Task(shared.event_loop.post_task(task))
        } else {
            Pending::Timer(shared.event_loop.schedule_once(debounce, task))
        };
        inner.pending = Some(pending);
        if inner.state != SchedulerState::Recomputing {
            inner.state = SchedulerState::PendingDebounce;
        }
        tracing::trace!(
            target: targets::SCHEDULER,
            generation,
            immediate,
            ?debounce,
            "recompute requested"
        );
        true
    }

    /// Cancel any pending recompute. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.inner.lock();
        let cancelled = self.shared.invalidate(&mut inner);
        if cancelled {
            tracing::debug!(target: targets::SCHEDULER, "pending recompute cancelled");
        }
        cancelled
    }

    /// Change the quiet period. Any pending recompute is cancelled.
    pub fn reconfigure(&self, debounce: Duration) {
        let mut inner = self.shared.inner.lock();
        self.shared.invalidate(&mut inner);
        inner.debounce = debounce;
        tracing::debug!(target: targets::SCHEDULER, ?debounce, "scheduler reconfigured");
    }

    /// Cancel anything pending and ignore requests until [`Self::resume`].
    pub fn pause(&self) {
        let mut inner = self.shared.inner.lock();
        self.shared.invalidate(&mut inner);
        inner.paused = true;
        tracing::debug!(target: targets::SCHEDULER, "scheduler paused");
    }

    pub fn resume(&self) {
        self.shared.inner.lock().paused = false;
        tracing::debug!(target: targets::SCHEDULER, "scheduler resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.shared.inner.lock().paused
    }

    pub fn state(&self) -> SchedulerState {
        self.shared.inner.lock().state
    }

    pub fn is_pending(&self) -> bool {
        self.shared.inner.lock().pending.is_some()
    }

    pub fn debounce(&self) -> Duration {
        self.shared.inner.lock().debounce
    }

    /// The current generation. Bumped by every request and cancellation.
    pub fn generation(&self) -> u64 {
        self.shared.generation.load(Ordering::SeqCst)
    }
}

fn fire(weak: Weak<Shared>, generation: u64) -> TaskResult {
    let Some(shared) = weak.upgrade() else {
        return Ok(());
    };

    {
        let mut inner = shared.inner.lock();
        let current = shared.generation.load(Ordering::SeqCst);
        if current != generation || inner.paused {
            tracing::trace!(
                target: targets::SCHEDULER,
                generation,
                current,
                "stale timer ignored"
            );
            return Ok(());
        }
        inner.pending = None;
        inner.state = SchedulerState::Recomputing;
    }

    tracing::trace!(target: targets::SCHEDULER, generation, "debounce settled");
    let result = (shared.settle)();

    let mut inner = shared.inner.lock();
    inner.state = if inner.pending.is_some() {
        SchedulerState::PendingDebounce
    } else {
        SchedulerState::Idle
    };
    result
}

impl std::fmt::Debug for RecomputeScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecomputeScheduler")
            .field("generation", &self.generation())
            .field("inner", &*self.shared.inner.lock())
            .finish()
    }
}
