//! Cooperative single-threaded event loop.
//!
//! The event loop owns a deferred task queue and a one-shot timer scheduler,
//! both driven by a [`Clock`]. Hosts pump it with [`EventLoop::process_ready`]
//! from their own frame or idle callback, or drive it synchronously with
//! [`EventLoop::run_for`] and [`EventLoop::run_until_idle`].
//!
//! No lock is held while a task runs, so tasks may post further tasks,
//! schedule or cancel timers, and emit signals.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_cluster_core::{EventLoop, ManualClock};
//!
//! let clock = Arc::new(ManualClock::new());
//! let event_loop = EventLoop::with_clock(clock.clone());
//!
//! event_loop.schedule_once(Duration::from_millis(200), || {
//!     println!("fired");
//!     Ok(())
//! });
//!
//! assert_eq!(event_loop.run_for(Duration::from_millis(250)).unwrap(), 1);
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, TaskError, TaskResult};
use crate::logging::targets;
use crate::scheduler::{ScheduledTaskId, TaskScheduler};
use crate::task::{TaskId, TaskQueue};

/// The cooperative event loop shared by the clustering engine and its host.
pub struct EventLoop {
    clock: Arc<dyn Clock>,
    tasks: Mutex<TaskQueue>,
    timers: Mutex<TaskScheduler>,
}

impl EventLoop {
    /// Create an event loop driven by the wall clock.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an event loop driven by the given clock.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            tasks: Mutex::new(TaskQueue::new()),
            timers: Mutex::new(TaskScheduler::new()),
        }
    }

    /// The clock driving this loop.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The current instant according to this loop's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Post a task to run on the next tick.
    pub fn post_task<F>(&self, task: F) -> TaskId
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        let id = self.tasks.lock().post(task);
        tracing::trace!(target: targets::EVENT_LOOP, task_id = id.as_u64(), "posted deferred task");
        id
    }

    /// Cancel a deferred task that has not run yet.
    pub fn cancel_task(&self, id: TaskId) -> bool {
        self.tasks.lock().cancel(id)
    }

    /// Schedule a one-shot task to run once `delay` has elapsed.
    ///
    /// A zero delay still waits for the next tick.
    pub fn schedule_once<F>(&self, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        let now = self.clock.now();
        let id = self.timers.lock().schedule_once(now, delay, task);
        tracing::trace!(target: targets::EVENT_LOOP, ?id, ?delay, "scheduled timer");
        id
    }

    /// Cancel a pending timer.
    pub fn cancel_scheduled(&self, id: ScheduledTaskId) -> Result<()> {
        self.timers.lock().cancel(id)?;
        tracing::trace!(target: targets::EVENT_LOOP, ?id, "cancelled timer");
        Ok(())
    }

    /// Check if a timer is still pending.
    pub fn is_scheduled(&self, id: ScheduledTaskId) -> bool {
        self.timers.lock().is_active(id)
    }

    /// Number of deferred tasks plus pending timers.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().pending_count() + self.timers.lock().active_count()
    }

    /// Whether any deferred task or expired timer is waiting to run.
    pub fn has_ready(&self) -> bool {
        if self.tasks.lock().has_pending() {
            return true;
        }
        let now = self.clock.now();
        self.timers.lock().has_ready(now)
    }

    /// Duration until something becomes runnable, if anything is pending.
    ///
    /// Returns `Duration::ZERO` when deferred tasks are queued.
    pub fn time_until_next(&self) -> Option<Duration> {
        if self.tasks.lock().has_pending() {
            return Some(Duration::ZERO);
        }
        let deadline = self.timers.lock().next_deadline()?;
        Some(deadline.saturating_duration_since(self.clock.now()))
    }

    /// Run one tick: every deferred task queued before the tick started, then
    /// every timer whose deadline has passed, earliest first.
    ///
    /// Stops at the first failing task and returns its error; tasks that did
    /// not get to run stay queued.
    #[tracing::instrument(skip(self), target = "horizon_cluster_core::event_loop", level = "trace")]
    pub fn process_ready(&self) -> std::result::Result<usize, TaskError> {
        let mut executed = 0;

        let mut batch = self.tasks.lock().take_all();
        while let Some(data) = batch.pop_front() {
            tracing::trace!(target: targets::EVENT_LOOP, task_id = data.id.as_u64(), "executing deferred task");
            executed += 1;
            if let Err(err) = (data.task)() {
                self.tasks.lock().restore_front(batch);
                tracing::debug!(target: targets::EVENT_LOOP, error = %err, "deferred task failed");
                return Err(err);
            }
        }

        loop {
            let now = self.clock.now();
            // Pop one at a time so a running task can cancel a later one.
            let Some((id, task)) = self.timers.lock().pop_ready(now) else {
                break;
            };
            tracing::trace!(target: targets::EVENT_LOOP, ?id, "executing timer");
            executed += 1;
            if let Err(err) = task() {
                tracing::debug!(target: targets::EVENT_LOOP, error = %err, "timer task failed");
                return Err(err);
            }
        }

        Ok(executed)
    }

    /// Run the loop for `duration` of clock time, firing timers as their
    /// deadlines pass.
    ///
    /// With a [`crate::ManualClock`] this returns immediately; with the wall
    /// clock it sleeps between deadlines.
    pub fn run_for(&self, duration: Duration) -> std::result::Result<usize, TaskError> {
        let end = self.clock.now() + duration;
        let mut executed = self.drain_ready()?;

        loop {
            let next = self.timers.lock().next_deadline();
            match next {
                Some(deadline) if deadline <= end => {
                    self.clock.sleep_until(deadline);
                    executed += self.drain_ready()?;
                }
                _ => break,
            }
        }

        self.clock.sleep_until(end);
        executed += self.drain_ready()?;
        Ok(executed)
    }

    /// Run until no deferred tasks or timers remain.
    pub fn run_until_idle(&self) -> std::result::Result<usize, TaskError> {
        let mut executed = self.drain_ready()?;
        loop {
            let next = self.timers.lock().next_deadline();
            let Some(deadline) = next else {
                break;
            };
            self.clock.sleep_until(deadline);
            executed += self.drain_ready()?;
        }
        Ok(executed)
    }

    fn drain_ready(&self) -> std::result::Result<usize, TaskError> {
        let mut executed = 0;
        while self.has_ready() {
            executed += self.process_ready()?;
        }
        Ok(executed)
    }
}

static_assertions::assert_impl_all!(EventLoop: Send, Sync);

impl Default for EventLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventLoop")
            .field("tasks", &*self.tasks.lock())
            .field("timers", &*self.timers.lock())
            .finish()
    }
}
