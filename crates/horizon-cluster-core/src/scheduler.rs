//! One-shot timer scheduling.
//!
//! The scheduler keeps a min-heap of deadlines. It never reads the clock and
//! never runs tasks itself: the event loop supplies `now` and executes what
//! [`TaskScheduler::pop_ready`] hands back, so tasks are free to schedule or
//! cancel other timers while they run.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{new_key_type, SlotMap};

use crate::error::{SchedulerError, TaskResult};
use crate::task::BoxedTask;

new_key_type! {
    /// A unique identifier for a scheduled task.
    pub struct ScheduledTaskId;
}

/// Internal scheduled task data.
struct ScheduledTaskData {
    /// When this task should execute.
    run_at: Instant,
    /// The task closure to execute.
    task: BoxedTask,
}

/// An entry in the scheduler queue (min-heap by execution time).
#[derive(Debug, Clone, Copy)]
struct SchedulerQueueEntry {
    id: ScheduledTaskId,
    run_time: Instant,
    /// Insertion sequence, so equal deadlines fire in scheduling order.
    sequence: u64,
}

impl PartialEq for SchedulerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.run_time == other.run_time && self.sequence == other.sequence
    }
}

impl Eq for SchedulerQueueEntry {}

impl PartialOrd for SchedulerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SchedulerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse order for min-heap (BinaryHeap is max-heap by default).
        other
            .run_time
            .cmp(&self.run_time)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Manages pending one-shot timers.
#[derive(Default)]
pub struct TaskScheduler {
    /// All pending scheduled tasks.
    tasks: SlotMap<ScheduledTaskId, ScheduledTaskData>,
    /// Priority queue of pending task executions (min-heap by run time).
    queue: BinaryHeap<SchedulerQueueEntry>,
    next_sequence: u64,
}

impl TaskScheduler {
    /// Create a new task scheduler.
    pub fn new() -> Self {
        Self {
            tasks: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    /// Schedule a task to execute at a specific instant.
    ///
    /// If the instant is in the past, the task is ready immediately.
    pub fn schedule_at<F>(&mut self, instant: Instant, task: F) -> ScheduledTaskId
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        let id = self.tasks.insert(ScheduledTaskData {
            run_at: instant,
            task: Box::new(task),
        });
        let sequence = self.next_sequence;
        self.next_sequence = self.next_sequence.wrapping_add(1);
        self.queue.push(SchedulerQueueEntry {
            id,
            run_time: instant,
            sequence,
        });
        id
    }

    /// Schedule a task to execute `delay` after `now`.
    pub fn schedule_once<F>(&mut self, now: Instant, delay: Duration, task: F) -> ScheduledTaskId
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        self.schedule_at(now + delay, task)
    }

    /// Cancel and remove a scheduled task.
    ///
    /// Returns an error if the task already fired or was already cancelled.
    pub fn cancel(&mut self, id: ScheduledTaskId) -> Result<(), SchedulerError> {
        // The heap entry is left behind and skipped when it surfaces.
        self.tasks
            .remove(id)
            .map(|_| ())
            .ok_or(SchedulerError::InvalidTaskId)
    }

    /// Check if a scheduled task is still pending.
    pub fn is_active(&self, id: ScheduledTaskId) -> bool {
        self.tasks.contains_key(id)
    }

    /// Get the number of pending scheduled tasks.
    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }

    fn discard_cancelled(&mut self) {
        while let Some(entry) = self.queue.peek() {
            if self.tasks.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
    }

    /// The earliest pending deadline, if any.
    pub fn next_deadline(&mut self) -> Option<Instant> {
        self.discard_cancelled();
        self.queue.peek().map(|entry| entry.run_time)
    }

    /// Check if there are any tasks ready to execute at `now`.
    pub fn has_ready(&mut self, now: Instant) -> bool {
        self.next_deadline().is_some_and(|deadline| deadline <= now)
    }

    /// Remove and return the earliest task whose deadline has passed.
    pub(crate) fn pop_ready(&mut self, now: Instant) -> Option<(ScheduledTaskId, BoxedTask)> {
        self.discard_cancelled();
        let entry = *self.queue.peek()?;
        if entry.run_time > now {
            return None;
        }
        self.queue.pop();
        let data = self.tasks.remove(entry.id)?;
        debug_assert_eq!(data.run_at, entry.run_time);
        Some((entry.id, data.task))
    }
}

impl std::fmt::Debug for TaskScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskScheduler")
            .field("active", &self.tasks.len())
            .finish()
    }
}
