//! Deferred task queue for next-tick processing.
//!
//! Tasks posted here run on the next event loop tick, never inside the call
//! that posted them.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::TaskResult;

/// A unique identifier for a deferred task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

/// Global counter for generating unique task IDs.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_task_id() -> TaskId {
    TaskId(NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// A boxed task closure.
pub(crate) type BoxedTask = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

/// Internal task data.
pub(crate) struct TaskData {
    pub(crate) id: TaskId,
    pub(crate) task: BoxedTask,
}

/// Manages the deferred task queue.
///
/// The queue only stores tasks; the event loop takes them out and runs them
/// without holding the queue lock.
#[derive(Default)]
pub struct TaskQueue {
    tasks: VecDeque<TaskData>,
}

impl TaskQueue {
    /// Create a new task queue.
    pub fn new() -> Self {
        Self {
            tasks: VecDeque::new(),
        }
    }

    /// Post a task to be executed on the next tick.
    ///
    /// Returns the task ID that can be used to cancel the task.
    pub fn post<F>(&mut self, task: F) -> TaskId
    where
        F: FnOnce() -> TaskResult + Send + 'static,
    {
        let id = next_task_id();
        self.tasks.push_back(TaskData {
            id,
            task: Box::new(task),
        });
        id
    }

    /// Cancel a pending task.
    ///
    /// Returns `true` if the task was found and cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        if let Some(pos) = self.tasks.iter().position(|t| t.id == id) {
            self.tasks.remove(pos);
            true
        } else {
            false
        }
    }

    /// Check if there are any pending tasks.
    pub fn has_pending(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Get the number of pending tasks.
    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// Take every task currently queued, leaving the queue empty.
    pub(crate) fn take_all(&mut self) -> VecDeque<TaskData> {
        std::mem::take(&mut self.tasks)
    }

    /// Put unprocessed tasks back at the front, preserving their order.
    pub(crate) fn restore_front(&mut self, mut remaining: VecDeque<TaskData>) {
        remaining.append(&mut self.tasks);
        self.tasks = remaining;
    }
}

impl std::fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueue")
            .field("pending", &self.tasks.len())
            .finish()
    }
}
