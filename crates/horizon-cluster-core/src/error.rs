//! Error types for the Horizon Cluster runtime.

use std::fmt;

/// The main error type for runtime operations.
#[derive(Debug)]
pub enum CoreError {
    /// Scheduler-related error.
    Scheduler(SchedulerError),
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheduler(err) => write!(f, "Scheduler error: {err}"),
        }
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Scheduler(err) => Some(err),
        }
    }
}

/// Scheduler-specific errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    /// The task ID is invalid, already fired, or already cancelled.
    InvalidTaskId,
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTaskId => write!(f, "Invalid or expired scheduled task ID"),
        }
    }
}

impl std::error::Error for SchedulerError {}

/// The boxed error carried out of a failing task.
pub type BoxedTaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// An error returned by a deferred task or timer callback.
///
/// The event loop stops processing at the first failing task and hands this
/// error back to whoever is driving the loop.
#[derive(Debug)]
pub struct TaskError {
    source: BoxedTaskError,
}

impl TaskError {
    /// Wrap any error type.
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxedTaskError>,
    {
        Self { source: err.into() }
    }

    /// Attempt to downcast the underlying error to a concrete type.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.source.downcast_ref::<E>()
    }
}

impl fmt::Display for TaskError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}

impl std::error::Error for TaskError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(self.source.as_ref())
    }
}

impl From<SchedulerError> for CoreError {
    fn from(err: SchedulerError) -> Self {
        Self::Scheduler(err)
    }
}

/// A specialized Result type for runtime operations.
pub type Result<T> = std::result::Result<T, CoreError>;

/// The result type returned by task closures.
pub type TaskResult = std::result::Result<(), TaskError>;
