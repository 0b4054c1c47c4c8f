//! Runtime substrate for Horizon Cluster.
//!
//! This crate provides the cooperative machinery the clustering engine is
//! built on:
//!
//! - **Signal/Slot System**: Host notifications with connect/disconnect
//! - **Event Loop**: Next-tick deferred tasks and one-shot timers
//! - **Clocks**: Wall-clock and manually advanced time sources
//! - **Properties**: Configuration values with change detection
//! - **Logging**: `tracing` targets, macros and span guards
//!
//! # Debounce Example
//!
//! ```
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//! use horizon_cluster_core::{EventLoop, ManualClock, Signal};
//!
//! let clock = Arc::new(ManualClock::new());
//! let event_loop = Arc::new(EventLoop::with_clock(clock));
//! let idle = Signal::<()>::new();
//! let fired = Arc::new(AtomicUsize::new(0));
//!
//! let loop_clone = event_loop.clone();
//! let fired_clone = fired.clone();
//! idle.connect(move |_| {
//!     let fired = fired_clone.clone();
//!     loop_clone.schedule_once(Duration::from_millis(100), move || {
//!         fired.fetch_add(1, Ordering::SeqCst);
//!         Ok(())
//!     });
//! });
//!
//! idle.emit(());
//! event_loop.run_for(Duration::from_millis(150)).unwrap();
//! assert_eq!(fired.load(Ordering::SeqCst), 1);
//! ```

mod clock;
mod error;
pub mod event_loop;
pub mod logging;
pub mod property;
mod scheduler;
pub mod signal;
mod task;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{
    BoxedTaskError, CoreError, Result, SchedulerError, TaskError, TaskResult,
};
pub use event_loop::EventLoop;
pub use logging::PerfSpan;
pub use property::Property;
pub use scheduler::ScheduledTaskId;
pub use signal::{ConnectionId, Signal};
pub use task::TaskId;
