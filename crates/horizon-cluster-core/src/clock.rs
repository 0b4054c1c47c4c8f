//! Time sources for the event loop.
//!
//! The event loop never calls `Instant::now()` directly. It asks a [`Clock`],
//! which is either the wall clock or a manually advanced one for deterministic
//! tests and headless hosts.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// A monotonic time source.
pub trait Clock: Send + Sync {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Block (or jump) until `deadline`.
    ///
    /// Returns immediately if `deadline` is not in the future.
    fn sleep_until(&self, deadline: Instant);
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep_until(&self, deadline: Instant) {
        let now = Instant::now();
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
    }
}

/// A clock that only moves when told to.
///
/// `sleep_until` jumps straight to the deadline, so timers fire without any
/// real waiting.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    now: Mutex<Instant>,
}

impl ManualClock {
    /// Create a clock frozen at the current wall-clock instant.
    pub fn new() -> Self {
        let origin = Instant::now();
        Self {
            origin,
            now: Mutex::new(origin),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }

    /// Time elapsed since the clock was created.
    pub fn elapsed(&self) -> Duration {
        *self.now.lock() - self.origin
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock()
    }

    fn sleep_until(&self, deadline: Instant) {
        let mut now = self.now.lock();
        if deadline > *now {
            *now = deadline;
        }
    }
}
