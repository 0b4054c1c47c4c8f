//! Reactive properties with change detection.
//!
//! Properties hold configuration values (the enabled flag, behavior and
//! data-shaping settings) and report whether a write actually changed
//! anything, so callers only reconfigure when needed.
//!
//! # Example
//!
//! ```
//! use horizon_cluster_core::{Property, Signal};
//!
//! struct Gate {
//!     enabled: Property<bool>,
//!     enabled_changed: Signal<bool>,
//! }
//!
//! impl Gate {
//!     fn set_enabled(&self, enabled: bool) {
//!         if self.enabled.set(enabled) {
//!             self.enabled_changed.emit(enabled);
//!         }
//!     }
//! }
//!
//! let gate = Gate { enabled: Property::new(true), enabled_changed: Signal::new() };
//! gate.set_enabled(false);
//! assert!(!gate.enabled.get());
//! ```

use std::fmt;

use parking_lot::RwLock;

/// A reactive property that tracks changes.
///
/// `Property<T>` wraps a value and provides change detection. When `set()` is
/// called, it compares the new value with the current one and returns whether
/// the value actually changed.
pub struct Property<T> {
    value: RwLock<T>,
}

impl<T: Clone> Property<T> {
    /// Create a new property with an initial value.
    pub fn new(value: T) -> Self {
        Self {
            value: RwLock::new(value),
        }
    }

    /// Get the current value.
    ///
    /// This clones the value. For large types, consider using `with()` instead.
    pub fn get(&self) -> T {
        self.value.read().clone()
    }

    /// Access the value through a closure without cloning.
    pub fn with<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&T) -> R,
    {
        f(&self.value.read())
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Set the value, returning `true` if the value changed.
    pub fn set(&self, value: T) -> bool {
        let mut current = self.value.write();
        if *current != value {
            *current = value;
            true
        } else {
            false
        }
    }
}

impl<T: Clone + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("value", &self.get())
            .finish()
    }
}
