//! Viewport watcher.
//!
//! Holds at most one subscription to the host map, on the event matching the
//! configured [`RecomputeTrigger`].

use std::sync::Arc;

use parking_lot::Mutex;

use horizon_cluster_core::logging::targets;

use crate::config::RecomputeTrigger;
use crate::map::{MapHost, ViewportSubscription};

pub struct ViewportWatcher {
    map: Arc<dyn MapHost>,
    subscription: Mutex<Option<ViewportSubscription>>,
}

impl ViewportWatcher {
    pub fn new(map: Arc<dyn MapHost>) -> Self {
        Self {
            map,
            subscription: Mutex::new(None),
        }
    }

    /// Subscribe `handler` to the event for `trigger`.
    ///
    /// Any previous subscription is removed first.
    pub fn watch<F>(&self, trigger: RecomputeTrigger, handler: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.unwatch();
        let event = trigger.event();
        let subscription = self.map.subscribe(event, Box::new(handler));
        tracing::debug!(target: targets::WATCHER, ?event, "subscribed to viewport event");
        *self.subscription.lock() = Some(subscription);
    }

    /// Drop the current subscription, if any. Returns whether one existed.
    pub fn unwatch(&self) -> bool {
        let Some(subscription) = self.subscription.lock().take() else {
            return false;
        };
        self.map.unsubscribe(subscription);
        tracing::debug!(
            target: targets::WATCHER,
            event = ?subscription.event,
            "unsubscribed from viewport event"
        );
        true
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.lock().is_some()
    }

    /// The trigger event currently watched.
    pub fn subscription(&self) -> Option<ViewportSubscription> {
        *self.subscription.lock()
    }
}

impl std::fmt::Debug for ViewportWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportWatcher")
            .field("subscription", &*self.subscription.lock())
            .finish()
    }
}
