//! The enabled switch.

use horizon_cluster_core::Property;

/// What a write to the gate did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateTransition {
    /// Went from disabled to enabled.
    Opened,
    /// Went from enabled to disabled.
    Closed,
    Unchanged,
}

/// Tracks whether clustering is enabled.
#[derive(Debug)]
pub struct EnabledGate {
    enabled: Property<bool>,
}

impl EnabledGate {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Property::new(enabled),
        }
    }

    pub fn is_open(&self) -> bool {
        self.enabled.get()
    }

    pub fn set(&self, enabled: bool) -> GateTransition {
        if !self.enabled.set(enabled) {
            return GateTransition::Unchanged;
        }
        if enabled {
            GateTransition::Opened
        } else {
            GateTransition::Closed
        }
    }
}
