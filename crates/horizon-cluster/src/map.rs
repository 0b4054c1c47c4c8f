//! The host map surface the engine consumes.
//!
//! A host adapter implements [`MapViewport`] (read the camera, subscribe to
//! change events) and [`CameraControl`] (issue camera commands). Anything
//! implementing both is a [`MapHost`]. [`crate::HeadlessMap`] is an in-memory
//! implementation.

use horizon_cluster_core::ConnectionId;
use serde::{Deserialize, Serialize};

use crate::geo::{LatLng, LatLngBounds, ScreenSize};

/// Viewport change events a host map emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewportEvent {
    /// The camera stopped moving.
    Idle,
    /// The visible bounds changed.
    BoundsChanged,
    /// The zoom level changed.
    ZoomChanged,
}

/// Handle for one viewport event subscription.
///
/// Connection ids are only unique per event, so the handle carries both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ViewportSubscription {
    pub event: ViewportEvent,
    pub id: ConnectionId,
}

/// A viewport event handler.
pub type ViewportHandler = Box<dyn Fn() + Send + Sync>;

/// Read access to the host map's camera plus change notifications.
pub trait MapViewport: Send + Sync {
    /// Current zoom level.
    fn zoom(&self) -> f64;

    /// Currently visible bounds.
    fn bounds(&self) -> LatLngBounds;

    /// Invoke `handler` every time `event` fires.
    fn subscribe(&self, event: ViewportEvent, handler: ViewportHandler) -> ViewportSubscription;

    /// Remove a subscription. Returns `false` if it was already gone.
    fn unsubscribe(&self, subscription: ViewportSubscription) -> bool;
}

/// The camera command surface of the host map.
pub trait CameraControl: Send + Sync {
    /// Viewport size in pixels.
    fn viewport_size(&self) -> ScreenSize;

    /// Deepest zoom the host will apply. Unlimited unless the host says so.
    fn max_zoom(&self) -> f64 {
        f64::INFINITY
    }

    /// Center the camera on `center` at `zoom`.
    fn set_center_zoom(&self, center: LatLng, zoom: f64);

    /// Fit `bounds` in the viewport, keeping `padding` pixels free per side.
    fn fit_bounds(&self, bounds: LatLngBounds, padding: f64);
}

/// A complete host map.
pub trait MapHost: MapViewport + CameraControl {}

impl<T: MapViewport + CameraControl + ?Sized> MapHost for T {}
