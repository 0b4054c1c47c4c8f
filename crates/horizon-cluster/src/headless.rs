//! An in-memory host map.
//!
//! `HeadlessMap` keeps a camera (center, zoom, pixel size), derives visible
//! bounds with Web Mercator math and emits viewport events through
//! [`Signal`]s. Tests drive it directly; hosts without a native map can use
//! it as their viewport model.

use std::collections::VecDeque;

use parking_lot::{Mutex, RwLock};

use horizon_cluster_core::Signal;

use crate::camera::CameraCommand;
use crate::geo::{self, LatLng, LatLngBounds, ScreenSize};
use crate::map::{CameraControl, MapViewport, ViewportEvent, ViewportHandler, ViewportSubscription};

/// Default zoom limits, matching common slippy-map tile sets.
pub const DEFAULT_MIN_ZOOM: f64 = 0.0;
pub const DEFAULT_MAX_ZOOM: f64 = 22.0;
/// Camera commands kept by default before the oldest are dropped.
pub const DEFAULT_COMMAND_HISTORY: usize = 64;

#[derive(Debug, Clone, Copy)]
struct Camera {
    center: LatLng,
    zoom: f64,
}

/// Bounded record of issued camera commands.
#[derive(Debug)]
struct CommandLog {
    last: Option<CameraCommand>,
    history: VecDeque<CameraCommand>,
    capacity: usize,
}

impl CommandLog {
    fn new(capacity: usize) -> Self {
        Self {
            last: None,
            history: VecDeque::with_capacity(capacity.min(DEFAULT_COMMAND_HISTORY)),
            capacity,
        }
    }

    fn push(&mut self, command: CameraCommand) {
        self.last = Some(command);
        if self.capacity == 0 {
            return;
        }
        if self.history.len() == self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(command);
    }
}

/// A headless [`crate::MapHost`].
pub struct HeadlessMap {
    camera: RwLock<Camera>,
    size: ScreenSize,
    min_zoom: f64,
    max_zoom: f64,
    idle: Signal<()>,
    bounds_changed: Signal<()>,
    zoom_changed: Signal<()>,
    commands: Mutex<CommandLog>,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: f64, size: ScreenSize) -> Self {
        Self {
            camera: RwLock::new(Camera {
                center: center.clamped(),
                zoom: zoom.clamp(DEFAULT_MIN_ZOOM, DEFAULT_MAX_ZOOM),
            }),
            size,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
            idle: Signal::new(),
            bounds_changed: Signal::new(),
            zoom_changed: Signal::new(),
            commands: Mutex::new(CommandLog::new(DEFAULT_COMMAND_HISTORY)),
        }
    }

    /// Restrict the zoom range. The current zoom is clamped silently.
    pub fn with_zoom_range(mut self, min_zoom: f64, max_zoom: f64) -> Self {
        self.min_zoom = min_zoom.min(max_zoom);
        self.max_zoom = max_zoom.max(min_zoom);
        let camera = self.camera.get_mut();
        camera.zoom = camera.zoom.clamp(self.min_zoom, self.max_zoom);
        self
    }

    /// Keep at most `capacity` commands in [`Self::commands`]. Zero keeps
    /// only [`Self::last_command`].
    pub fn with_command_history(mut self, capacity: usize) -> Self {
        *self.commands.get_mut() = CommandLog::new(capacity);
        self
    }

    pub fn center(&self) -> LatLng {
        self.camera.read().center
    }

    pub fn min_zoom(&self) -> f64 {
        self.min_zoom
    }

    /// Fire a viewport event as the host would. Returns the handler count.
    pub fn emit_viewport_event(&self, event: ViewportEvent) -> usize {
        self.signal(event).emit(())
    }

    /// Move the camera without changing zoom, as a user drag would.
    pub fn pan_to(&self, center: LatLng) {
        let zoom = self.camera.read().zoom;
        self.apply(center, zoom);
    }

    /// Number of live subscriptions for `event`.
    pub fn subscriber_count(&self, event: ViewportEvent) -> usize {
        self.signal(event).connection_count()
    }

    /// Recent camera commands issued through [`CameraControl`], oldest first.
    pub fn commands(&self) -> Vec<CameraCommand> {
        self.commands.lock().history.iter().copied().collect()
    }

    /// Drain the recorded commands. [`Self::last_command`] is kept.
    pub fn take_commands(&self) -> Vec<CameraCommand> {
        self.commands.lock().history.drain(..).collect()
    }

    /// The most recent camera command.
    pub fn last_command(&self) -> Option<CameraCommand> {
        self.commands.lock().last
    }

    fn signal(&self, event: ViewportEvent) -> &Signal<()> {
        match event {
            ViewportEvent::Idle => &self.idle,
            ViewportEvent::BoundsChanged => &self.bounds_changed,
            ViewportEvent::ZoomChanged => &self.zoom_changed,
        }
    }

    /// Move the camera and emit the matching events once the lock is released.
    fn apply(&self, center: LatLng, zoom: f64) {
        let center = center.clamped();
        let zoom = zoom.clamp(self.min_zoom, self.max_zoom);
        let (zoom_changed, moved) = {
            let mut camera = self.camera.write();
            let zoom_changed = camera.zoom != zoom;
            let moved = zoom_changed || camera.center != center;
            *camera = Camera { center, zoom };
            (zoom_changed, moved)
        };

        if zoom_changed {
            self.zoom_changed.emit(());
        }
        if moved {
            self.bounds_changed.emit(());
        }
        self.idle.emit(());
    }
}

impl MapViewport for HeadlessMap {
    fn zoom(&self) -> f64 {
        self.camera.read().zoom
    }

    fn bounds(&self) -> LatLngBounds {
        let camera = *self.camera.read();
        geo::viewport_bounds(camera.center, camera.zoom, self.size)
    }

    fn subscribe(&self, event: ViewportEvent, handler: ViewportHandler) -> ViewportSubscription {
        let id = self.signal(event).connect(move |_| handler());
        ViewportSubscription { event, id }
    }

    fn unsubscribe(&self, subscription: ViewportSubscription) -> bool {
        self.signal(subscription.event).disconnect(subscription.id)
    }
}

impl CameraControl for HeadlessMap {
    fn viewport_size(&self) -> ScreenSize {
        self.size
    }

    fn max_zoom(&self) -> f64 {
        self.max_zoom
    }

    fn set_center_zoom(&self, center: LatLng, zoom: f64) {
        self.commands
            .lock()
            .push(CameraCommand::CenterZoom { center, zoom });
        self.apply(center, zoom);
    }

    fn fit_bounds(&self, bounds: LatLngBounds, padding: f64) {
        self.commands
            .lock()
            .push(CameraCommand::FitBounds { bounds, padding });
        let zoom = geo::fit_zoom(&bounds, self.size, padding).min(self.max_zoom);
        self.apply(bounds.center(), zoom);
    }
}

static_assertions::assert_impl_all!(HeadlessMap: Send, Sync);

impl std::fmt::Debug for HeadlessMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let camera = *self.camera.read();
        f.debug_struct("HeadlessMap")
            .field("center", &camera.center)
            .field("zoom", &camera.zoom)
            .field("size", &self.size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn seoul() -> HeadlessMap {
        HeadlessMap::new(LatLng::new(37.566, 126.978), 12.0, ScreenSize::new(800.0, 600.0))
    }

    fn record(map: &HeadlessMap, log: &Arc<Mutex<Vec<ViewportEvent>>>) {
        for event in [
            ViewportEvent::Idle,
            ViewportEvent::BoundsChanged,
            ViewportEvent::ZoomChanged,
        ] {
            let log = log.clone();
            map.subscribe(event, Box::new(move || log.lock().push(event)));
        }
    }

    #[test]
    fn test_set_center_zoom_emits_in_host_order() {
        let map = seoul();
        let log = Arc::new(Mutex::new(Vec::new()));
        record(&map, &log);

        map.set_center_zoom(LatLng::new(37.5, 127.0), 13.0);
        assert_eq!(
            *log.lock(),
            vec![
                ViewportEvent::ZoomChanged,
                ViewportEvent::BoundsChanged,
                ViewportEvent::Idle
            ]
        );
        assert_eq!(map.zoom(), 13.0);
        assert_eq!(
            map.last_command(),
            Some(CameraCommand::CenterZoom {
                center: LatLng::new(37.5, 127.0),
                zoom: 13.0
            })
        );
    }

    #[test]
    fn test_pan_skips_zoom_event() {
        let map = seoul();
        let log = Arc::new(Mutex::new(Vec::new()));
        record(&map, &log);

        map.pan_to(LatLng::new(37.6, 127.0));
        assert_eq!(
            *log.lock(),
            vec![ViewportEvent::BoundsChanged, ViewportEvent::Idle]
        );
        assert!(map.bounds().contains(LatLng::new(37.6, 127.0)));
        assert!(map.commands().is_empty());
    }

    #[test]
    fn test_unsubscribe() {
        let map = seoul();
        let sub = map.subscribe(ViewportEvent::Idle, Box::new(|| {}));
        assert_eq!(map.subscriber_count(ViewportEvent::Idle), 1);
        assert!(map.unsubscribe(sub));
        assert!(!map.unsubscribe(sub));
        assert_eq!(map.emit_viewport_event(ViewportEvent::Idle), 0);
    }

    #[test]
    fn test_fit_bounds_respects_zoom_range() {
        let map = seoul().with_zoom_range(2.0, 16.0);
        map.fit_bounds(LatLngBounds::from_point(LatLng::new(10.0, 10.0)), 0.0);
        assert_eq!(map.zoom(), 16.0);

        map.set_center_zoom(LatLng::new(0.0, 0.0), 0.0);
        assert_eq!(map.zoom(), 2.0);
        assert_eq!(map.commands().len(), 2);
    }

    #[test]
    fn test_command_history_is_bounded() {
        let map = seoul().with_command_history(3);
        for zoom in 1..=5 {
            map.set_center_zoom(LatLng::new(37.5, 127.0), f64::from(zoom));
        }
        let zooms: Vec<f64> = map
            .commands()
            .into_iter()
            .map(|command| match command {
                CameraCommand::CenterZoom { zoom, .. } => zoom,
                CameraCommand::FitBounds { .. } => f64::NAN,
            })
            .collect();
        assert_eq!(zooms, vec![3.0, 4.0, 5.0]);

        assert_eq!(map.take_commands().len(), 3);
        assert!(map.commands().is_empty());
        assert_eq!(
            map.last_command(),
            Some(CameraCommand::CenterZoom {
                center: LatLng::new(37.5, 127.0),
                zoom: 5.0
            })
        );
    }

    #[test]
    fn test_zero_history_keeps_last_command_only() {
        let map = seoul().with_command_history(0);
        map.fit_bounds(LatLngBounds::new(37.0, 126.0, 38.0, 128.0), 10.0);
        assert!(map.commands().is_empty());
        assert!(matches!(
            map.last_command(),
            Some(CameraCommand::FitBounds { padding, .. }) if padding == 10.0
        ));
    }
}
