//! End-to-end scheduling and lifecycle scenarios.
//!
//! Time is virtual: every test drives a `ManualClock`-backed event loop, so
//! debounce windows are exact. Set `RUST_LOG=horizon_cluster=trace` to see
//! the engine's decisions.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use horizon_cluster::{
    algorithm_ref, AlgorithmContext, AlgorithmError, AlgorithmRef, BehaviorConfig, CameraCommand,
    CameraControl, Cluster, ClusterAlgorithm, ClusterConfig, ClusterDataConfig, ClusterEngine,
    ClusterError, ClusterResult, EventLoop, HeadlessMap, Item, LatLng, LatLngBounds, ManualClock,
    MapViewport, RecomputeTrigger, RenderKey, ScreenSize, ViewportEvent, ZoomToClusterOptions,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// What one algorithm call saw.
#[derive(Debug, Clone)]
struct Invocation {
    ids: Vec<String>,
    zoom: f64,
    at: Duration,
}

#[derive(Default)]
struct Probe {
    invocations: Mutex<Vec<Invocation>>,
    destroyed: AtomicUsize,
    fail: AtomicBool,
}

impl Probe {
    fn count(&self) -> usize {
        self.invocations.lock().len()
    }

    fn last(&self) -> Option<Invocation> {
        self.invocations.lock().last().cloned()
    }
}

/// Buckets items into square cells; cells with two or more members cluster.
struct GridAlgorithm {
    cell_degrees: f64,
    clock: Arc<ManualClock>,
    probe: Arc<Probe>,
}

impl ClusterAlgorithm<u32> for GridAlgorithm {
    fn cluster(
        &mut self,
        items: &[Item<u32>],
        context: &AlgorithmContext,
    ) -> Result<ClusterResult<u32>, AlgorithmError> {
        self.probe.invocations.lock().push(Invocation {
            ids: items.iter().map(|item| item.id.clone()).collect(),
            zoom: context.zoom,
            at: self.clock.elapsed(),
        });
        if self.probe.fail.load(Ordering::SeqCst) {
            return Err(AlgorithmError::failed("grid exploded"));
        }

        let mut cells: BTreeMap<(i64, i64), Vec<Item<u32>>> = BTreeMap::new();
        for item in items {
            let key = (
                (item.position.lat / self.cell_degrees).floor() as i64,
                (item.position.lng / self.cell_degrees).floor() as i64,
            );
            cells.entry(key).or_default().push(item.clone());
        }

        let mut result = ClusterResult::empty();
        for ((row, col), members) in cells {
            if members.len() < 2 {
                result.points.extend(members);
                continue;
            }
            let n = members.len() as f64;
            let center = LatLng::new(
                members.iter().map(|m| m.position.lat).sum::<f64>() / n,
                members.iter().map(|m| m.position.lng).sum::<f64>() / n,
            );
            let id = format!("cell:{row}:{col}");
            if let Some(cluster) = Cluster::from_members(id, center, &members) {
                result.clusters.push(cluster);
            }
        }
        Ok(result)
    }

    fn destroy(&mut self) {
        self.probe.destroyed.fetch_add(1, Ordering::SeqCst);
    }
}

struct Harness {
    clock: Arc<ManualClock>,
    event_loop: Arc<EventLoop>,
    map: Arc<HeadlessMap>,
    probe: Arc<Probe>,
    engine: ClusterEngine<u32>,
}

impl Harness {
    fn new(config: ClusterConfig) -> Self {
        init_tracing();
        let clock = Arc::new(ManualClock::new());
        let event_loop = Arc::new(EventLoop::with_clock(clock.clone()));
        let map = Arc::new(HeadlessMap::new(
            LatLng::new(37.566, 126.978),
            10.0,
            ScreenSize::new(800.0, 600.0),
        ));
        let probe = Arc::new(Probe::default());
        let algorithm = grid(&clock, &probe);
        let engine = ClusterEngine::new(map.clone(), event_loop.clone(), algorithm, config);
        Self {
            clock,
            event_loop,
            map,
            probe,
            engine,
        }
    }

    /// A harness whose mount recompute has already run.
    fn settled(config: ClusterConfig) -> Self {
        let harness = Self::new(config);
        harness.event_loop.process_ready().unwrap();
        harness
    }

    fn with_behavior(recompute_on: RecomputeTrigger, debounce_ms: i64) -> Self {
        Self::settled(ClusterConfig {
            behavior: BehaviorConfig::new(recompute_on, debounce_ms),
            ..ClusterConfig::default()
        })
    }

    fn run_for(&self, ms: u64) {
        self.event_loop.run_for(Duration::from_millis(ms)).unwrap();
    }

    fn seed_seoul(&self) {
        self.engine.upsert_item("a", LatLng::new(37.51, 126.91), 1);
        self.engine.upsert_item("b", LatLng::new(37.52, 126.92), 2);
        self.engine.upsert_item("c", LatLng::new(37.53, 126.93), 3);
        self.engine.upsert_item("far", LatLng::new(35.1, 129.0), 4);
    }
}

fn grid(clock: &Arc<ManualClock>, probe: &Arc<Probe>) -> AlgorithmRef<u32> {
    algorithm_ref(GridAlgorithm {
        cell_degrees: 1.0,
        clock: clock.clone(),
        probe: probe.clone(),
    })
}

fn millis(ms: u64) -> Duration {
    Duration::from_millis(ms)
}

#[test]
fn test_burst_settles_once_with_latest_snapshot() {
    let h = Harness::with_behavior(RecomputeTrigger::Idle, 100);
    assert_eq!(h.probe.count(), 1);

    h.map.set_center_zoom(LatLng::new(37.5, 127.0), 11.0);
    h.run_for(40);
    h.engine.upsert_item("mid-window", LatLng::new(37.5, 127.0), 7);
    h.run_for(40);
    h.map.set_center_zoom(LatLng::new(37.5, 127.0), 9.0);
    h.run_for(99);
    assert_eq!(h.probe.count(), 1);

    h.run_for(1);
    assert_eq!(h.probe.count(), 2);
    let settled = h.probe.last().unwrap();
    assert_eq!(settled.ids, vec!["mid-window".to_string()]);
    assert_eq!(settled.zoom, 9.0);
    assert_eq!(settled.at, millis(180));

    h.run_for(1_000);
    assert_eq!(h.probe.count(), 2);
}

#[test]
fn test_empty_items_still_invoke_algorithm() {
    let h = Harness::new(ClusterConfig::default());
    assert_eq!(h.probe.count(), 0);
    h.event_loop.process_ready().unwrap();

    assert_eq!(h.probe.count(), 1);
    assert!(h.probe.last().unwrap().ids.is_empty());
    assert!(h.engine.descriptors().is_empty());
}

#[test]
fn test_algorithm_swap_destroys_previous_once() {
    let h = Harness::settled(ClusterConfig::default());
    let second_probe = Arc::new(Probe::default());
    let second = grid(&h.clock, &second_probe);

    assert!(h.engine.set_algorithm(second.clone()));
    assert!(!h.engine.set_algorithm(second.clone()));
    assert_eq!(h.probe.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(second_probe.destroyed.load(Ordering::SeqCst), 0);

    h.event_loop.process_ready().unwrap();
    assert_eq!(second_probe.count(), 1);
    assert_eq!(h.probe.count(), 1);

    h.engine.teardown();
    assert_eq!(h.probe.destroyed.load(Ordering::SeqCst), 1);
    assert_eq!(second_probe.destroyed.load(Ordering::SeqCst), 1);
}

#[test]
fn test_excluding_items_keeps_counts() {
    let h = Harness::settled(ClusterConfig::default());
    h.seed_seoul();
    let full = h.engine.recompute_now().unwrap();
    assert_eq!(full.clusters.len(), 1);
    assert_eq!(full.clusters[0].items.as_ref().map(Vec::len), Some(3));

    h.engine.set_cluster_data(ClusterDataConfig::counts_only());
    h.event_loop.process_ready().unwrap();
    let stripped = h.engine.current_result();

    assert_eq!(stripped.clusters.len(), full.clusters.len());
    for (with, without) in full.clusters.iter().zip(&stripped.clusters) {
        assert_eq!(with.count, without.count);
        assert!(without.items.is_none());
    }
    assert_eq!(stripped.points, full.points);
}

#[test]
fn test_max_items_caps_membership() {
    let h = Harness::settled(ClusterConfig {
        cluster_data: ClusterDataConfig::with_max_items(2),
        ..ClusterConfig::default()
    });
    h.seed_seoul();
    let result = h.engine.recompute_now().unwrap();

    let cluster = &result.clusters[0];
    assert_eq!(cluster.count, 3);
    let items = cluster.items.as_ref().unwrap();
    assert!(items.len() <= 2);
    assert!(cluster.count >= items.len());
}

#[test]
fn test_reenable_reproduces_result() {
    let h = Harness::settled(ClusterConfig::default());
    h.seed_seoul();
    let before = h.engine.recompute_now().unwrap();

    h.engine.set_enabled(false);
    assert!(h.engine.descriptors().iter().all(|d| !d.is_cluster()));
    assert_eq!(h.engine.descriptors().len(), 4);

    h.engine.set_enabled(true);
    h.engine.set_enabled(true);
    h.event_loop.process_ready().unwrap();
    let after = h.engine.current_result();

    assert_eq!(*before, *after);
    assert_eq!(h.map.subscriber_count(ViewportEvent::Idle), 1);
}

#[test]
fn test_zoom_to_cluster_caps_padded_fit() {
    let h = Harness::settled(ClusterConfig::default());
    let bounds = LatLngBounds::new(37.5652, 126.977, 37.567, 126.9795);
    let cluster: Cluster<u32> = Cluster {
        id: "seoul".into(),
        position: bounds.center(),
        count: 8,
        bounds: Some(bounds),
        items: None,
    };
    let unpadded = horizon_cluster::geo::fit_zoom(&bounds, ScreenSize::new(800.0, 600.0), 0.0);

    let command = h
        .engine
        .helpers()
        .zoom_to_cluster(&cluster, &ZoomToClusterOptions::new(10.0, 14.0));
    let CameraCommand::CenterZoom { zoom, .. } = command else {
        panic!("expected a center/zoom command, got {command:?}");
    };
    assert!(zoom <= 14.0);
    assert!(zoom >= unpadded.min(14.0));
    assert_eq!(h.map.zoom(), zoom);

    // Below the cap, padding only ever zooms out.
    let padded = h
        .engine
        .helpers()
        .cluster_zoom(&cluster, &ZoomToClusterOptions::new(10.0, 22.0));
    assert!(padded < unpadded);
}

#[test]
fn test_idle_burst_at_0_50_150_invokes_once() {
    let h = Harness::with_behavior(RecomputeTrigger::Idle, 200);
    let baseline = h.probe.count();

    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(50);
    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(100);
    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(350);

    assert_eq!(h.clock.elapsed(), millis(500));
    assert_eq!(h.probe.count() - baseline, 1);
    assert_eq!(h.probe.last().unwrap().at, millis(350));
}

#[test]
fn test_disable_cancels_pending_window() {
    let h = Harness::with_behavior(RecomputeTrigger::Idle, 200);
    let baseline = h.probe.count();

    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(100);
    assert!(h.engine.is_recompute_pending());

    h.engine.set_enabled(false);
    assert!(!h.engine.is_recompute_pending());
    h.run_for(1_000);
    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(1_000);

    assert_eq!(h.probe.count(), baseline);
    assert_eq!(h.map.subscriber_count(ViewportEvent::Idle), 0);
}

#[test]
fn test_non_matching_events_are_ignored() {
    let h = Harness::with_behavior(RecomputeTrigger::Zoom, 0);
    let baseline = h.probe.count();

    h.map.pan_to(LatLng::new(36.0, 127.0));
    h.run_for(10);
    assert_eq!(h.probe.count(), baseline);

    h.map.set_center_zoom(LatLng::new(36.0, 127.0), 12.0);
    h.run_for(10);
    assert_eq!(h.probe.count(), baseline + 1);
}

#[test]
fn test_zero_debounce_is_never_synchronous() {
    let h = Harness::with_behavior(RecomputeTrigger::Idle, 0);
    let baseline = h.probe.count();

    h.map.emit_viewport_event(ViewportEvent::Idle);
    assert_eq!(h.probe.count(), baseline);
    h.event_loop.process_ready().unwrap();
    assert_eq!(h.probe.count(), baseline + 1);
}

#[test]
fn test_reconfigure_mid_window_drops_stale_timer() {
    let h = Harness::with_behavior(RecomputeTrigger::Idle, 200);
    let baseline = h.probe.count();

    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(100);
    h.engine
        .set_behavior(BehaviorConfig::new(RecomputeTrigger::Move, 300));
    h.run_for(1_000);
    assert_eq!(h.probe.count(), baseline);

    h.map.emit_viewport_event(ViewportEvent::Idle);
    h.run_for(1_000);
    assert_eq!(h.probe.count(), baseline);

    h.map.emit_viewport_event(ViewportEvent::BoundsChanged);
    h.run_for(299);
    assert_eq!(h.probe.count(), baseline);
    h.run_for(1);
    assert_eq!(h.probe.count(), baseline + 1);
}

#[test]
fn test_algorithm_error_propagates_and_keeps_result() {
    let h = Harness::settled(ClusterConfig::default());
    h.seed_seoul();
    let good = h.engine.recompute_now().unwrap();

    h.probe.fail.store(true, Ordering::SeqCst);
    let err = h.engine.recompute_now().unwrap_err();
    assert!(matches!(err, ClusterError::Algorithm(AlgorithmError::Failed(_))));

    h.map.emit_viewport_event(ViewportEvent::Idle);
    let task_err = h.event_loop.run_for(millis(500)).unwrap_err();
    let cluster_err = task_err.downcast_ref::<ClusterError>().unwrap();
    assert!(cluster_err.as_algorithm().is_some());

    assert_eq!(*h.engine.current_result(), *good);
}

#[test]
fn test_cluster_click_zooms_camera() {
    let h = Harness::settled(ClusterConfig::default());
    h.seed_seoul();
    h.engine.recompute_now().unwrap();

    let clicked = Arc::new(Mutex::new(None));
    let clicked_clone = clicked.clone();
    h.engine.on_cluster_click(move |cluster, helpers| {
        let command = helpers.zoom_to_cluster(cluster, &ZoomToClusterOptions::new(20.0, 16.0));
        *clicked_clone.lock() = Some((cluster.id.clone(), command));
    });

    let id = h.engine.current_result().clusters[0].id.clone();
    assert!(h.engine.click_cluster(&id));

    let (clicked_id, command) = clicked.lock().clone().unwrap();
    assert_eq!(clicked_id, id);
    assert_eq!(h.map.last_command(), Some(command));
}

#[test]
fn test_registry_removal_renders_survivors_in_order() {
    let h = Harness::settled(ClusterConfig {
        enabled: false,
        ..ClusterConfig::default()
    });
    h.seed_seoul();
    h.engine.remove_item("b");
    h.engine.upsert_item("a", LatLng::new(10.0, 10.0), 10);

    let keys: Vec<_> = h
        .engine
        .descriptors()
        .iter()
        .map(|descriptor| descriptor.key())
        .collect();
    assert_eq!(
        keys,
        vec![
            RenderKey::Point("a".into()),
            RenderKey::Point("c".into()),
            RenderKey::Point("far".into()),
        ]
    );
    assert_eq!(h.probe.count(), 0);
}
