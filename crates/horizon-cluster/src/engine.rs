//! The clustering engine facade.
//!
//! [`ClusterEngine`] wires the pieces together:
//!
//! ```text
//! host viewport event -> ViewportWatcher -> RecomputeScheduler (debounce)
//!     -> AlgorithmInvoker (registry snapshot + viewport at settle time)
//!     -> shape -> current result -> descriptors / render callbacks
//! ```
//!
//! Hosts pump the shared [`EventLoop`]; a failing algorithm surfaces from
//! whichever call ran the settled recompute.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};

use horizon_cluster_core::logging::targets;
use horizon_cluster_core::{
    ConnectionId, EventLoop, PerfSpan, Property, Signal, TaskError, TaskResult,
};

use crate::algorithm::{AlgorithmContext, AlgorithmRef, Cluster, ClusterResult};
use crate::camera::CameraHelpers;
use crate::config::{BehaviorConfig, ClusterConfig, ClusterDataConfig};
use crate::error::{ClusterError, EngineResult};
use crate::gate::{EnabledGate, GateTransition};
use crate::geo::LatLng;
use crate::invoker::{self, AlgorithmInvoker};
use crate::map::MapHost;
use crate::projector::{self, ClusterRenderer, RenderDescriptor, RenderKey};
use crate::registry::{Item, ItemRegistry};
use crate::scheduler::{RecomputeScheduler, SchedulerState};
use crate::shaper;
use crate::watcher::ViewportWatcher;

/// Payload of the cluster-click signal.
#[derive(Debug, Clone)]
pub struct ClusterClick<D> {
    pub cluster: Cluster<D>,
    pub helpers: CameraHelpers,
}

struct EngineInner<D> {
    map: Arc<dyn MapHost>,
    event_loop: Arc<EventLoop>,
    registry: Mutex<ItemRegistry<D>>,
    invoker: Mutex<AlgorithmInvoker<D>>,
    scheduler: RecomputeScheduler,
    watcher: ViewportWatcher,
    gate: EnabledGate,
    behavior: Property<BehaviorConfig>,
    cluster_data: Property<ClusterDataConfig>,
    result: RwLock<Arc<ClusterResult<D>>>,
    helpers: CameraHelpers,
    cluster_clicked: Signal<ClusterClick<D>>,
    result_changed: Signal<Arc<ClusterResult<D>>>,
    torn_down: AtomicBool,
}

/// Clusters a dynamic item set against a host map.
///
/// Dropping the engine tears it down.
pub struct ClusterEngine<D: Clone + Send + Sync + 'static> {
    inner: Arc<EngineInner<D>>,
}

impl<D: Clone + Send + Sync + 'static> ClusterEngine<D> {
    /// Create an engine and mount it on `map`.
    ///
    /// When `config.enabled` is set the engine subscribes to the configured
    /// trigger and requests one recompute for the next tick.
    pub fn new(
        map: Arc<dyn MapHost>,
        event_loop: Arc<EventLoop>,
        algorithm: AlgorithmRef<D>,
        config: ClusterConfig,
    ) -> Self {
        let behavior = config.behavior.normalized();
        let inner = Arc::new_cyclic(|weak: &Weak<EngineInner<D>>| {
            let weak = weak.clone();
            let scheduler =
                RecomputeScheduler::new(event_loop.clone(), behavior.debounce(), move || {
                    match weak.upgrade() {
                        Some(inner) => inner.settle(),
                        None => Ok(()),
                    }
                });
            EngineInner {
                watcher: ViewportWatcher::new(map.clone()),
                helpers: CameraHelpers::new(map.clone()),
                map,
                event_loop,
                registry: Mutex::new(ItemRegistry::new()),
                invoker: Mutex::new(AlgorithmInvoker::new(Some(algorithm))),
                scheduler,
                gate: EnabledGate::new(config.enabled),
                behavior: Property::new(behavior),
                cluster_data: Property::new(config.cluster_data),
                result: RwLock::new(Arc::new(ClusterResult::empty())),
                cluster_clicked: Signal::new(),
                result_changed: Signal::new(),
                torn_down: AtomicBool::new(false),
            }
        });

        if config.enabled {
            inner.watch();
            inner.scheduler.request_immediate();
        } else {
            inner.scheduler.pause();
        }
        tracing::debug!(target: targets::ENGINE, enabled = config.enabled, "engine mounted");

        Self { inner }
    }

    // -------------------------------------------------------------------------
    // Items
    // -------------------------------------------------------------------------

    /// Insert or overwrite an item and request a debounced recompute.
    pub fn upsert_item(&self, id: impl Into<String>, position: LatLng, data: D) -> bool {
        let inserted = self.inner.registry.lock().upsert(id, position, data);
        self.inner.scheduler.request();
        inserted
    }

    /// Remove an item and request a debounced recompute if it existed.
    pub fn remove_item(&self, id: &str) -> Option<Item<D>> {
        let removed = self.inner.registry.lock().remove(id);
        if removed.is_some() {
            self.inner.scheduler.request();
        }
        removed
    }

    pub fn clear_items(&self) {
        let mut registry = self.inner.registry.lock();
        if registry.is_empty() {
            return;
        }
        registry.clear();
        drop(registry);
        self.inner.scheduler.request();
    }

    pub fn item_count(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// The current item snapshot.
    pub fn items(&self) -> Arc<[Item<D>]> {
        self.inner.registry.lock().snapshot()
    }

    // -------------------------------------------------------------------------
    // Configuration
    // -------------------------------------------------------------------------

    pub fn is_enabled(&self) -> bool {
        self.inner.gate.is_open()
    }

    /// Open or close the gate.
    ///
    /// Closing cancels the pending recompute and unsubscribes. Opening
    /// resubscribes and requests one recompute for the next tick.
    pub fn set_enabled(&self, enabled: bool) {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return;
        }
        match inner.gate.set(enabled) {
            GateTransition::Closed => {
                inner.scheduler.pause();
                inner.watcher.unwatch();
                tracing::debug!(target: targets::ENGINE, "clustering disabled");
            }
            GateTransition::Opened => {
                inner.scheduler.resume();
                inner.watch();
                inner.scheduler.request_immediate();
                tracing::debug!(target: targets::ENGINE, "clustering enabled");
            }
            GateTransition::Unchanged => {}
        }
    }

    pub fn behavior(&self) -> BehaviorConfig {
        self.inner.behavior.get()
    }

    /// Change the trigger or debounce window.
    ///
    /// The old subscription and any pending recompute are dropped before the
    /// new trigger is watched.
    pub fn set_behavior(&self, behavior: BehaviorConfig) {
        let inner = &self.inner;
        let behavior = behavior.normalized();
        if inner.is_torn_down() || !inner.behavior.set(behavior) {
            return;
        }
        inner.watcher.unwatch();
        inner.scheduler.reconfigure(behavior.debounce());
        if inner.gate.is_open() {
            inner.watch();
        }
        tracing::debug!(
            target: targets::ENGINE,
            trigger = ?behavior.recompute_on,
            debounce_ms = behavior.debounce_ms,
            "behavior reconfigured"
        );
    }

    pub fn cluster_data(&self) -> ClusterDataConfig {
        self.inner.cluster_data.get()
    }

    /// Change membership shaping. Takes effect with a recompute on the next tick.
    pub fn set_cluster_data(&self, cluster_data: ClusterDataConfig) {
        if self.inner.cluster_data.set(cluster_data) {
            self.inner.scheduler.request_immediate();
        }
    }

    /// Swap the algorithm. The previous instance is destroyed.
    ///
    /// Returns `false` if `algorithm` is the instance already installed.
    pub fn set_algorithm(&self, algorithm: AlgorithmRef<D>) -> bool {
        let inner = &self.inner;
        if inner.is_torn_down() {
            return false;
        }
        if !inner.invoker.lock().replace(Some(algorithm)) {
            return false;
        }
        inner.scheduler.cancel();
        inner.scheduler.request_immediate();
        true
    }

    /// The whole non-algorithm configuration.
    pub fn config(&self) -> ClusterConfig {
        ClusterConfig {
            enabled: self.is_enabled(),
            behavior: self.behavior(),
            cluster_data: self.cluster_data(),
        }
    }

    /// Apply a configuration, reconfiguring only what changed.
    pub fn apply_config(&self, config: ClusterConfig) {
        if !config.enabled {
            self.set_enabled(false);
        }
        self.set_behavior(config.behavior);
        self.set_cluster_data(config.cluster_data);
        if config.enabled {
            self.set_enabled(true);
        }
    }

    // -------------------------------------------------------------------------
    // Results
    // -------------------------------------------------------------------------

    /// Cancel any pending recompute and run one now.
    pub fn recompute_now(&self) -> EngineResult<Arc<ClusterResult<D>>> {
        self.inner.scheduler.cancel();
        self.inner.recompute()
    }

    /// The result of the last settled recompute.
    pub fn current_result(&self) -> Arc<ClusterResult<D>> {
        self.inner.result.read().clone()
    }

    /// What to draw right now.
    ///
    /// While disabled every item is an individual point.
    pub fn descriptors(&self) -> Vec<RenderDescriptor<D>> {
        if self.inner.gate.is_open() {
            projector::project(&self.current_result())
        } else {
            projector::project_points(&self.items())
        }
    }

    /// Hand the current descriptors to `renderer`.
    pub fn render<R>(&self, renderer: &mut R) -> Vec<(RenderKey, R::Output)>
    where
        R: ClusterRenderer<D> + ?Sized,
    {
        projector::render(&self.descriptors(), renderer)
    }

    /// Algorithm invocations so far.
    pub fn invocation_count(&self) -> u64 {
        self.inner.invoker.lock().invocations()
    }

    pub fn scheduler_state(&self) -> SchedulerState {
        self.inner.scheduler.state()
    }

    /// Whether a recompute is waiting on the event loop.
    pub fn is_recompute_pending(&self) -> bool {
        self.inner.scheduler.is_pending()
    }

    // -------------------------------------------------------------------------
    // Interaction
    // -------------------------------------------------------------------------

    /// Camera helpers bound to this engine's map.
    pub fn helpers(&self) -> CameraHelpers {
        self.inner.helpers.clone()
    }

    /// Report a click on the rendered cluster `id`.
    ///
    /// Returns `false` if no such cluster is currently rendered.
    pub fn click_cluster(&self, id: &str) -> bool {
        if !self.inner.gate.is_open() {
            return false;
        }
        let Some(cluster) = self.current_result().cluster(id).cloned() else {
            tracing::trace!(target: targets::ENGINE, cluster = id, "click on unknown cluster");
            return false;
        };
        self.inner.cluster_clicked.emit(ClusterClick {
            cluster,
            helpers: self.helpers(),
        });
        true
    }

    /// Connect a cluster-click handler.
    pub fn on_cluster_click<F>(&self, handler: F) -> ConnectionId
    where
        F: Fn(&Cluster<D>, &CameraHelpers) + Send + Sync + 'static,
    {
        self.inner
            .cluster_clicked
            .connect(move |click| handler(&click.cluster, &click.helpers))
    }

    pub fn cluster_clicked(&self) -> &Signal<ClusterClick<D>> {
        &self.inner.cluster_clicked
    }

    /// Emitted after every settled recompute with the new result.
    pub fn result_changed(&self) -> &Signal<Arc<ClusterResult<D>>> {
        &self.inner.result_changed
    }

    pub fn event_loop(&self) -> &Arc<EventLoop> {
        &self.inner.event_loop
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Unmount: cancel pending work, unsubscribe and destroy the algorithm.
    ///
    /// Idempotent.
    pub fn teardown(&self) {
        let inner = &self.inner;
        if inner.torn_down.swap(true, Ordering::SeqCst) {
            return;
        }
        inner.scheduler.pause();
        inner.watcher.unwatch();
        inner.invoker.lock().teardown();
        inner.cluster_clicked.disconnect_all();
        inner.result_changed.disconnect_all();
        tracing::debug!(target: targets::ENGINE, "engine torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.is_torn_down()
    }
}

impl<D: Clone + Send + Sync + 'static> EngineInner<D> {
    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    fn watch(self: &Arc<Self>) {
        let weak = Arc::downgrade(self);
        let trigger = self.behavior.with(|behavior| behavior.recompute_on);
        self.watcher.watch(trigger, move || {
            if let Some(inner) = weak.upgrade() {
                tracing::trace!(target: targets::ENGINE, ?trigger, "viewport trigger");
                inner.scheduler.request();
            }
        });
    }

    /// Timer entry point. A closed gate or teardown makes it a no-op.
    fn settle(&self) -> TaskResult {
        if self.is_torn_down() || !self.gate.is_open() {
            return Ok(());
        }
        self.recompute().map(drop).map_err(TaskError::new)
    }

    fn recompute(&self) -> EngineResult<Arc<ClusterResult<D>>> {
        if self.is_torn_down() {
            return Err(ClusterError::TornDown);
        }
        if !self.gate.is_open() {
            return Err(ClusterError::Disabled);
        }
        let Some(algorithm) = self.invoker.lock().current() else {
            return Err(ClusterError::TornDown);
        };

        // Snapshot at settle time, not at request time.
        let items = self.registry.lock().snapshot();
        let context = AlgorithmContext {
            zoom: self.map.zoom(),
            bounds: self.map.bounds(),
        };

        let raw = {
            let _span = PerfSpan::new("recompute");
            self.invoker.lock().record_invocation();
            invoker::invoke(&algorithm, &items, &context)?
        };
        let shaped = Arc::new(shaper::shape(raw, &self.cluster_data.get()));
        *self.result.write() = shaped.clone();

        tracing::debug!(
            target: targets::ENGINE,
            items = items.len(),
            clusters = shaped.clusters.len(),
            points = shaped.points.len(),
            zoom = context.zoom,
            "recompute settled"
        );
        self.result_changed.emit(shaped.clone());
        Ok(shaped)
    }
}

impl<D: Clone + Send + Sync + 'static> Drop for ClusterEngine<D> {
    fn drop(&mut self) {
        self.teardown();
    }
}

static_assertions::assert_impl_all!(ClusterEngine<()>: Send, Sync);

impl<D: Clone + Send + Sync + 'static> std::fmt::Debug for ClusterEngine<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterEngine")
            .field("enabled", &self.is_enabled())
            .field("behavior", &self.behavior())
            .field("items", &self.item_count())
            .field("scheduler", &self.inner.scheduler)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}
