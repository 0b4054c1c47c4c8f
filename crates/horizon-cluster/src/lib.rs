//! Horizon Cluster: debounced, pluggable map marker clustering.
//!
//! The engine decides *when* to cluster a dynamic item set against a host
//! map and leaves *how* to a [`ClusterAlgorithm`]. It debounces viewport
//! events into settled recomputes, runs the algorithm over the item and
//! viewport snapshot current at settle time, shapes the result for rendering
//! and offers camera helpers for cluster clicks.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use horizon_cluster::prelude::*;
//!
//! /// Puts every item in one cluster.
//! struct Everything;
//!
//! impl ClusterAlgorithm<()> for Everything {
//!     fn cluster(
//!         &mut self,
//!         items: &[Item<()>],
//!         context: &AlgorithmContext,
//!     ) -> Result<ClusterResult<()>, AlgorithmError> {
//!         let center = context.bounds.center();
//!         Ok(ClusterResult {
//!             clusters: Cluster::from_members("all", center, items).into_iter().collect(),
//!             points: Vec::new(),
//!         })
//!     }
//! }
//!
//! let clock = Arc::new(ManualClock::new());
//! let event_loop = Arc::new(EventLoop::with_clock(clock));
//! let map = Arc::new(HeadlessMap::new(
//!     LatLng::new(37.566, 126.978),
//!     12.0,
//!     ScreenSize::new(800.0, 600.0),
//! ));
//!
//! let engine = ClusterEngine::new(
//!     map.clone(),
//!     event_loop.clone(),
//!     algorithm_ref(Everything),
//!     ClusterConfig::default(),
//! );
//! engine.upsert_item("city-hall", LatLng::new(37.5663, 126.9779), ());
//! engine.upsert_item("station", LatLng::new(37.5547, 126.9707), ());
//!
//! event_loop.run_for(Duration::from_millis(200)).unwrap();
//! assert_eq!(engine.current_result().clusters[0].count, 2);
//! ```

pub mod algorithm;
pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod gate;
pub mod geo;
pub mod headless;
pub mod invoker;
pub mod map;
pub mod projector;
pub mod registry;
pub mod scheduler;
pub mod shaper;
pub mod watcher;

pub use algorithm::{
    algorithm_ref, AlgorithmContext, AlgorithmRef, Cluster, ClusterAlgorithm, ClusterResult,
};
pub use camera::{CameraCommand, CameraHelpers, FitBoundsOptions, ZoomToClusterOptions};
pub use config::{BehaviorConfig, ClusterConfig, ClusterDataConfig, RecomputeTrigger};
pub use engine::{ClusterClick, ClusterEngine};
pub use error::{AlgorithmError, ClusterError, ConfigError, EngineResult};
pub use gate::{EnabledGate, GateTransition};
pub use geo::{LatLng, LatLngBounds, ScreenSize};
pub use headless::HeadlessMap;
pub use map::{CameraControl, MapHost, MapViewport, ViewportEvent, ViewportSubscription};
pub use projector::{ClusterRenderer, FnRenderer, RenderDescriptor, RenderKey};
pub use registry::{Item, ItemRegistry};
pub use scheduler::{RecomputeScheduler, SchedulerState};

pub use horizon_cluster_core::*;

/// Commonly used types.
pub mod prelude {
    pub use crate::algorithm::{
        algorithm_ref, AlgorithmContext, AlgorithmRef, Cluster, ClusterAlgorithm, ClusterResult,
    };
    pub use crate::camera::{CameraHelpers, ZoomToClusterOptions};
    pub use crate::config::{BehaviorConfig, ClusterConfig, ClusterDataConfig, RecomputeTrigger};
    pub use crate::engine::ClusterEngine;
    pub use crate::error::AlgorithmError;
    pub use crate::geo::{LatLng, LatLngBounds, ScreenSize};
    pub use crate::headless::HeadlessMap;
    pub use crate::map::{MapHost, MapViewport, ViewportEvent};
    pub use crate::projector::{ClusterRenderer, RenderDescriptor};
    pub use crate::registry::Item;
    pub use horizon_cluster_core::{EventLoop, ManualClock, SystemClock};
}
