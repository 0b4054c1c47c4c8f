//! Logging facilities for Horizon Cluster.
//!
//! Horizon Cluster uses the `tracing` crate for instrumentation. To see logs,
//! install a subscriber in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("horizon_cluster=debug,horizon_cluster_core=info")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Runtime crate target.
    pub const CORE: &str = "horizon_cluster_core";
    /// Event loop target.
    pub const EVENT_LOOP: &str = "horizon_cluster_core::event_loop";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "horizon_cluster_core::signal";
    /// Engine facade target.
    pub const ENGINE: &str = "horizon_cluster::engine";
    /// Recompute scheduler target.
    pub const SCHEDULER: &str = "horizon_cluster::scheduler";
    /// Viewport watcher target.
    pub const WATCHER: &str = "horizon_cluster::watcher";
    /// Algorithm invoker target.
    pub const INVOKER: &str = "horizon_cluster::invoker";
    /// Camera helpers target.
    pub const CAMERA: &str = "horizon_cluster::camera";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time recomputes and other potentially slow operations.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: "horizon_cluster::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Warn-level log on the clustering target.
#[macro_export]
macro_rules! cluster_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "horizon_cluster", $($arg)*)
    };
}
