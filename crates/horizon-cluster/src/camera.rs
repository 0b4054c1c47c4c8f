//! Camera transition helpers.
//!
//! [`CameraHelpers`] is what a cluster-click handler receives. It computes the
//! target camera for a cluster and issues it against the host map.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use horizon_cluster_core::logging::targets;

use crate::algorithm::Cluster;
use crate::geo::{self, LatLng, LatLngBounds};
use crate::map::MapHost;

/// Default upper zoom for [`CameraHelpers::zoom_to_cluster`].
pub const DEFAULT_MAX_ZOOM: f64 = 20.0;

/// A command issued to the host camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraCommand {
    CenterZoom { center: LatLng, zoom: f64 },
    FitBounds { bounds: LatLngBounds, padding: f64 },
}

/// Options for [`CameraHelpers::zoom_to_cluster`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ZoomToClusterOptions {
    /// Pixels kept free around the cluster bounds on every side.
    pub padding: f64,
    pub max_zoom: f64,
    /// Floor the computed zoom to a whole level.
    pub integer_zoom: bool,
}

impl Default for ZoomToClusterOptions {
    fn default() -> Self {
        Self {
            padding: 0.0,
            max_zoom: DEFAULT_MAX_ZOOM,
            integer_zoom: false,
        }
    }
}

impl ZoomToClusterOptions {
    pub fn new(padding: f64, max_zoom: f64) -> Self {
        Self {
            padding,
            max_zoom,
            integer_zoom: false,
        }
    }
}

/// Options for [`CameraHelpers::fit_bounds`].
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FitBoundsOptions {
    pub padding: f64,
}

/// Camera helpers bound to one host map.
#[derive(Clone)]
pub struct CameraHelpers {
    map: Arc<dyn MapHost>,
}

impl CameraHelpers {
    pub fn new(map: Arc<dyn MapHost>) -> Self {
        Self { map }
    }

    /// The zoom [`Self::zoom_to_cluster`] would use, without moving the camera.
    ///
    /// Capped at both `options.max_zoom` and the host's own maximum.
    pub fn cluster_zoom<D>(&self, cluster: &Cluster<D>, options: &ZoomToClusterOptions) -> f64 {
        let cap = options.max_zoom.min(self.map.max_zoom());
        let zoom = match cluster.bounds {
            Some(bounds) => {
                let size = self.map.viewport_size();
                geo::fit_zoom(&bounds.clamped(), size, options.padding).min(cap)
            }
            // No extent to fit; step in one level.
            None => (self.map.zoom() + 1.0).min(cap),
        };
        if options.integer_zoom {
            zoom.floor()
        } else {
            zoom
        }
    }

    /// Center on the cluster at the deepest zoom that still shows its bounds.
    pub fn zoom_to_cluster<D>(
        &self,
        cluster: &Cluster<D>,
        options: &ZoomToClusterOptions,
    ) -> CameraCommand {
        let center = cluster.position.clamped();
        let zoom = self.cluster_zoom(cluster, options);
        tracing::debug!(
            target: targets::CAMERA,
            cluster = %cluster.id,
            zoom,
            has_bounds = cluster.bounds.is_some(),
            "zooming to cluster"
        );
        self.map.set_center_zoom(center, zoom);
        CameraCommand::CenterZoom { center, zoom }
    }

    /// Fit `bounds` in the viewport. Out-of-range edges are clamped.
    pub fn fit_bounds(&self, bounds: LatLngBounds, options: &FitBoundsOptions) -> CameraCommand {
        let clamped = bounds.clamped();
        if clamped != bounds {
            tracing::debug!(target: targets::CAMERA, ?bounds, ?clamped, "clamped fit bounds");
        }
        let padding = options.padding.max(0.0);
        self.map.fit_bounds(clamped, padding);
        CameraCommand::FitBounds {
            bounds: clamped,
            padding,
        }
    }
}

impl std::fmt::Debug for CameraHelpers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CameraHelpers")
            .field("zoom", &self.map.zoom())
            .finish()
    }
}
