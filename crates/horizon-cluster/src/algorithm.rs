//! The pluggable clustering contract.
//!
//! The engine decides *when* to cluster; a [`ClusterAlgorithm`] decides *how*.
//! Any grouping strategy (grid, quad-tree, greedy radius) plugs in by
//! implementing this trait.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::AlgorithmError;
use crate::geo::{LatLng, LatLngBounds};
use crate::registry::Item;

/// Read-only viewport snapshot handed to the algorithm.
///
/// Captured when a recompute settles, not when it was first requested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmContext {
    pub zoom: f64,
    pub bounds: LatLngBounds,
}

/// An aggregated group of nearby items.
///
/// `count` is always the true member total. `items`, when present, may hold
/// fewer entries than `count` after shaping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster<D> {
    pub id: String,
    pub position: LatLng,
    pub count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<LatLngBounds>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item<D>>>,
}

impl<D: Clone> Cluster<D> {
    /// Build a cluster from its members, filling in count, bounds and items.
    ///
    /// Returns `None` for an empty member list.
    pub fn from_members(id: impl Into<String>, position: LatLng, members: &[Item<D>]) -> Option<Self> {
        let bounds = LatLngBounds::from_points(members.iter().map(|item| item.position))?;
        Some(Self {
            id: id.into(),
            position,
            count: members.len(),
            bounds: Some(bounds),
            items: Some(members.to_vec()),
        })
    }
}

/// The output of one recompute.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterResult<D> {
    pub clusters: Vec<Cluster<D>>,
    /// Items the algorithm left ungrouped.
    pub points: Vec<Item<D>>,
}

impl<D> ClusterResult<D> {
    pub fn empty() -> Self {
        Self {
            clusters: Vec::new(),
            points: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty() && self.points.is_empty()
    }

    /// Number of renderable entries (clusters plus leftover points).
    pub fn len(&self) -> usize {
        self.clusters.len() + self.points.len()
    }

    /// Total items represented, counting every cluster member.
    pub fn item_total(&self) -> usize {
        self.clusters.iter().map(|c| c.count).sum::<usize>() + self.points.len()
    }

    pub fn cluster(&self, id: &str) -> Option<&Cluster<D>> {
        self.clusters.iter().find(|cluster| cluster.id == id)
    }
}

impl<D> Default for ClusterResult<D> {
    fn default() -> Self {
        Self::empty()
    }
}

/// A spatial grouping strategy.
pub trait ClusterAlgorithm<D>: Send {
    /// Group `items` for the given viewport.
    ///
    /// Called synchronously, exactly once per settled recompute. Errors are
    /// not retried; they propagate to whoever drives the engine.
    fn cluster(
        &mut self,
        items: &[Item<D>],
        context: &AlgorithmContext,
    ) -> Result<ClusterResult<D>, AlgorithmError>;

    /// Release resources. Called once when this instance is replaced or the
    /// engine is torn down.
    fn destroy(&mut self) {}
}

/// A shared algorithm handle. Identity is pointer identity.
pub type AlgorithmRef<D> = Arc<Mutex<dyn ClusterAlgorithm<D>>>;

/// Wrap an algorithm into an [`AlgorithmRef`].
pub fn algorithm_ref<D, A>(algorithm: A) -> AlgorithmRef<D>
where
    A: ClusterAlgorithm<D> + 'static,
{
    Arc::new(Mutex::new(algorithm))
}
