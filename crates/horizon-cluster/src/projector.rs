//! Render projection.
//!
//! Turns a shaped [`ClusterResult`] into one descriptor per cluster and one per
//! leftover point. Projection is pure: the same result always yields the same
//! descriptors in the same order, keyed by the ids the algorithm chose.

use serde::{Deserialize, Serialize};

use crate::algorithm::{Cluster, ClusterResult};
use crate::geo::LatLng;
use crate::registry::Item;

/// Reconciliation key for a rendered marker.
///
/// Clusters and points live in separate namespaces, so a cluster and an item
/// sharing an id never collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RenderKey {
    Cluster(String),
    Point(String),
}

/// Something to put on the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderDescriptor<D> {
    Cluster(Cluster<D>),
    Point(Item<D>),
}

impl<D> RenderDescriptor<D> {
    pub fn key(&self) -> RenderKey {
        match self {
            Self::Cluster(cluster) => RenderKey::Cluster(cluster.id.clone()),
            Self::Point(item) => RenderKey::Point(item.id.clone()),
        }
    }

    pub fn position(&self) -> LatLng {
        match self {
            Self::Cluster(cluster) => cluster.position,
            Self::Point(item) => item.position,
        }
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Cluster(_))
    }
}

/// Clusters in result order, then leftover points in result order.
pub fn project<D: Clone>(result: &ClusterResult<D>) -> Vec<RenderDescriptor<D>> {
    let clusters = result.clusters.iter().cloned().map(RenderDescriptor::Cluster);
    let points = result.points.iter().cloned().map(RenderDescriptor::Point);
    clusters.chain(points).collect()
}

/// Every item as an individual point, bypassing clustering.
pub fn project_points<D: Clone>(items: &[Item<D>]) -> Vec<RenderDescriptor<D>> {
    items.iter().cloned().map(RenderDescriptor::Point).collect()
}

/// Caller-supplied render callbacks.
pub trait ClusterRenderer<D> {
    /// Rendered marker content.
    type Output;

    /// Render a cluster marker.
    fn render_cluster(&mut self, cluster: &Cluster<D>, count: usize) -> Self::Output;

    /// Render an ordinary item marker.
    fn render_item(&mut self, item: &Item<D>) -> Self::Output;
}

/// Hand each descriptor to `renderer`, pairing outputs with their keys.
pub fn render<D, R>(
    descriptors: &[RenderDescriptor<D>],
    renderer: &mut R,
) -> Vec<(RenderKey, R::Output)>
where
    R: ClusterRenderer<D> + ?Sized,
{
    descriptors
        .iter()
        .map(|descriptor| {
            let output = match descriptor {
                RenderDescriptor::Cluster(cluster) => {
                    renderer.render_cluster(cluster, cluster.count)
                }
                RenderDescriptor::Point(item) => renderer.render_item(item),
            };
            (descriptor.key(), output)
        })
        .collect()
}

/// A [`ClusterRenderer`] built from two closures.
pub struct FnRenderer<C, I> {
    cluster: C,
    item: I,
}

impl<C, I> FnRenderer<C, I> {
    pub fn new(cluster: C, item: I) -> Self {
        Self { cluster, item }
    }
}

impl<D, O, C, I> ClusterRenderer<D> for FnRenderer<C, I>
where
    C: FnMut(&Cluster<D>, usize) -> O,
    I: FnMut(&Item<D>) -> O,
{
    type Output = O;

    fn render_cluster(&mut self, cluster: &Cluster<D>, count: usize) -> O {
        (self.cluster)(cluster, count)
    }

    fn render_item(&mut self, item: &Item<D>) -> O {
        (self.item)(item)
    }
}
