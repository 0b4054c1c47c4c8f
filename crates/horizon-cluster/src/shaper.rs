//! Cluster membership shaping.

use crate::algorithm::ClusterResult;
use crate::config::ClusterDataConfig;

/// Apply `config` to a raw algorithm result.
///
/// `count` is never touched. Leftover points pass through unchanged.
pub fn shape<D>(mut result: ClusterResult<D>, config: &ClusterDataConfig) -> ClusterResult<D> {
    for cluster in &mut result.clusters {
        if !config.include_items {
            cluster.items = None;
        } else if let (Some(items), Some(max)) = (&mut cluster.items, config.max_items_in_cluster) {
            items.truncate(max);
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::Cluster;
    use crate::geo::LatLng;
    use crate::registry::Item;

    fn raw() -> ClusterResult<u32> {
        let members: Vec<_> = (0..5)
            .map(|i| Item::new(format!("m{i}"), LatLng::new(1.0, f64::from(i)), i))
            .collect();
        let mut bare = Cluster::from_members("bare", LatLng::new(2.0, 2.0), &members[..2]).unwrap();
        bare.items = None;
        ClusterResult {
            clusters: vec![
                Cluster::from_members("c", LatLng::new(1.0, 2.0), &members).unwrap(),
                bare,
            ],
            points: vec![Item::new("p", LatLng::new(9.0, 9.0), 99)],
        }
    }

    #[test]
    fn test_exclude_items_keeps_counts() {
        let full = shape(raw(), &ClusterDataConfig::default());
        let stripped = shape(raw(), &ClusterDataConfig::counts_only());
        for (a, b) in full.clusters.iter().zip(&stripped.clusters) {
            assert_eq!(a.count, b.count);
            assert!(b.items.is_none());
        }
        assert_eq!(stripped.points, full.points);
    }

    #[test]
    fn test_max_items_truncates_in_order() {
        let shaped = shape(raw(), &ClusterDataConfig::with_max_items(3));
        let cluster = &shaped.clusters[0];
        assert_eq!(cluster.count, 5);
        let ids: Vec<_> = cluster
            .items
            .as_ref()
            .unwrap()
            .iter()
            .map(|item| item.id.as_str())
            .collect();
        assert_eq!(ids, vec!["m0", "m1", "m2"]);
        // Absent membership stays absent.
        assert!(shaped.clusters[1].items.is_none());
    }

    #[test]
    fn test_max_items_zero_is_present_but_empty() {
        let shaped = shape(raw(), &ClusterDataConfig::with_max_items(0));
        assert_eq!(shaped.clusters[0].items.as_deref(), Some(&[][..]));
        assert_eq!(shaped.clusters[0].count, 5);
    }

    #[test]
    fn test_unset_max_passes_through() {
        let shaped = shape(raw(), &ClusterDataConfig::default());
        assert_eq!(shaped, raw());
    }
}
