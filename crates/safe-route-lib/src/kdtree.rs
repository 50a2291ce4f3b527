//! KD-tree spatial index over incident points
//!
//! The tree is built once from a full incident collection and never mutated afterwards;
//! reloading data means building a new index. Nodes live in a flat arena and refer to
//! their children by index, splitting alternately on latitude and longitude.
//!
//! Pruning uses plain degree coordinates, but containment is always decided by the true
//! haversine distance so that degree distortion away from the equator never leaks into
//! query results.

use crate::{IncidentPoint, utils};
use smallvec::SmallVec;

/// Split axis of a tree node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Axis {
    Latitude,
    Longitude,
}

impl Axis {
    #[inline]
    fn for_depth(depth: usize) -> Self {
        if depth % 2 == 0 {
            Axis::Latitude
        } else {
            Axis::Longitude
        }
    }

    #[inline]
    fn key(self, point: &IncidentPoint) -> f64 {
        match self {
            Axis::Latitude => point.latitude,
            Axis::Longitude => point.longitude,
        }
    }
}

/// A single node in the arena
#[derive(Clone, Debug)]
struct KdNode {
    /// Index into `SpatialIndex::points`
    point: usize,
    /// Axis this node splits on
    axis: Axis,
    /// Subtree with keys <= this node's key
    left: Option<usize>,
    /// Subtree with keys >= this node's key
    right: Option<usize>,
}

/// An incident returned by a radius query together with its distance to the query center
#[derive(Clone, Copy, Debug)]
pub struct Nearby<'a> {
    pub incident: &'a IncidentPoint,
    pub distance_km: f64,
}

/// Immutable balanced KD-tree over incident points
///
/// An index built from no valid points is a normal, queryable value: every query on it
/// simply returns no results.
#[derive(Clone, Debug, Default)]
pub struct SpatialIndex {
    /// Owned copy of every accepted incident
    points: Vec<IncidentPoint>,
    /// Node arena
    nodes: Vec<KdNode>,
    /// Root node (None when empty)
    root: Option<usize>,
    /// Number of malformed points rejected at build time
    dropped: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl SpatialIndex {
    /// Create an index with no points
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a balanced tree over the given points
    ///
    /// Points with non-finite or out-of-range coordinates are dropped rather than inserted.
    pub fn build(points: Vec<IncidentPoint>) -> Self {
        #[cfg(feature = "profiling")]
        profiling::scope!("kdtree::build");

        let total = points.len();
        let points: Vec<IncidentPoint> = points.into_iter().filter(|p| p.is_valid()).collect();
        let dropped = total - points.len();
        if dropped > 0 {
            tracing::warn!("Dropped {} malformed incident points out of {}", dropped, total);
        }

        if points.is_empty() {
            tracing::debug!("Built empty incident index");
            return Self {
                dropped,
                ..Self::default()
            };
        }

        let mut order: Vec<usize> = (0..points.len()).collect();
        let mut nodes = Vec::with_capacity(points.len());
        let root = build_subtree(&points, &mut order, 0, &mut nodes);

        tracing::debug!("Built incident index with {} points", points.len());

        Self {
            points,
            nodes,
            root,
            dropped,
        }
    }

    /// Number of indexed points
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index holds no points
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Number of malformed points rejected at build time
    #[inline]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// All indexed points, in no particular order
    #[inline]
    pub fn points(&self) -> &[IncidentPoint] {
        &self.points
    }

    /// Height of the tree (0 when empty)
    pub fn depth(&self) -> usize {
        fn height(nodes: &[KdNode], node: Option<usize>) -> usize {
            match node {
                Some(i) => 1 + height(nodes, nodes[i].left).max(height(nodes, nodes[i].right)),
                None => 0,
            }
        }
        height(&self.nodes, self.root)
    }

    /// Find all points within `radius_km` (great-circle) of `center`
    ///
    /// Results are sorted by ascending distance, ties broken by incident id, and capped at
    /// `max_results`. An invalid center or radius yields no results.
    pub fn query_radius(
        &self,
        center: (f64, f64),
        radius_km: f64,
        max_results: usize,
    ) -> Vec<Nearby<'_>> {
        let Some(root) = self.root else {
            return Vec::new();
        };
        let (lat, lon) = center;
        if !utils::is_valid_coordinate(lat, lon)
            || !radius_km.is_finite()
            || radius_km < 0.0
            || max_results == 0
        {
            tracing::debug!(
                "Ignoring radius query at ({}, {}) with radius {} km",
                lat,
                lon,
                radius_km
            );
            return Vec::new();
        }

        let (delta_lat, delta_lon) = utils::bounding_deltas(lat, radius_km);
        let lat_range = (lat - delta_lat, lat + delta_lat);
        // Longitude pruning is skipped when the box wraps the antimeridian or covers a pole
        let lon_range = delta_lon
            .map(|d| (lon - d, lon + d))
            .filter(|(lo, hi)| *lo >= -utils::MAX_LONGITUDE && *hi <= utils::MAX_LONGITUDE);

        let mut found: Vec<Nearby<'_>> = Vec::new();
        let mut stack: SmallVec<[usize; 32]> = SmallVec::new();
        stack.push(root);

        while let Some(node_index) = stack.pop() {
            let node = &self.nodes[node_index];
            let point = &self.points[node.point];

            let in_lat = point.latitude >= lat_range.0 && point.latitude <= lat_range.1;
            let in_lon = lon_range
                .map(|(lo, hi)| point.longitude >= lo && point.longitude <= hi)
                .unwrap_or(true);
            if in_lat && in_lon {
                let distance_km = point.distance_km_to(lat, lon);
                if distance_km <= radius_km {
                    found.push(Nearby {
                        incident: point,
                        distance_km,
                    });
                }
            }

            let key = node.axis.key(point);
            let range = match node.axis {
                Axis::Latitude => Some(lat_range),
                Axis::Longitude => lon_range,
            };
            let (visit_left, visit_right) = match range {
                Some((lo, hi)) => (lo <= key, hi >= key),
                None => (true, true),
            };
            if visit_left && let Some(left) = node.left {
                stack.push(left);
            }
            if visit_right && let Some(right) = node.right {
                stack.push(right);
            }
        }

        found.sort_by(|a, b| {
            a.distance_km
                .total_cmp(&b.distance_km)
                .then(a.incident.id.cmp(&b.incident.id))
        });
        found.truncate(max_results);
        found
    }
}

/// Recursively build a subtree over `order`, splitting at the median of the depth's axis
fn build_subtree(
    points: &[IncidentPoint],
    order: &mut [usize],
    depth: usize,
    nodes: &mut Vec<KdNode>,
) -> Option<usize> {
    if order.is_empty() {
        return None;
    }

    let axis = Axis::for_depth(depth);
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| {
        axis.key(&points[a]).total_cmp(&axis.key(&points[b]))
    });

    let node_index = nodes.len();
    nodes.push(KdNode {
        point: order[mid],
        axis,
        left: None,
        right: None,
    });

    let (left_half, rest) = order.split_at_mut(mid);
    let right_half = &mut rest[1..];
    let left = build_subtree(points, left_half, depth + 1, nodes);
    let right = build_subtree(points, right_half, depth + 1, nodes);
    nodes[node_index].left = left;
    nodes[node_index].right = right;

    Some(node_index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_points(count: usize, seed: u64) -> Vec<IncidentPoint> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                IncidentPoint::new(
                    i as i64,
                    12.7 + rng.gen_range(0.0..0.5),
                    80.0 + rng.gen_range(0.0..0.3),
                )
            })
            .collect()
    }

    fn brute_force(points: &[IncidentPoint], center: (f64, f64), radius_km: f64) -> Vec<i64> {
        let mut ids: Vec<(f64, i64)> = points
            .iter()
            .map(|p| (p.distance_km_to(center.0, center.1), p.id))
            .filter(|(d, _)| *d <= radius_km)
            .collect();
        ids.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        ids.into_iter().map(|(_, id)| id).collect()
    }

    #[test]
    fn test_empty_index() {
        let index = SpatialIndex::build(Vec::new());
        assert!(index.is_empty());
        assert_eq!(index.depth(), 0);
        assert!(index.query_radius((13.0, 80.2), 1.0, 50).is_empty());
    }

    #[test]
    fn test_malformed_points_dropped() {
        let index = SpatialIndex::build(vec![
            IncidentPoint::new(1, 13.0, 80.2),
            IncidentPoint::new(2, f64::NAN, 80.2),
            IncidentPoint::new(3, 13.0, 200.0),
            IncidentPoint::new(4, -95.0, 0.0),
        ]);
        assert_eq!(index.len(), 1);
        assert_eq!(index.dropped(), 3);

        let hits = index.query_radius((13.0, 80.2), 0.1, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].incident.id, 1);
    }

    #[test]
    fn test_all_malformed_yields_empty_index() {
        let index = SpatialIndex::build(vec![IncidentPoint::new(1, f64::INFINITY, 0.0)]);
        assert!(index.is_empty());
        assert!(index.query_radius((0.0, 0.0), 100.0, 10).is_empty());
    }

    #[test]
    fn test_tree_is_balanced() {
        let index = SpatialIndex::build(random_points(1000, 1));
        assert_eq!(index.len(), 1000);
        // ceil(log2(1001)) = 10
        assert!(index.depth() <= 10, "depth {} too large", index.depth());
    }

    #[test]
    fn test_query_matches_brute_force() {
        let points = random_points(500, 42);
        let index = SpatialIndex::build(points.clone());

        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let center = (12.7 + rng.gen_range(0.0..0.5), 80.0 + rng.gen_range(0.0..0.3));
            let radius = rng.gen_range(0.1..5.0);

            let got: Vec<i64> = index
                .query_radius(center, radius, usize::MAX)
                .iter()
                .map(|n| n.incident.id)
                .collect();
            assert_eq!(got, brute_force(&points, center, radius));
        }
    }

    #[test]
    fn test_results_sorted_and_capped() {
        let points: Vec<IncidentPoint> = (0..10)
            .map(|i| IncidentPoint::new(i, 13.0 + i as f64 * 0.001, 80.2))
            .collect();
        let index = SpatialIndex::build(points);

        let hits = index.query_radius((13.0, 80.2), 5.0, 3);
        assert_eq!(hits.len(), 3);
        let ids: Vec<i64> = hits.iter().map(|n| n.incident.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
        assert!(hits.windows(2).all(|w| w[0].distance_km <= w[1].distance_km));
    }

    #[test]
    fn test_high_latitude_uses_true_distance() {
        // At 70°N one degree of longitude is only ~38 km
        let index = SpatialIndex::build(vec![
            IncidentPoint::new(1, 70.0, 25.3), // ~11 km east
            IncidentPoint::new(2, 70.0, 25.7), // ~26 km east
            IncidentPoint::new(3, 70.15, 25.0), // ~17 km north
        ]);

        let ids: Vec<i64> = index
            .query_radius((70.0, 25.0), 20.0, 10)
            .iter()
            .map(|n| n.incident.id)
            .collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_query_across_antimeridian() {
        let index = SpatialIndex::build(vec![
            IncidentPoint::new(1, 0.0, -179.999),
            IncidentPoint::new(2, 0.0, 170.0),
        ]);
        let hits = index.query_radius((0.0, 179.999), 1.0, 10);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].incident.id, 1);
    }

    #[test]
    fn test_invalid_query_returns_nothing() {
        let index = SpatialIndex::build(random_points(20, 3));
        assert!(index.query_radius((f64::NAN, 80.0), 1.0, 10).is_empty());
        assert!(index.query_radius((13.0, 80.0), -1.0, 10).is_empty());
        assert!(index.query_radius((13.0, 80.0), 100.0, 0).is_empty());
    }

    #[test]
    fn test_duplicate_points_all_found() {
        let points: Vec<IncidentPoint> = (0..9).map(|i| IncidentPoint::new(i, 13.0, 80.2)).collect();
        let index = SpatialIndex::build(points);
        assert_eq!(index.query_radius((13.0, 80.2), 0.01, 50).len(), 9);
    }
}
