//! Incident-proximity penalty model
//!
//! Each edge is sampled at a few interior points. A sample within the search radius of an
//! incident gets a penalty that ramps linearly from `base_penalty` at the radius boundary to
//! `base_penalty + ramp_penalty` directly on top of the incident. The edge takes the worst
//! sample, so one dangerous stretch dominates the whole edge.

use crate::{Result, RouteError, RouteGraph, SpatialIndex, Waypoint, utils};
use rayon::prelude::*;

/// Interpolation parameters of the sample points along an edge
const SAMPLE_POSITIONS: [f64; 3] = [0.25, 0.5, 0.75];

/// Parameters of the proximity penalty
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PenaltyModel {
    /// Search radius around each sample point in kilometers
    pub radius_km: f64,
    /// Maximum incidents considered per sample point
    pub max_results: usize,
    /// Penalty factor at the radius boundary
    pub base_penalty: f64,
    /// Additional penalty reached at zero distance
    pub ramp_penalty: f64,
}

impl Default for PenaltyModel {
    fn default() -> Self {
        Self {
            radius_km: 0.4,
            max_results: 50,
            base_penalty: 2.0,
            ramp_penalty: 3.0,
        }
    }
}

/// Summary of a penalty pass over a graph
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PenaltyReport {
    /// Edges whose weight was scaled up
    pub penalized: usize,
    /// Edges left untouched because evaluating them failed
    pub skipped: usize,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl PenaltyModel {
    /// Penalty factor for a single point at `distance_km` from its nearest incident
    ///
    /// Returns 1.0 (no penalty) at or beyond the radius.
    #[inline]
    pub fn point_penalty(&self, distance_km: f64) -> f64 {
        if distance_km < self.radius_km {
            self.base_penalty + (self.radius_km - distance_km) / self.radius_km * self.ramp_penalty
        } else {
            1.0
        }
    }

    /// Penalty factor for the edge between two waypoints (always >= 1.0)
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidInput`] if a sample point is not a valid coordinate or the
    /// resulting factor is not finite.
    pub fn edge_penalty(&self, from: &Waypoint, to: &Waypoint, index: &SpatialIndex) -> Result<f64> {
        let mut worst: f64 = 1.0;

        for t in SAMPLE_POSITIONS {
            let (lat, lon) = utils::lerp(from.coordinates(), to.coordinates(), t);
            if !utils::is_valid_coordinate(lat, lon) {
                return Err(RouteError::InvalidInput(format!(
                    "sample point ({lat}, {lon}) is not a valid coordinate"
                )));
            }

            let nearest = index
                .query_radius((lat, lon), self.radius_km, self.max_results)
                .iter()
                .map(|n| n.distance_km)
                .min_by(f64::total_cmp);

            if let Some(distance_km) = nearest {
                worst = worst.max(self.point_penalty(distance_km));
            }
        }

        if !worst.is_finite() {
            return Err(RouteError::InvalidInput(format!(
                "penalty factor {worst} is not finite"
            )));
        }
        // Weights may only grow, which keeps them non-negative for the shortest-path search
        Ok(worst.max(1.0))
    }

    /// Rescale every edge weight of `graph` by its incident-proximity penalty
    ///
    /// Node set and edge topology are left unchanged; a weight is always recomputed from the
    /// edge's geometric length, so applying the model twice does not compound. An absent or
    /// empty index leaves every weight as it is. Edges that fail to evaluate are skipped with
    /// their current weight retained.
    pub fn apply(&self, graph: &mut RouteGraph, index: Option<&SpatialIndex>) -> PenaltyReport {
        #[cfg(feature = "profiling")]
        profiling::scope!("penalty::apply");

        let Some(index) = index.filter(|index| !index.is_empty()) else {
            tracing::debug!("No incident data, skipping penalties");
            return PenaltyReport::default();
        };

        let factors: Vec<Result<f64>> = graph
            .edges()
            .par_iter()
            .map(|edge| {
                let from = graph.node(edge.from);
                let to = graph.node(edge.to);
                match (from, to) {
                    (Some(from), Some(to)) => self.edge_penalty(from, to, index),
                    _ => Err(RouteError::InvalidInput(format!(
                        "edge {} -> {} references a missing node",
                        edge.from, edge.to
                    ))),
                }
            })
            .collect();

        let mut report = PenaltyReport::default();
        for (edge, factor) in graph.edges_mut().iter_mut().zip(factors) {
            match factor {
                Ok(factor) if factor > 1.0 => {
                    edge.weight_m = edge.length_m * factor;
                    report.penalized += 1;
                }
                Ok(_) => edge.weight_m = edge.length_m,
                Err(e) => {
                    tracing::warn!("Skipping penalty for edge {}-{}: {}", edge.from, edge.to, e);
                    report.skipped += 1;
                }
            }
        }

        tracing::debug!(
            "Applied penalties to {} of {} edges ({} skipped)",
            report.penalized,
            graph.edge_count(),
            report.skipped
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Edge, EdgeKind, GraphBuilder, IncidentPoint};

    fn line_graph() -> RouteGraph {
        let waypoints: Vec<Waypoint> = (0..5)
            .map(|i| Waypoint::new(13.0 + i as f64 * 0.01, 80.2))
            .collect();
        GraphBuilder::default().build(waypoints).unwrap()
    }

    fn weights(graph: &RouteGraph) -> Vec<f64> {
        graph.edges().iter().map(|e| e.weight_m).collect()
    }

    #[test]
    fn test_point_penalty_ramp() {
        let model = PenaltyModel::default();
        assert!((model.point_penalty(0.0) - 5.0).abs() < 1e-12);
        assert!((model.point_penalty(0.2) - 3.5).abs() < 1e-12);
        assert!((model.point_penalty(0.4) - 1.0).abs() < 1e-12);
        assert!((model.point_penalty(1.0) - 1.0).abs() < 1e-12);
        // Just inside the boundary the penalty starts at 2.0
        assert!((model.point_penalty(0.399_999) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn test_absent_or_empty_index_is_noop() {
        let model = PenaltyModel::default();
        let mut graph = line_graph();
        let before = weights(&graph);

        assert_eq!(model.apply(&mut graph, None), PenaltyReport::default());
        assert_eq!(weights(&graph), before);

        let empty = SpatialIndex::empty();
        assert_eq!(model.apply(&mut graph, Some(&empty)), PenaltyReport::default());
        assert_eq!(weights(&graph), before);
    }

    #[test]
    fn test_incident_on_edge_penalized() {
        let model = PenaltyModel::default();
        let mut graph = line_graph();
        // Midpoint of the primary edge 1 -> 2
        let index = SpatialIndex::build(vec![IncidentPoint::new(1, 13.015, 80.2)]);

        let report = model.apply(&mut graph, Some(&index));
        assert!(report.penalized >= 1);

        let edge = graph.edge_between(1, 2).unwrap();
        assert!(edge.weight_m >= 2.0 * edge.length_m);
        assert!((edge.penalty_factor() - 5.0).abs() < 1e-6);

        // Edges whose samples all stay farther than the radius are unchanged
        let far = graph.edge_between(3, 4).unwrap();
        assert!((far.weight_m - far.length_m).abs() < f64::EPSILON);
    }

    #[test]
    fn test_far_incidents_leave_weights_unchanged() {
        let model = PenaltyModel::default();
        let mut graph = line_graph();
        let before = weights(&graph);
        let index = SpatialIndex::build(vec![
            IncidentPoint::new(1, 13.02, 80.3),
            IncidentPoint::new(2, 12.9, 80.2),
        ]);

        let report = model.apply(&mut graph, Some(&index));
        assert_eq!(report.penalized, 0);
        assert_eq!(weights(&graph), before);
    }

    #[test]
    fn test_apply_twice_does_not_compound() {
        let model = PenaltyModel::default();
        let mut graph = line_graph();
        let index = SpatialIndex::build(vec![IncidentPoint::new(1, 13.015, 80.2)]);

        model.apply(&mut graph, Some(&index));
        let once = weights(&graph);
        model.apply(&mut graph, Some(&index));
        assert_eq!(weights(&graph), once);
    }

    #[test]
    fn test_bad_edge_skipped_others_processed() {
        let model = PenaltyModel::default();
        // Node 2 carries a corrupted coordinate so samples on edges touching it are invalid
        let nodes = vec![
            Waypoint::new(13.0, 80.2),
            Waypoint::new(13.01, 80.2),
            Waypoint::new(f64::NAN, 80.2),
        ];
        let edges = vec![
            Edge::new(0, 1, 1000.0, EdgeKind::Primary),
            Edge::new(1, 2, 1000.0, EdgeKind::Primary),
        ];
        let mut graph = RouteGraph::from_parts(nodes, edges).unwrap();
        let index = SpatialIndex::build(vec![IncidentPoint::new(1, 13.005, 80.2)]);

        let report = model.apply(&mut graph, Some(&index));
        assert_eq!(report.skipped, 1);
        assert_eq!(report.penalized, 1);
        assert!(graph.edge_between(0, 1).unwrap().weight_m > 1000.0);
        assert!((graph.edge_between(1, 2).unwrap().weight_m - 1000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_topology_unchanged() {
        let model = PenaltyModel::default();
        let mut graph = line_graph();
        let before: Vec<(usize, usize, EdgeKind)> =
            graph.edges().iter().map(|e| (e.from, e.to, e.kind)).collect();
        let index = SpatialIndex::build(vec![IncidentPoint::new(1, 13.02, 80.2)]);

        model.apply(&mut graph, Some(&index));
        let after: Vec<(usize, usize, EdgeKind)> =
            graph.edges().iter().map(|e| (e.from, e.to, e.kind)).collect();
        assert_eq!(before, after);
        assert_eq!(graph.node_count(), 5);
    }
}
