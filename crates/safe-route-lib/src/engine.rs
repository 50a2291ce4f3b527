//! RoutingEngine - Top-level entry point for safety-aware routing
//!
//! This module ties the pipeline together: waypoint generation, graph construction, incident
//! penalties and shortest-path selection. Structural failures inside the pipeline degrade to a
//! direct source-to-destination route instead of failing the request; only invalid input is
//! reported to the caller.

use crate::{
    GraphBuilder, NodeId, PenaltyModel, PenaltyReport, Result, RouteError, RouteGraph,
    ShortestPath, SpatialIndex, Waypoint, WaypointGenerator, shortest_path,
};
use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Configuration for the routing engine
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Number of intermediate waypoints between source and destination.
    /// Default: 8
    pub waypoint_count: usize,
    /// How many nodes ahead shortcut edges may reach beyond the next node.
    /// Default: 2
    pub skip_ahead: usize,
    /// Shortcuts longer than this multiple of the local primary step are dropped.
    /// Default: 2.5
    pub shortcut_ratio: f64,
    /// Incident search radius around edge sample points in kilometers.
    /// Default: 0.4
    pub radius_km: f64,
    /// Maximum incidents considered per sample point.
    /// Default: 50
    pub max_results: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            waypoint_count: 8,
            skip_ahead: 2,
            shortcut_ratio: 2.5,
            radius_km: 0.4,
            max_results: 50,
        }
    }
}

impl Config {
    pub fn waypoint_generator(&self) -> WaypointGenerator {
        WaypointGenerator::new(self.waypoint_count)
    }

    pub fn graph_builder(&self) -> GraphBuilder {
        GraphBuilder::new(self.skip_ahead, self.shortcut_ratio)
    }

    pub fn penalty_model(&self) -> PenaltyModel {
        PenaltyModel {
            radius_km: self.radius_km,
            max_results: self.max_results,
            ..PenaltyModel::default()
        }
    }
}

/// Fallback policy applied while computing a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Fallback {
    /// The waypoint graph could not be built; a two-node direct graph was used instead
    DirectGraph,
    /// No path reached the destination; the route goes straight from source to destination
    DirectRoute,
}

/// Result of a routing request
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RoutePlan {
    /// Coordinates along the chosen path, source first and destination last
    pub waypoints: Vec<Waypoint>,
    /// Graph node indices of the chosen path
    pub node_path: Vec<NodeId>,
    /// Geometric (unpenalized) length of the chosen path in meters
    pub distance_meters: f64,
    /// Penalized cost of the chosen path
    pub cost: f64,
    /// Number of graph edges that received an incident penalty
    pub penalized_edges: usize,
    /// Fallback policy that was applied, if any
    pub fallback: Option<Fallback>,
}

/// Safety-aware routing engine
///
/// Holds no per-request state, so a single engine can serve concurrent requests.
#[derive(Debug, Clone, Default)]
pub struct RoutingEngine {
    config: Config,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RoutingEngine {
    /// Create a new engine with the given configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compute a route using a freshly seeded random source for waypoint jitter
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidInput`] if either coordinate is invalid.
    pub fn compute_route(
        &self,
        index: &SpatialIndex,
        src: (f64, f64),
        dst: (f64, f64),
    ) -> Result<RoutePlan> {
        self.compute_route_with_rng(index, src, dst, &mut rand::thread_rng())
    }

    /// Compute a route drawing waypoint jitter from `rng`
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidInput`] if either coordinate is invalid.
    pub fn compute_route_with_rng<R: Rng>(
        &self,
        index: &SpatialIndex,
        src: (f64, f64),
        dst: (f64, f64),
        rng: &mut R,
    ) -> Result<RoutePlan> {
        #[cfg(feature = "profiling")]
        profiling::scope!("engine::compute_route");

        let (graph, graph_fallback, report) = self.build_graph(index, src, dst, rng)?;
        let (path, route_fallback) = self.solve_or_direct(&graph)?;

        let waypoints: Vec<Waypoint> = path
            .nodes
            .iter()
            .filter_map(|&node| graph.node(node).copied())
            .collect();
        let distance_meters = path_length_m(&graph, &path.nodes);

        tracing::debug!(
            "Route from ({}, {}) to ({}, {}): {} nodes, {:.0} m, cost {:.0}",
            src.0,
            src.1,
            dst.0,
            dst.1,
            path.nodes.len(),
            distance_meters,
            path.cost
        );

        Ok(RoutePlan {
            waypoints,
            node_path: path.nodes,
            distance_meters,
            cost: path.cost,
            penalized_edges: report.penalized,
            fallback: route_fallback.or(graph_fallback),
        })
    }

    /// Generate waypoints, build the graph and apply incident penalties
    ///
    /// # Errors
    /// Returns [`RouteError::InvalidInput`] if either coordinate is invalid.
    pub fn build_graph<R: Rng>(
        &self,
        index: &SpatialIndex,
        src: (f64, f64),
        dst: (f64, f64),
        rng: &mut R,
    ) -> Result<(RouteGraph, Option<Fallback>, PenaltyReport)> {
        let waypoints = self.config.waypoint_generator().generate(src, dst, rng)?;
        let (mut graph, fallback) =
            self.build_or_direct(waypoints, Waypoint::from(src), Waypoint::from(dst));
        let report = self.config.penalty_model().apply(&mut graph, Some(index));
        Ok((graph, fallback, report))
    }

    /// Build the waypoint graph, falling back to a two-node direct graph
    fn build_or_direct(
        &self,
        waypoints: Vec<Waypoint>,
        src: Waypoint,
        dst: Waypoint,
    ) -> (RouteGraph, Option<Fallback>) {
        match self.config.graph_builder().build(waypoints) {
            Ok(graph) => (graph, None),
            Err(e) => {
                tracing::warn!("Falling back to direct graph: {}", e);
                (RouteGraph::direct(src, dst), Some(Fallback::DirectGraph))
            }
        }
    }

    /// Find the cheapest path, falling back to the direct `[source, dest]` pair
    fn solve_or_direct(&self, graph: &RouteGraph) -> Result<(ShortestPath, Option<Fallback>)> {
        let (source, dest) = (graph.source(), graph.destination());
        match shortest_path(graph, source, dest) {
            Ok(path) => Ok((path, None)),
            Err(RouteError::NoRouteFound { from, to }) => {
                tracing::warn!("No route from node {} to {}, using direct route", from, to);
                let cost = graph
                    .edge_between(source, dest)
                    .map(|edge| edge.weight_m)
                    .unwrap_or_else(|| path_length_m(graph, &[source, dest]));
                Ok((
                    ShortestPath {
                        nodes: vec![source, dest],
                        cost,
                    },
                    Some(Fallback::DirectRoute),
                ))
            }
            Err(e) => Err(e),
        }
    }
}

/// Geometric length of a node path in meters
///
/// Consecutive nodes without a connecting edge contribute their great-circle distance.
fn path_length_m(graph: &RouteGraph, nodes: &[NodeId]) -> f64 {
    nodes
        .windows(2)
        .map(|pair| match graph.edge_between(pair[0], pair[1]) {
            Some(edge) => edge.length_m,
            None => match (graph.node(pair[0]), graph.node(pair[1])) {
                (Some(a), Some(b)) => a.distance_m(b),
                _ => 0.0,
            },
        })
        .sum()
}
