//! Route graph construction
//!
//! Nodes are waypoints indexed by their position in the generated sequence. Every edge points
//! from a lower to a higher node index, so the graph is a DAG by construction. Consecutive
//! waypoints are always joined by a primary edge; shortcut (secondary) edges skip ahead a few
//! nodes when doing so is not absurdly circuitous relative to the local step.

use crate::{Result, RouteError, Waypoint};
use smallvec::SmallVec;

/// Index of a node (waypoint) in a [`RouteGraph`]
pub type NodeId = usize;

/// Index of an edge in a [`RouteGraph`]
pub type EdgeId = usize;

/// Kind of edge in the route graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeKind {
    /// Connects sequentially adjacent waypoints
    Primary,
    /// Skips one or more intermediate waypoints
    Secondary,
}

/// A directed edge from a lower to a higher node index
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    /// Geometric haversine length in meters (never changes after construction)
    pub length_m: f64,
    /// Routing weight in meters (length scaled by any penalty, always >= `length_m`)
    pub weight_m: f64,
    pub kind: EdgeKind,
}

impl Edge {
    /// Create an unpenalized edge (weight equals length)
    pub fn new(from: NodeId, to: NodeId, length_m: f64, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            length_m,
            weight_m: length_m,
            kind,
        }
    }

    /// Multiplicative penalty currently applied to this edge
    #[inline]
    pub fn penalty_factor(&self) -> f64 {
        if self.length_m > 0.0 {
            self.weight_m / self.length_m
        } else {
            1.0
        }
    }
}

/// Index-based forward-only graph over waypoints
#[derive(Clone, Debug)]
pub struct RouteGraph {
    /// Waypoint coordinate of each node
    nodes: Vec<Waypoint>,
    /// All edges, primary edges first in node order
    edges: Vec<Edge>,
    /// Outgoing edge ids per node
    outgoing: Vec<SmallVec<[EdgeId; 4]>>,
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl RouteGraph {
    /// Assemble a graph from explicit nodes and edges
    ///
    /// # Errors
    /// - [`RouteError::InsufficientWaypoints`] for fewer than 2 nodes
    /// - [`RouteError::InvalidInput`] for edges that are out of range, point backwards,
    ///   or carry negative/non-finite weights
    pub fn from_parts(nodes: Vec<Waypoint>, edges: Vec<Edge>) -> Result<Self> {
        if nodes.len() < 2 {
            return Err(RouteError::InsufficientWaypoints { got: nodes.len() });
        }

        let mut outgoing = vec![SmallVec::new(); nodes.len()];
        for (id, edge) in edges.iter().enumerate() {
            if edge.to >= nodes.len() || edge.from >= edge.to {
                return Err(RouteError::InvalidInput(format!(
                    "edge {} -> {} does not go forward within {} nodes",
                    edge.from,
                    edge.to,
                    nodes.len()
                )));
            }
            if !(edge.length_m.is_finite() && edge.length_m >= 0.0)
                || !(edge.weight_m.is_finite() && edge.weight_m >= 0.0)
            {
                return Err(RouteError::InvalidInput(format!(
                    "edge {} -> {} has invalid weight {} (length {})",
                    edge.from, edge.to, edge.weight_m, edge.length_m
                )));
            }
            outgoing[edge.from].push(id);
        }

        Ok(Self {
            nodes,
            edges,
            outgoing,
        })
    }

    /// Two-node graph with a single primary edge from `src` to `dst`
    ///
    /// Used as the fallback when a full waypoint graph cannot be built.
    pub fn direct(src: Waypoint, dst: Waypoint) -> Self {
        let length_m = src.distance_m(&dst);
        let length_m = if length_m.is_finite() { length_m } else { 0.0 };
        let mut outgoing = vec![SmallVec::new(); 2];
        outgoing[0].push(0);
        Self {
            nodes: vec![src, dst],
            edges: vec![Edge::new(0, 1, length_m, EdgeKind::Primary)],
            outgoing,
        }
    }

    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Waypoint of a node
    #[inline]
    pub fn node(&self, id: NodeId) -> Option<&Waypoint> {
        self.nodes.get(id)
    }

    #[inline]
    pub fn nodes(&self) -> &[Waypoint] {
        &self.nodes
    }

    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Mutable access to edge weights; topology stays fixed
    #[inline]
    pub(crate) fn edges_mut(&mut self) -> &mut [Edge] {
        &mut self.edges
    }

    /// Source node (always 0)
    #[inline]
    pub fn source(&self) -> NodeId {
        0
    }

    /// Destination node (always the last node)
    #[inline]
    pub fn destination(&self) -> NodeId {
        self.nodes.len() - 1
    }

    /// Edges leaving a node
    pub fn outgoing(&self, node: NodeId) -> impl Iterator<Item = &Edge> + '_ {
        self.outgoing
            .get(node)
            .into_iter()
            .flat_map(|ids| ids.iter().map(|&id| &self.edges[id]))
    }

    /// The edge from `from` to `to`, if one exists
    pub fn edge_between(&self, from: NodeId, to: NodeId) -> Option<&Edge> {
        self.outgoing(from).find(|edge| edge.to == to)
    }

    /// Number of edges of the given kind
    pub fn count_kind(&self, kind: EdgeKind) -> usize {
        self.edges.iter().filter(|edge| edge.kind == kind).count()
    }
}

/// Builds a [`RouteGraph`] from a waypoint sequence
#[derive(Clone, Copy, Debug)]
pub struct GraphBuilder {
    /// How many nodes ahead a shortcut edge may reach beyond the next one
    pub skip_ahead: usize,
    /// A shortcut is kept only if shorter than this multiple of the local primary step
    pub shortcut_ratio: f64,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self {
            skip_ahead: 2,
            shortcut_ratio: 2.5,
        }
    }
}

#[cfg_attr(feature = "profiling", profiling::all_functions)]
impl GraphBuilder {
    pub fn new(skip_ahead: usize, shortcut_ratio: f64) -> Self {
        Self {
            skip_ahead,
            shortcut_ratio,
        }
    }

    /// Build nodes, primary edges and shortcut edges
    ///
    /// Shortcuts from node `i` go to every `j` in `i + 2 ..= min(i + skip_ahead + 1, N - 1)`
    /// whose haversine length is below `shortcut_ratio` times the primary edge `(i, i + 1)`.
    ///
    /// # Errors
    /// Returns [`RouteError::InsufficientWaypoints`] for fewer than 2 waypoints.
    pub fn build(&self, waypoints: Vec<Waypoint>) -> Result<RouteGraph> {
        let n = waypoints.len();
        if n < 2 {
            return Err(RouteError::InsufficientWaypoints { got: n });
        }
        if let Some(bad) = waypoints.iter().position(|w| !w.is_finite()) {
            return Err(RouteError::InvalidInput(format!(
                "waypoint {bad} has non-finite coordinates"
            )));
        }

        // Shortcut targets never reach past the last node
        let window = self.skip_ahead.min(n - 2);
        let mut edges = Vec::with_capacity(n.saturating_mul(window + 1));

        for i in 0..n - 1 {
            let length_m = waypoints[i].distance_m(&waypoints[i + 1]);
            edges.push(Edge::new(i, i + 1, length_m, EdgeKind::Primary));
        }

        for i in 0..n - 1 {
            let step_m = edges[i].length_m;
            let last = i.saturating_add(window).saturating_add(1).min(n - 1);
            for j in (i + 2)..=last {
                let length_m = waypoints[i].distance_m(&waypoints[j]);
                if length_m < self.shortcut_ratio * step_m {
                    edges.push(Edge::new(i, j, length_m, EdgeKind::Secondary));
                }
            }
        }

        tracing::debug!(
            "Built route graph with {} nodes and {} edges ({} shortcuts)",
            n,
            edges.len(),
            edges.len() - (n - 1)
        );

        RouteGraph::from_parts(waypoints, edges)
    }
}
