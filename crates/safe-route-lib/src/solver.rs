//! Shortest-path search over a route graph
//!
//! Classic Dijkstra with a binary min-heap. Edge weights are non-negative by construction
//! (penalties only scale weights up). Among equal-cost paths, each node is reached through
//! its lowest-index predecessor so results are reproducible.

use crate::{NodeId, Result, RouteError, RouteGraph};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Result of a shortest-path search
#[derive(Clone, Debug, PartialEq)]
pub struct ShortestPath {
    /// Node indices from source to destination inclusive
    pub nodes: Vec<NodeId>,
    /// Sum of edge weights along the path
    pub cost: f64,
}

/// Heap entry ordered so that `BinaryHeap` pops the smallest cost first,
/// then the smallest node index
#[derive(Clone, Copy, Debug)]
struct QueueEntry {
    cost: f64,
    node: NodeId,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Find the minimum-weight path from `source` to `dest`
///
/// # Errors
/// - [`RouteError::InvalidInput`] if either node is out of range
/// - [`RouteError::NoRouteFound`] if `dest` is unreachable from `source`
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn shortest_path(graph: &RouteGraph, source: NodeId, dest: NodeId) -> Result<ShortestPath> {
    let n = graph.node_count();
    if source >= n || dest >= n {
        return Err(RouteError::InvalidInput(format!(
            "nodes {source} -> {dest} out of range for graph with {n} nodes"
        )));
    }
    if source == dest {
        return Ok(ShortestPath {
            nodes: vec![source],
            cost: 0.0,
        });
    }

    let mut dist = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<NodeId>> = vec![None; n];
    let mut settled = vec![false; n];
    let mut heap = BinaryHeap::new();

    dist[source] = 0.0;
    heap.push(QueueEntry {
        cost: 0.0,
        node: source,
    });

    while let Some(QueueEntry { cost, node }) = heap.pop() {
        if settled[node] {
            continue;
        }
        settled[node] = true;
        if node == dest {
            break;
        }

        for edge in graph.outgoing(node) {
            debug_assert!(edge.weight_m >= 0.0, "negative edge weight");
            let next = edge.to;
            let candidate = cost + edge.weight_m;

            let better = candidate < dist[next];
            // Equal cost through a lower-index predecessor wins the tie
            let tie_break = candidate == dist[next] && prev[next].is_some_and(|p| node < p);
            if better || tie_break {
                dist[next] = candidate;
                prev[next] = Some(node);
                if better {
                    heap.push(QueueEntry {
                        cost: candidate,
                        node: next,
                    });
                }
            }
        }
    }

    if !dist[dest].is_finite() {
        return Err(RouteError::NoRouteFound {
            from: source,
            to: dest,
        });
    }

    let mut nodes = vec![dest];
    let mut current = dest;
    while let Some(p) = prev[current] {
        nodes.push(p);
        current = p;
    }
    nodes.reverse();

    Ok(ShortestPath {
        nodes,
        cost: dist[dest],
    })
}
