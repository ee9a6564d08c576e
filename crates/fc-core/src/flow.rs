//! Dataflow queries over a canvas snapshot.
//!
//! The canvas itself allows cycles; hosts that execute a flow use these to
//! order nodes or to find everything feeding a node.

use crate::id::NodeId;
use crate::state::CanvasState;
use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use petgraph::visit::{Dfs, Reversed};

fn build_graph(state: &CanvasState) -> DiGraphMap<NodeId, ()> {
    let mut graph = DiGraphMap::new();
    for node in &state.nodes {
        graph.add_node(node.id);
    }
    for edge in &state.edges {
        // Orphaned edges (endpoint node missing) are ignored.
        if graph.contains_node(edge.source.node_id) && graph.contains_node(edge.target.node_id) {
            graph.add_edge(edge.source.node_id, edge.target.node_id, ());
        }
    }
    graph
}

/// Topological order of all nodes (producers before consumers).
///
/// # Errors
/// Returns the id of a node that sits on a cycle.
pub fn execution_order(state: &CanvasState) -> Result<Vec<NodeId>, NodeId> {
    let graph = build_graph(state);
    toposort(&graph, None).map_err(|cycle| cycle.node_id())
}

/// Every node that transitively feeds `node` (excluding `node` itself).
pub fn upstream_of(state: &CanvasState, node: NodeId) -> Vec<NodeId> {
    let graph = build_graph(state);
    if !graph.contains_node(node) {
        return Vec::new();
    }
    let reversed = Reversed(&graph);
    let mut dfs = Dfs::new(reversed, node);
    let mut out = Vec::new();
    while let Some(n) = dfs.next(reversed) {
        if n != node {
            out.push(n);
        }
    }
    out
}
