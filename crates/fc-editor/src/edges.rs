//! Edge Store: the ordered collection of connections.
//!
//! Same copy-on-write scheme as the node store. Insertion order matters:
//! the most recently added edge at a multi-input is the one a drag detaches.

use fc_core::id::{EdgeId, NodeId, PortId};
use fc_core::model::Edge;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct EdgeStore {
    edges: Arc<Vec<Edge>>,
    generation: u64,
}

impl EdgeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }

    pub fn snapshot(&self) -> Arc<Vec<Edge>> {
        Arc::clone(&self.edges)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    pub fn get(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Whether an edge already links exactly these two ports.
    pub fn is_duplicate(
        &self,
        source_node: NodeId,
        source_port: PortId,
        target_node: NodeId,
        target_port: PortId,
    ) -> bool {
        self.edges.iter().any(|e| {
            e.source.node_id == source_node
                && e.source.port_id == source_port
                && e.target.node_id == target_node
                && e.target.port_id == target_port
        })
    }

    /// Edges arriving at an input port, oldest first.
    pub fn incoming(&self, node_id: NodeId, port_id: PortId) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.ends_at(node_id, port_id))
    }

    /// The most recently added edge at an input port.
    pub fn latest_incoming(&self, node_id: NodeId, port_id: PortId) -> Option<&Edge> {
        self.incoming(node_id, port_id).last()
    }

    pub fn touching(&self, node_id: NodeId) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.touches(node_id))
            .cloned()
            .collect()
    }

    // ─── Mutations ───────────────────────────────────────────────────────

    fn commit(&mut self) {
        self.generation += 1;
    }

    /// Append an edge. Returns `false` if the id is already present.
    pub fn add(&mut self, edge: Edge) -> bool {
        if self.get(edge.id).is_some() {
            return false;
        }
        Arc::make_mut(&mut self.edges).push(edge);
        self.commit();
        true
    }

    pub fn remove(&mut self, id: EdgeId) -> Option<Edge> {
        let idx = self.edges.iter().position(|e| e.id == id)?;
        let edge = Arc::make_mut(&mut self.edges).remove(idx);
        self.commit();
        Some(edge)
    }

    /// Remove every edge matching `pred`, returning them in store order.
    pub fn remove_where(&mut self, pred: impl Fn(&Edge) -> bool) -> Vec<Edge> {
        if !self.edges.iter().any(&pred) {
            return Vec::new();
        }
        let (removed, kept): (Vec<Edge>, Vec<Edge>) =
            self.edges.iter().cloned().partition(|e| pred(e));
        self.edges = Arc::new(kept);
        self.commit();
        removed
    }

    /// Remove every edge touching `node_id`.
    pub fn remove_all_for_node(&mut self, node_id: NodeId) -> Vec<Edge> {
        self.remove_where(|e| e.touches(node_id))
    }

    /// Remove whatever arrives at the new edge's target input, then add it.
    /// Returns the displaced edges.
    pub fn replace_input_edge(&mut self, edge: Edge) -> Vec<Edge> {
        let (node, port) = (edge.target.node_id, edge.target.port_id);
        let removed = self.remove_where(|e| e.ends_at(node, port));
        self.add(edge);
        removed
    }

    pub fn replace_all(&mut self, edges: Vec<Edge>) {
        self.edges = Arc::new(edges);
        self.commit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::model::{Endpoint, PortDirection};
    use pretty_assertions::assert_eq;

    fn edge(id: &str, from: (&str, &str), to: (&str, &str)) -> Edge {
        Edge {
            id: EdgeId::intern(id),
            source: Endpoint::new(NodeId::intern(from.0), PortId::intern(from.1), PortDirection::Output),
            target: Endpoint::new(NodeId::intern(to.0), PortId::intern(to.1), PortDirection::Input),
        }
    }

    fn ids(edges: &[Edge]) -> Vec<&str> {
        edges.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn duplicate_detection_matches_all_four_fields() {
        let mut store = EdgeStore::new();
        store.add(edge("e1", ("a", "out"), ("b", "in")));
        let (a, b, out, inp) = (
            NodeId::intern("a"),
            NodeId::intern("b"),
            PortId::intern("out"),
            PortId::intern("in"),
        );
        assert!(store.is_duplicate(a, out, b, inp));
        assert!(!store.is_duplicate(a, out, b, PortId::intern("other")));
        assert!(!store.is_duplicate(b, out, a, inp));
    }

    #[test]
    fn remove_all_for_node_returns_removed() {
        let mut store = EdgeStore::new();
        store.add(edge("e1", ("a", "out"), ("b", "in")));
        store.add(edge("e2", ("b", "out"), ("c", "in")));
        store.add(edge("e3", ("x", "out"), ("y", "in")));
        let removed = store.remove_all_for_node(NodeId::intern("b"));
        assert_eq!(ids(&removed), vec!["e1", "e2"]);
        assert_eq!(ids(store.as_slice()), vec!["e3"]);
    }

    #[test]
    fn replace_input_edge_displaces_existing() {
        let mut store = EdgeStore::new();
        store.add(edge("old", ("a", "out"), ("b", "in")));
        store.add(edge("other", ("a", "out"), ("b", "aux")));
        let removed = store.replace_input_edge(edge("new", ("c", "out"), ("b", "in")));
        assert_eq!(ids(&removed), vec!["old"]);
        assert_eq!(ids(store.as_slice()), vec!["other", "new"]);
    }

    #[test]
    fn latest_incoming_is_most_recent() {
        let mut store = EdgeStore::new();
        store.add(edge("first", ("a", "out"), ("m", "in")));
        store.add(edge("second", ("b", "out"), ("m", "in")));
        let latest = store.latest_incoming(NodeId::intern("m"), PortId::intern("in"));
        assert_eq!(latest.map(|e| e.id.as_str()), Some("second"));
    }

    #[test]
    fn noop_removals_keep_the_snapshot() {
        let mut store = EdgeStore::new();
        store.add(edge("e1", ("a", "out"), ("b", "in")));
        let before = store.snapshot();
        assert!(store.remove_all_for_node(NodeId::intern("zzz")).is_empty());
        assert!(store.remove(EdgeId::intern("zzz")).is_none());
        assert!(Arc::ptr_eq(&before, &store.snapshot()));
    }
}
