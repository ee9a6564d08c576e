//! Node Store: the ordered collection of placed nodes.
//!
//! The collection is an `Arc<Vec<Node>>` replaced through `Arc::make_mut`, so
//! a snapshot taken with [`NodeStore::snapshot`] never observes a later
//! mutation. `generation` increments on every committed change; no-op edits
//! leave both the collection and the generation untouched.

use fc_core::geometry::Point;
use fc_core::id::{NodeId, SpecId};
use fc_core::model::{Edge, Node, NodeSpec, ParamSpec, ParamValue};
use std::sync::Arc;

/// The single most recent deletion, kept for one-level undo.
#[derive(Debug, Clone, PartialEq)]
pub struct DeletedNode {
    pub node: Node,
    /// Edges that were connected to the node when it was deleted.
    pub edges: Vec<Edge>,
}

#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    nodes: Arc<Vec<Node>>,
    generation: u64,
    last_deleted: Option<DeletedNode>,
    clipboard: Option<Node>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Queries ─────────────────────────────────────────────────────────

    pub fn as_slice(&self) -> &[Node] {
        &self.nodes
    }

    /// Cheap handle to the current collection. Stays unchanged forever.
    pub fn snapshot(&self) -> Arc<Vec<Node>> {
        Arc::clone(&self.nodes)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    pub fn last_deleted(&self) -> Option<&DeletedNode> {
        self.last_deleted.as_ref()
    }

    pub fn clipboard(&self) -> Option<&Node> {
        self.clipboard.as_ref()
    }

    /// A fresh `{spec}-{timestamp}` id not used by any current node.
    pub fn unique_id(&self, spec: SpecId, timestamp_ms: u64) -> NodeId {
        let mut attempt = 0;
        loop {
            let id = NodeId::timestamped(spec, timestamp_ms, attempt);
            if !self.contains(id) {
                return id;
            }
            attempt += 1;
        }
    }

    // ─── Collection mutations ────────────────────────────────────────────

    fn commit(&mut self) {
        self.generation += 1;
    }

    fn index_of(&self, id: NodeId) -> Option<usize> {
        self.nodes.iter().position(|n| n.id == id)
    }

    /// Edit one node. The closure works on a copy and returns whether it
    /// changed anything; unchanged edits are discarded.
    fn update(&mut self, id: NodeId, edit: impl FnOnce(&mut Node) -> bool) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let mut node = self.nodes[idx].clone();
        if !edit(&mut node) {
            return false;
        }
        Arc::make_mut(&mut self.nodes)[idx] = node;
        self.commit();
        true
    }

    /// Append a node. Returns `false` if a node with the same id exists.
    /// A stashed deletion of the same id is dropped: it can no longer be
    /// restored.
    pub fn add(&mut self, node: Node) -> bool {
        if self.contains(node.id) {
            return false;
        }
        if self.last_deleted.as_ref().is_some_and(|d| d.node.id == node.id) {
            self.last_deleted = None;
        }
        Arc::make_mut(&mut self.nodes).push(node);
        self.commit();
        true
    }

    /// Remove a node without touching the undo stash.
    pub fn remove(&mut self, id: NodeId) -> Option<Node> {
        let idx = self.index_of(id)?;
        let node = Arc::make_mut(&mut self.nodes).remove(idx);
        self.commit();
        Some(node)
    }

    /// Remove a node and stash it with its edges as the most recent
    /// deletion, replacing any previous stash.
    pub fn delete(&mut self, id: NodeId, connected_edges: Vec<Edge>) -> Option<Node> {
        let node = self.remove(id)?;
        self.last_deleted = Some(DeletedNode {
            node: node.clone(),
            edges: connected_edges,
        });
        Some(node)
    }

    /// Restore the stashed node and hand back the stash so the caller can
    /// restore its edges. Returns `None` when nothing was deleted or the
    /// id is already back in the store.
    pub fn undo_last_delete(&mut self) -> Option<DeletedNode> {
        let stash = self.last_deleted.take()?;
        self.add(stash.node.clone()).then_some(stash)
    }

    pub fn replace_all(&mut self, nodes: Vec<Node>) {
        self.nodes = Arc::new(nodes);
        self.last_deleted = None;
        self.commit();
    }

    // ─── Clipboard ───────────────────────────────────────────────────────

    pub fn copy(&mut self, id: NodeId) -> bool {
        match self.get(id) {
            Some(node) => {
                self.clipboard = Some(node.clone());
                true
            }
            None => false,
        }
    }

    /// Insert a clone of the copied node with a fresh id, offset from the
    /// original's position.
    pub fn paste(&mut self, timestamp_ms: u64, offset: Point) -> Option<Node> {
        let original = self.clipboard.clone()?;
        let node = Node {
            id: self.unique_id(original.data.id, timestamp_ms),
            data: original.data.clone(),
            position: original.position.offset(offset.x, offset.y),
            is_expanded: original.is_expanded,
        };
        self.add(node.clone());
        Some(node)
    }

    // ─── Node edits ──────────────────────────────────────────────────────

    pub fn set_position(&mut self, id: NodeId, position: Point) -> bool {
        self.update(id, |node| {
            if node.position == position {
                return false;
            }
            node.position = position;
            true
        })
    }

    pub fn set_expanded(&mut self, id: NodeId, expanded: bool) -> bool {
        self.update(id, |node| {
            if node.is_expanded == expanded {
                return false;
            }
            node.is_expanded = expanded;
            true
        })
    }

    /// Swap the node's specification wholesale (schema synchronization).
    pub fn replace_spec(&mut self, id: NodeId, spec: Arc<NodeSpec>) -> bool {
        self.update(id, |node| {
            if node.data == spec {
                return false;
            }
            node.data = spec;
            true
        })
    }

    /// Set a parameter, coercing the value to the parameter's current type.
    /// No-op when the node or parameter is unknown, the value cannot be
    /// coerced, or the coerced value equals the current one.
    pub fn set_parameter_value(&mut self, node_id: NodeId, param_id: &str, value: ParamValue) -> bool {
        self.update(node_id, |node| {
            let Some(current) = node.data.parameter(param_id) else {
                return false;
            };
            let Some(coerced) = current.value.coerce(value) else {
                return false;
            };
            if coerced == current.value {
                return false;
            }
            let data = Arc::make_mut(&mut node.data);
            if let Some(param) = data.parameters.iter_mut().find(|p| p.id == param_id) {
                param.value = coerced;
            }
            true
        })
    }

    pub fn rename_node(&mut self, id: NodeId, name: &str) -> bool {
        self.update(id, |node| {
            if node.data.name == name {
                return false;
            }
            Arc::make_mut(&mut node.data).name = name.to_string();
            true
        })
    }

    pub fn rename_parameter(&mut self, node_id: NodeId, param_id: &str, name: &str) -> bool {
        self.update(node_id, |node| {
            match node.data.parameter(param_id) {
                Some(p) if p.name != name => {}
                _ => return false,
            }
            let data = Arc::make_mut(&mut node.data);
            if let Some(param) = data.parameters.iter_mut().find(|p| p.id == param_id) {
                param.name = name.to_string();
            }
            true
        })
    }

    /// Append a parameter. No-op if the id is already taken.
    pub fn add_parameter(&mut self, node_id: NodeId, param: ParamSpec) -> bool {
        self.update(node_id, |node| {
            if node.data.parameter(&param.id).is_some() {
                return false;
            }
            Arc::make_mut(&mut node.data).parameters.push(param);
            true
        })
    }

    pub fn delete_parameter(&mut self, node_id: NodeId, param_id: &str) -> bool {
        self.update(node_id, |node| {
            if node.data.parameter(param_id).is_none() {
                return false;
            }
            Arc::make_mut(&mut node.data)
                .parameters
                .retain(|p| p.id != param_id);
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::geometry::Point;
    use fc_core::id::{EdgeId, PortId};
    use fc_core::model::{Endpoint, PortDirection};

    fn spec() -> Arc<NodeSpec> {
        Arc::new(
            NodeSpec::new("llm", "LLM")
                .with_parameter(ParamSpec::new("temperature", ParamValue::Number(0.7)))
                .with_parameter(ParamSpec::new("model", ParamValue::Text("small".into()))),
        )
    }

    fn store_with(id: &str, x: f32, y: f32) -> NodeStore {
        let mut store = NodeStore::new();
        store.add(Node::new(NodeId::intern(id), spec(), Point::new(x, y)));
        store
    }

    #[test]
    fn delete_and_undo_roundtrip() {
        let mut store = store_with("n1", 10.0, 20.0);
        let before = store.get(NodeId::intern("n1")).cloned().unwrap();
        let edge = Edge {
            id: EdgeId::intern("e"),
            source: Endpoint::new(NodeId::intern("n1"), PortId::intern("o"), PortDirection::Output),
            target: Endpoint::new(NodeId::intern("n9"), PortId::intern("i"), PortDirection::Input),
        };

        store.delete(NodeId::intern("n1"), vec![edge.clone()]);
        assert!(store.is_empty());

        let stash = store.undo_last_delete().unwrap();
        assert_eq!(stash.edges, vec![edge]);
        assert_eq!(store.get(NodeId::intern("n1")), Some(&before));
        assert!(store.undo_last_delete().is_none());
    }

    #[test]
    fn stash_is_dropped_once_the_node_is_back() {
        let mut store = store_with("n1", 0.0, 0.0);
        let node = store.delete(NodeId::intern("n1"), Vec::new()).unwrap();

        // Re-added by another path, e.g. a replayed command.
        assert!(store.add(node));
        assert!(store.last_deleted().is_none());
        assert!(store.undo_last_delete().is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_stash_is_depth_one() {
        let mut store = store_with("a", 0.0, 0.0);
        store.add(Node::new(NodeId::intern("b"), spec(), Point::ZERO));
        store.delete(NodeId::intern("a"), vec![]);
        store.delete(NodeId::intern("b"), vec![]);
        let stash = store.undo_last_delete().unwrap();
        assert_eq!(stash.node.id, NodeId::intern("b"));
        assert!(store.undo_last_delete().is_none());
        assert!(!store.contains(NodeId::intern("a")));
    }

    #[test]
    fn paste_offsets_and_renames() {
        let mut store = store_with("orig", 100.0, 40.0);
        assert!(store.copy(NodeId::intern("orig")));
        let pasted = store.paste(1234, Point::new(50.0, 50.0)).unwrap();
        assert_eq!(pasted.id.as_str(), "llm-1234");
        assert_eq!(pasted.position, Point::new(150.0, 90.0));
        assert_eq!(store.len(), 2);

        // Same timestamp again must not collide.
        let again = store.paste(1234, Point::new(50.0, 50.0)).unwrap();
        assert_ne!(again.id, pasted.id);
    }

    #[test]
    fn parameter_edits_coerce_and_skip_noops() {
        let mut store = store_with("n", 0.0, 0.0);
        let id = NodeId::intern("n");
        let generation = store.generation();

        assert!(store.set_parameter_value(id, "temperature", ParamValue::Text("0.2".into())));
        assert_eq!(
            store.get(id).unwrap().data.parameter("temperature").unwrap().value,
            ParamValue::Number(0.2)
        );
        assert!(!store.set_parameter_value(id, "temperature", ParamValue::Number(0.2)));
        assert!(!store.set_parameter_value(id, "missing", ParamValue::Number(1.0)));
        assert!(!store.set_parameter_value(NodeId::intern("ghost"), "temperature", ParamValue::Number(1.0)));
        assert_eq!(store.generation(), generation + 1);
    }

    #[test]
    fn structural_edits_on_unknown_targets_are_noops() {
        let mut store = store_with("n", 0.0, 0.0);
        let id = NodeId::intern("n");
        let snapshot = store.snapshot();

        assert!(!store.rename_node(NodeId::intern("ghost"), "x"));
        assert!(!store.rename_parameter(id, "ghost", "x"));
        assert!(!store.delete_parameter(id, "ghost"));
        assert!(!store.add_parameter(id, ParamSpec::new("model", ParamValue::Bool(true))));
        assert!(Arc::ptr_eq(&snapshot, &store.snapshot()));
    }

    #[test]
    fn snapshots_do_not_observe_later_edits() {
        let mut store = store_with("n", 0.0, 0.0);
        let id = NodeId::intern("n");
        let snapshot = store.snapshot();

        assert!(store.rename_node(id, "Renamed"));
        assert!(store.add_parameter(id, ParamSpec::new("top_p", ParamValue::Number(1.0))));
        assert!(store.set_position(id, Point::new(5.0, 5.0)));

        assert_eq!(snapshot[0].data.name, "LLM");
        assert_eq!(snapshot[0].data.parameters.len(), 2);
        assert_eq!(snapshot[0].position, Point::ZERO);
        assert_eq!(store.get(id).unwrap().data.name, "Renamed");
        assert_eq!(store.get(id).unwrap().data.parameters.len(), 3);
    }

    #[test]
    fn rename_and_delete_parameter() {
        let mut store = store_with("n", 0.0, 0.0);
        let id = NodeId::intern("n");
        assert!(store.rename_parameter(id, "model", "Model name"));
        assert_eq!(store.get(id).unwrap().data.parameter("model").unwrap().name, "Model name");
        assert!(store.delete_parameter(id, "model"));
        assert!(store.get(id).unwrap().data.parameter("model").is_none());
    }
}
