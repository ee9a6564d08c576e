//! Undo/Redo command stack.
//!
//! `CommandStack` is a [`HistorySink`]: every notification becomes a
//! reversible `Command`. Composite notifications are collected into one
//! `Command::Batch` so a reroute or a connect-to-new-node undoes in a single
//! step. Undo applies inverses in reverse order; redo replays forwards.

use crate::edges::EdgeStore;
use crate::history::HistorySink;
use crate::nodes::NodeStore;
use fc_core::geometry::Point;
use fc_core::id::{EdgeId, NodeId};
use fc_core::model::{Edge, Node};

/// A primitive change to the canvas graph.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasMutation {
    AddNode(Box<Node>),
    RemoveNode(NodeId),
    MoveNode { id: NodeId, to: Point },
    AddEdge(Box<Edge>),
    RemoveEdge(EdgeId),
}

#[derive(Debug, Clone)]
pub enum Command {
    Single {
        forward: Box<CanvasMutation>,
        inverse: Box<CanvasMutation>,
        description: String,
    },
    Batch {
        commands: Vec<Command>,
        description: String,
    },
}

impl Command {
    fn single(forward: CanvasMutation, inverse: CanvasMutation, description: &str) -> Self {
        Command::Single {
            forward: Box::new(forward),
            inverse: Box::new(inverse),
            description: description.to_string(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            Command::Single { description, .. } | Command::Batch { description, .. } => description,
        }
    }

    fn apply_inverse(&self, target: &mut StoreTarget<'_>) {
        match self {
            Command::Single { inverse, .. } => target.apply_mutation(inverse),
            Command::Batch { commands, .. } => {
                for cmd in commands.iter().rev() {
                    cmd.apply_inverse(target);
                }
            }
        }
    }

    fn apply_forward(&self, target: &mut StoreTarget<'_>) {
        match self {
            Command::Single { forward, .. } => target.apply_mutation(forward),
            Command::Batch { commands, .. } => {
                for cmd in commands {
                    cmd.apply_forward(target);
                }
            }
        }
    }
}

/// The stores a replayed command writes to. Replays bypass history.
pub struct StoreTarget<'a> {
    pub nodes: &'a mut NodeStore,
    pub edges: &'a mut EdgeStore,
}

impl StoreTarget<'_> {
    pub fn apply_mutation(&mut self, mutation: &CanvasMutation) {
        log::trace!("replay {mutation:?}");
        match mutation {
            CanvasMutation::AddNode(node) => {
                self.nodes.add(node.as_ref().clone());
            }
            CanvasMutation::RemoveNode(id) => {
                self.nodes.remove(*id);
            }
            CanvasMutation::MoveNode { id, to } => {
                self.nodes.set_position(*id, *to);
            }
            CanvasMutation::AddEdge(edge) => {
                self.edges.add(edge.as_ref().clone());
            }
            CanvasMutation::RemoveEdge(id) => {
                self.edges.remove(*id);
            }
        }
    }
}

/// Manages undo/redo stacks with composite grouping.
#[derive(Debug)]
pub struct CommandStack {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    /// Maximum undo depth.
    max_depth: usize,
    /// Composite nesting depth (0 = not batching).
    batch_depth: usize,
    batch: Vec<Command>,
    batch_description: String,
}

impl Default for CommandStack {
    fn default() -> Self {
        Self::new(100)
    }
}

impl CommandStack {
    pub fn new(max_depth: usize) -> Self {
        Self {
            undo_stack: Vec::with_capacity(max_depth),
            redo_stack: Vec::new(),
            max_depth,
            batch_depth: 0,
            batch: Vec::new(),
            batch_description: String::new(),
        }
    }

    fn record(&mut self, cmd: Command) {
        if self.batch_depth > 0 {
            self.batch.push(cmd);
            return;
        }
        self.undo_stack.push(cmd);
        if self.undo_stack.len() > self.max_depth {
            self.undo_stack.remove(0);
        }
        // Clear redo stack on new action
        self.redo_stack.clear();
    }

    /// Undo the last command, writing its inverse into `target`.
    pub fn undo(&mut self, target: &mut StoreTarget<'_>) -> Option<String> {
        let cmd = self.undo_stack.pop()?;
        cmd.apply_inverse(target);
        let desc = cmd.description().to_string();
        self.redo_stack.push(cmd);
        Some(desc)
    }

    /// Redo the last undone command.
    pub fn redo(&mut self, target: &mut StoreTarget<'_>) -> Option<String> {
        let cmd = self.redo_stack.pop()?;
        cmd.apply_forward(target);
        let desc = cmd.description().to_string();
        self.undo_stack.push(cmd);
        Some(desc)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_depth(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

impl HistorySink for CommandStack {
    fn node_added(&mut self, node: &Node) {
        self.record(Command::single(
            CanvasMutation::AddNode(Box::new(node.clone())),
            CanvasMutation::RemoveNode(node.id),
            "add node",
        ));
    }

    fn node_deleted(&mut self, node: &Node, edges: &[Edge]) {
        let mut commands = vec![Command::single(
            CanvasMutation::RemoveNode(node.id),
            CanvasMutation::AddNode(Box::new(node.clone())),
            "delete node",
        )];
        commands.extend(edges.iter().map(|e| {
            Command::single(
                CanvasMutation::RemoveEdge(e.id),
                CanvasMutation::AddEdge(Box::new(e.clone())),
                "delete edge",
            )
        }));
        self.record(Command::Batch {
            commands,
            description: "delete node".to_string(),
        });
    }

    fn node_moved(&mut self, id: NodeId, from: Point, to: Point) {
        self.record(Command::single(
            CanvasMutation::MoveNode { id, to },
            CanvasMutation::MoveNode { id, to: from },
            "move node",
        ));
    }

    fn edge_created(&mut self, edge: &Edge) {
        self.record(Command::single(
            CanvasMutation::AddEdge(Box::new(edge.clone())),
            CanvasMutation::RemoveEdge(edge.id),
            "connect",
        ));
    }

    fn edge_deleted(&mut self, edge: &Edge) {
        self.record(Command::single(
            CanvasMutation::RemoveEdge(edge.id),
            CanvasMutation::AddEdge(Box::new(edge.clone())),
            "disconnect",
        ));
    }

    fn begin_composite(&mut self, description: &str) {
        if self.batch_depth == 0 {
            self.batch.clear();
            self.batch_description = description.to_string();
        }
        self.batch_depth += 1;
    }

    fn end_composite(&mut self) {
        if self.batch_depth == 0 {
            return;
        }
        self.batch_depth -= 1;
        if self.batch_depth == 0 && !self.batch.is_empty() {
            let cmd = Command::Batch {
                commands: std::mem::take(&mut self.batch),
                description: std::mem::take(&mut self.batch_description),
            };
            self.record(cmd);
        }
    }

    fn graph_replaced(&mut self) {
        self.clear();
        self.batch_depth = 0;
        self.batch.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::id::PortId;
    use fc_core::model::{Endpoint, NodeSpec, PortDirection};
    use std::sync::Arc;

    fn node(id: &str) -> Node {
        Node::new(NodeId::intern(id), Arc::new(NodeSpec::new("t", "T")), Point::ZERO)
    }

    fn edge(id: &str, from: &str, to: &str) -> Edge {
        Edge {
            id: EdgeId::intern(id),
            source: Endpoint::new(NodeId::intern(from), PortId::intern("out"), PortDirection::Output),
            target: Endpoint::new(NodeId::intern(to), PortId::intern("in"), PortDirection::Input),
        }
    }

    #[test]
    fn undo_redo_add_node() {
        let (mut nodes, mut edges) = (NodeStore::new(), EdgeStore::new());
        let mut stack = CommandStack::new(10);
        let n = node("a");
        nodes.add(n.clone());
        stack.node_added(&n);

        let mut target = StoreTarget { nodes: &mut nodes, edges: &mut edges };
        assert_eq!(stack.undo(&mut target).as_deref(), Some("add node"));
        assert!(target.nodes.is_empty());
        assert_eq!(stack.redo(&mut target).as_deref(), Some("add node"));
        assert!(target.nodes.contains(NodeId::intern("a")));
    }

    #[test]
    fn composite_undoes_as_one_step() {
        let (mut nodes, mut edges) = (NodeStore::new(), EdgeStore::new());
        let mut stack = CommandStack::new(10);
        let old = edge("old", "a", "b");
        let new = edge("new", "c", "b");
        edges.add(old.clone());

        stack.begin_composite("reroute");
        edges.remove(old.id);
        stack.edge_deleted(&old);
        edges.add(new.clone());
        stack.edge_created(&new);
        stack.end_composite();
        assert_eq!(stack.undo_depth(), 1);

        let mut target = StoreTarget { nodes: &mut nodes, edges: &mut edges };
        assert_eq!(stack.undo(&mut target).as_deref(), Some("reroute"));
        assert_eq!(target.edges.as_slice(), &[old.clone()]);
        stack.redo(&mut target);
        assert_eq!(target.edges.as_slice(), &[new]);
    }

    #[test]
    fn node_delete_restores_edges() {
        let (mut nodes, mut edges) = (NodeStore::new(), EdgeStore::new());
        let mut stack = CommandStack::new(10);
        let n = node("b");
        let e = edge("e", "a", "b");
        stack.node_deleted(&n, std::slice::from_ref(&e));

        let mut target = StoreTarget { nodes: &mut nodes, edges: &mut edges };
        stack.undo(&mut target);
        assert!(target.nodes.contains(n.id));
        assert_eq!(target.edges.len(), 1);
    }

    #[test]
    fn new_action_clears_redo_and_depth_is_capped() {
        let (mut nodes, mut edges) = (NodeStore::new(), EdgeStore::new());
        let mut stack = CommandStack::new(2);
        for id in ["a", "b", "c"] {
            let n = node(id);
            nodes.add(n.clone());
            stack.node_added(&n);
        }
        assert_eq!(stack.undo_depth(), 2);

        let mut target = StoreTarget { nodes: &mut nodes, edges: &mut edges };
        stack.undo(&mut target);
        assert!(stack.can_redo());
        stack.node_moved(NodeId::intern("a"), Point::ZERO, Point::new(10.0, 0.0));
        assert!(!stack.can_redo());
    }

    #[test]
    fn replacing_the_graph_forgets_both_stacks() {
        let (mut nodes, mut edges) = (NodeStore::new(), EdgeStore::new());
        let mut stack = CommandStack::new(10);
        for id in ["a", "b"] {
            let n = node(id);
            nodes.add(n.clone());
            stack.node_added(&n);
        }
        let mut target = StoreTarget { nodes: &mut nodes, edges: &mut edges };
        stack.undo(&mut target);

        stack.graph_replaced();
        assert!(!stack.can_undo());
        assert!(!stack.can_redo());
        assert_eq!(stack.redo(&mut target), None);
    }

    #[test]
    fn empty_composite_records_nothing() {
        let mut stack = CommandStack::new(10);
        stack.begin_composite("noop");
        stack.end_composite();
        stack.end_composite();
        assert!(!stack.can_undo());
    }
}
