//! History notification seam.
//!
//! The canvas reports every undoable change to a `HistorySink`. Multi-step
//! operations (reroute, connect-to-new-node, delete with edges) are wrapped
//! in `begin_composite`/`end_composite` so a sink can group them into one
//! undo step. All methods default to no-ops.

use fc_core::geometry::Point;
use fc_core::id::NodeId;
use fc_core::model::{Edge, Node};

pub trait HistorySink {
    fn node_added(&mut self, _node: &Node) {}
    /// `edges` are the connections removed together with the node.
    fn node_deleted(&mut self, _node: &Node, _edges: &[Edge]) {}
    fn node_moved(&mut self, _id: NodeId, _from: Point, _to: Point) {}
    fn edge_created(&mut self, _edge: &Edge) {}
    fn edge_deleted(&mut self, _edge: &Edge) {}
    fn begin_composite(&mut self, _description: &str) {}
    fn end_composite(&mut self) {}
    /// The whole graph was swapped out (state load). Earlier notifications
    /// no longer describe the current graph.
    fn graph_replaced(&mut self) {}
}

/// Discards every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistorySink for NoHistory {}

/// One recorded notification.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryEvent {
    NodeAdded(NodeId),
    NodeDeleted { id: NodeId, edges: usize },
    NodeMoved { id: NodeId, from: Point, to: Point },
    EdgeCreated(Edge),
    EdgeDeleted(Edge),
    BeginComposite(String),
    EndComposite,
}

/// Records notifications in order. Useful for hosts that forward history to
/// their own store.
#[derive(Debug, Clone, Default)]
pub struct HistoryLog {
    pub events: Vec<HistoryEvent>,
}

impl HistoryLog {
    pub fn drain(&mut self) -> Vec<HistoryEvent> {
        std::mem::take(&mut self.events)
    }
}

impl HistorySink for HistoryLog {
    fn node_added(&mut self, node: &Node) {
        self.events.push(HistoryEvent::NodeAdded(node.id));
    }

    fn node_deleted(&mut self, node: &Node, edges: &[Edge]) {
        self.events.push(HistoryEvent::NodeDeleted {
            id: node.id,
            edges: edges.len(),
        });
    }

    fn node_moved(&mut self, id: NodeId, from: Point, to: Point) {
        self.events.push(HistoryEvent::NodeMoved { id, from, to });
    }

    fn edge_created(&mut self, edge: &Edge) {
        self.events.push(HistoryEvent::EdgeCreated(edge.clone()));
    }

    fn edge_deleted(&mut self, edge: &Edge) {
        self.events.push(HistoryEvent::EdgeDeleted(edge.clone()));
    }

    fn begin_composite(&mut self, description: &str) {
        self.events
            .push(HistoryEvent::BeginComposite(description.to_string()));
    }

    fn end_composite(&mut self) {
        self.events.push(HistoryEvent::EndComposite);
    }
}
