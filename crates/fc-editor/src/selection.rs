use fc_core::id::{EdgeId, NodeId};

/// Current selection. A node and an edge can never be selected together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Node(NodeId),
    Edge(EdgeId),
}

impl Selection {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Selection::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn edge(&self) -> Option<EdgeId> {
        match self {
            Selection::Edge(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Selection::None)
    }

    pub fn select_node(&mut self, id: NodeId) {
        *self = Selection::Node(id);
    }

    pub fn select_edge(&mut self, id: EdgeId) {
        *self = Selection::Edge(id);
    }

    pub fn clear(&mut self) {
        *self = Selection::None;
    }
}
