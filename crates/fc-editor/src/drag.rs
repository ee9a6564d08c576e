//! Drag state machine.
//!
//! Exactly one drag kind is active at a time. The edge preview lives inside
//! `DragState::Edge`, so a preview can only exist while an edge drag does.
//!
//! | Drag   | Start                        | Move                          |
//! |--------|------------------------------|-------------------------------|
//! | Canvas | pointer − view offset        | view offset = pointer − start |
//! | Node   | pointer / scale − node pos   | node pos = pointer / scale − offset |
//! | Edge   | preview from the source port | preview end follows pointer   |

use crate::nodes::NodeStore;
use fc_core::geometry::{Point, View};
use fc_core::id::NodeId;
use fc_core::model::PortRef;

/// Line from a source port to the pointer, both in world space.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgePreview {
    pub source: PortRef,
    pub start: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum DragState {
    #[default]
    None,
    Canvas {
        start: Point,
    },
    Node {
        id: NodeId,
        offset: Point,
        origin: Point,
    },
    Edge(EdgePreview),
}

/// A completed node drag, reported only when it moved far enough.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeMove {
    pub id: NodeId,
    pub from: Point,
    pub to: Point,
}

/// What a pointer move asks the canvas to change.
#[derive(Debug, Clone, PartialEq)]
pub enum DragUpdate {
    Pan { x: f32, y: f32 },
    MoveNode { id: NodeId, position: Point },
    Preview { end: Point },
}

#[derive(Debug, Clone, Default)]
pub struct DragMachine {
    state: DragState,
}

impl DragMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, DragState::None)
    }

    pub fn is_edge_drag(&self) -> bool {
        matches!(self.state, DragState::Edge(_))
    }

    pub fn preview(&self) -> Option<&EdgePreview> {
        match &self.state {
            DragState::Edge(preview) => Some(preview),
            _ => None,
        }
    }

    pub fn start_canvas_drag(&mut self, pointer: Point, view: &View) {
        self.state = DragState::Canvas {
            start: Point::new(pointer.x - view.x, pointer.y - view.y),
        };
    }

    pub fn start_node_drag(&mut self, id: NodeId, pointer: Point, node_position: Point, view: &View) {
        self.state = DragState::Node {
            id,
            offset: Point::new(
                pointer.x / view.scale - node_position.x,
                pointer.y / view.scale - node_position.y,
            ),
            origin: node_position,
        };
    }

    pub fn start_edge_drag(&mut self, preview: EdgePreview) {
        log::trace!("edge drag from {}:{}", preview.source.node_id, preview.source.port_id);
        self.state = DragState::Edge(preview);
    }

    /// Translate a pointer move (screen space) into the change it implies.
    /// Edge previews are updated in place.
    pub fn on_pointer_move(&mut self, pointer: Point, view: &View) -> Option<DragUpdate> {
        match &mut self.state {
            DragState::None => None,
            DragState::Canvas { start } => Some(DragUpdate::Pan {
                x: pointer.x - start.x,
                y: pointer.y - start.y,
            }),
            DragState::Node { id, offset, .. } => Some(DragUpdate::MoveNode {
                id: *id,
                position: Point::new(
                    pointer.x / view.scale - offset.x,
                    pointer.y / view.scale - offset.y,
                ),
            }),
            DragState::Edge(preview) => {
                preview.end = view.screen_to_world(pointer);
                Some(DragUpdate::Preview { end: preview.end })
            }
        }
    }

    /// Drop the current drag. Returns the preview if an edge drag was active.
    pub fn take_preview(&mut self) -> Option<EdgePreview> {
        match std::mem::take(&mut self.state) {
            DragState::Edge(preview) => Some(preview),
            other => {
                self.state = other;
                None
            }
        }
    }

    /// End whatever drag is active. A node drag whose displacement exceeds
    /// `threshold` is reported as a move.
    pub fn stop(&mut self, nodes: &NodeStore, threshold: f32) -> Option<NodeMove> {
        let DragState::Node { id, origin, .. } = std::mem::take(&mut self.state) else {
            return None;
        };
        let to = nodes.get(id)?.position;
        if origin.distance(to) > threshold {
            Some(NodeMove { id, from: origin, to })
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::id::PortId;
    use fc_core::model::{Node, NodeSpec, PortDirection};
    use std::sync::Arc;

    #[test]
    fn canvas_drag_tracks_pointer() {
        let mut drag = DragMachine::new();
        let view = View { x: 10.0, y: 20.0, scale: 1.0 };
        drag.start_canvas_drag(Point::new(100.0, 100.0), &view);
        let update = drag.on_pointer_move(Point::new(130.0, 90.0), &view);
        assert_eq!(update, Some(DragUpdate::Pan { x: 40.0, y: 10.0 }));
    }

    #[test]
    fn node_drag_keeps_grab_offset_under_zoom() {
        let mut drag = DragMachine::new();
        let view = View { x: 0.0, y: 0.0, scale: 2.0 };
        let id = NodeId::intern("n");
        drag.start_node_drag(id, Point::new(100.0, 100.0), Point::new(40.0, 40.0), &view);
        let update = drag.on_pointer_move(Point::new(120.0, 100.0), &view);
        assert_eq!(
            update,
            Some(DragUpdate::MoveNode { id, position: Point::new(50.0, 40.0) })
        );
    }

    #[test]
    fn small_node_drag_is_not_a_move() {
        let id = NodeId::intern("n");
        let mut nodes = NodeStore::new();
        nodes.add(Node::new(id, Arc::new(NodeSpec::new("t", "T")), Point::ZERO));
        let view = View::default();

        let mut drag = DragMachine::new();
        drag.start_node_drag(id, Point::ZERO, Point::ZERO, &view);
        nodes.set_position(id, Point::new(3.0, 0.0));
        assert_eq!(drag.stop(&nodes, 5.0), None);
        assert!(drag.is_idle());

        drag.start_node_drag(id, Point::ZERO, Point::ZERO, &view);
        nodes.set_position(id, Point::new(30.0, 0.0));
        assert_eq!(
            drag.stop(&nodes, 5.0),
            Some(NodeMove { id, from: Point::ZERO, to: Point::new(30.0, 0.0) })
        );
    }

    #[test]
    fn preview_exists_only_during_edge_drag() {
        let mut drag = DragMachine::new();
        assert!(drag.preview().is_none());
        drag.start_edge_drag(EdgePreview {
            source: PortRef {
                node_id: NodeId::intern("a"),
                port_id: PortId::intern("out"),
                direction: PortDirection::Output,
                data_type: "text".into(),
            },
            start: Point::ZERO,
            end: Point::ZERO,
        });
        drag.on_pointer_move(Point::new(8.0, 6.0), &View::default());
        assert_eq!(drag.preview().map(|p| p.end), Some(Point::new(8.0, 6.0)));
        assert!(drag.take_preview().is_some());
        assert!(drag.preview().is_none());
        assert!(drag.is_idle());
    }
}
