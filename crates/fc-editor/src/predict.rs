//! Predicted nodes: catalog suggestions laid out next to a pending port.
//!
//! Output sources get consumers on the right; input sources get producers
//! on the left. Candidates are placed on a grid of at most
//! `predicted_max_columns` columns, vertically centered on the anchor.

use fc_core::catalog::Catalog;
use fc_core::config::CanvasConfig;
use fc_core::geometry::Point;
use fc_core::id::{NodeId, PREDICTED_OUTPUT_PREFIX, PREDICTED_PREFIX, PortId};
use fc_core::model::{NodeSpec, PortDirection, PortRef};
use fc_core::types::TypeCompat;
use std::sync::Arc;

/// A suggested node. Not persisted and never part of the node store.
#[derive(Debug, Clone, PartialEq)]
pub struct PredictedNode {
    pub id: NodeId,
    pub spec: Arc<NodeSpec>,
    pub position: Point,
    pub hovered: bool,
}

/// The suggestions for one pending port, plus the port itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Predictions {
    pub source: PortRef,
    pub anchor: Point,
    pub nodes: Vec<PredictedNode>,
}

impl Predictions {
    /// Compute suggestions for `source`, anchored at the world point `anchor`.
    pub fn generate(
        source: PortRef,
        anchor: Point,
        catalog: &Catalog,
        compat: &dyn TypeCompat,
        config: &CanvasConfig,
    ) -> Self {
        let side = source.direction.opposite();
        let specs = catalog.connectable(side, &source.data_type, compat);
        let nodes = layout(&specs, source.direction, anchor, config);
        log::trace!(
            "{} predicted nodes for {}:{}",
            nodes.len(),
            source.node_id,
            source.port_id
        );
        Self {
            source,
            anchor,
            nodes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&PredictedNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Set hover on one predicted node. Returns whether anything changed.
    pub fn set_hover(&mut self, id: NodeId, hovered: bool) -> bool {
        match self.nodes.iter_mut().find(|n| n.id == id) {
            Some(node) if node.hovered != hovered => {
                node.hovered = hovered;
                true
            }
            _ => false,
        }
    }

    /// Resolve a port on a predicted node.
    pub fn port_ref(&self, id: NodeId, port_id: PortId, direction: PortDirection) -> Option<PortRef> {
        let node = self.get(id)?;
        node.spec.port(direction, port_id).map(|p| PortRef {
            node_id: id,
            port_id: p.id,
            direction,
            data_type: p.data_type.clone(),
        })
    }

    /// First port on predicted node `id` that can take the pending source.
    pub fn first_compatible_port(&self, id: NodeId, compat: &dyn TypeCompat) -> Option<PortRef> {
        let node = self.get(id)?;
        let side = self.source.direction.opposite();
        node.spec
            .ports(side)
            .iter()
            .find(|p| match side {
                PortDirection::Input => compat.compatible(&self.source.data_type, &p.data_type),
                PortDirection::Output => compat.compatible(&p.data_type, &self.source.data_type),
            })
            .map(|p| PortRef {
                node_id: id,
                port_id: p.id,
                direction: side,
                data_type: p.data_type.clone(),
            })
    }
}

fn layout(
    specs: &[Arc<NodeSpec>],
    source_direction: PortDirection,
    anchor: Point,
    config: &CanvasConfig,
) -> Vec<PredictedNode> {
    let n = specs.len();
    if n == 0 {
        return Vec::new();
    }
    let cols = ((n as f32).sqrt().ceil() as usize).clamp(1, config.predicted_max_columns.max(1));
    let rows = n.div_ceil(cols);
    let h = config.predicted_h_spacing;
    let v = config.predicted_v_spacing;
    let top = anchor.y - (rows - 1) as f32 * v / 2.0;

    specs
        .iter()
        .enumerate()
        .map(|(i, spec)| {
            let (row, col) = (i / cols, i % cols);
            let (x, prefix) = match source_direction {
                PortDirection::Output => (
                    anchor.x + config.predicted_clearance + col as f32 * h,
                    PREDICTED_PREFIX,
                ),
                PortDirection::Input => (
                    anchor.x - config.predicted_clearance - config.predicted_node_width - col as f32 * h,
                    PREDICTED_OUTPUT_PREFIX,
                ),
            };
            PredictedNode {
                id: NodeId::intern(&format!("{prefix}{}-{i}", spec.id)),
                spec: Arc::clone(spec),
                position: Point::new(x, top + row as f32 * v),
                hovered: false,
            }
        })
        .collect()
}
