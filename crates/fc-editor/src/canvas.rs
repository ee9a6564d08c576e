//! Canvas: event orchestrator and imperative handle.
//!
//! Owns the stores, the drag machine, the port registry, and transient UI
//! state (selection, predictions, snap). Hosts feed it `InputEvent`s and
//! call `on_frame` once per paint; everything else is the imperative API
//! below. All mutations are funnelled through here so that history
//! notifications and port-geometry invalidation stay consistent.

use crate::commands::{CommandStack, StoreTarget};
use crate::connect::{ConnectCtx, ConnectOutcome, PortInteraction, Snap};
use crate::drag::{DragMachine, DragState, DragUpdate, EdgePreview};
use crate::edges::EdgeStore;
use crate::history::{HistorySink, NoHistory};
use crate::input::{InputEvent, PointerTarget};
use crate::nodes::NodeStore;
use crate::ports::{BoundsProvider, PortKey, PortRegistry};
use crate::predict::Predictions;
use crate::selection::Selection;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use fc_core::catalog::Catalog;
use fc_core::config::CanvasConfig;
use fc_core::geometry::{Point, Size, View};
use fc_core::id::{EdgeId, NodeId, PortId, SpecId};
use fc_core::model::{Edge, Node, NodeSpec, ParamSpec, ParamValue, PortDirection};
use fc_core::state::{CanvasState, LoadReport, PartialCanvasState};
use fc_core::types::{DefaultTypeCompat, TypeCompat};
use std::fmt;
use std::sync::Arc;

/// A required input port with no incoming edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingInput {
    pub node_id: NodeId,
    pub port_id: PortId,
    pub port_name: String,
}

impl fmt::Display for MissingInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Node {} is missing required input \"{}\"",
            self.node_id, self.port_name
        )
    }
}

impl std::error::Error for MissingInput {}

pub struct Canvas<H: HistorySink = NoHistory> {
    config: CanvasConfig,
    view: View,
    nodes: NodeStore,
    edges: EdgeStore,
    selection: Selection,
    drag: DragMachine,
    ports: PortRegistry,
    connect: PortInteraction,
    predictions: Option<Predictions>,
    catalog: Catalog,
    compat: Box<dyn TypeCompat>,
    history: H,
    container: Option<Size>,
    content: Option<Size>,
    now_ms: f64,
    last_pointer: Point,
}

impl Canvas<NoHistory> {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_history(catalog, NoHistory)
    }
}

impl<H: HistorySink> Canvas<H> {
    pub fn with_history(catalog: Catalog, history: H) -> Self {
        Self {
            config: CanvasConfig::default(),
            view: View::default(),
            nodes: NodeStore::new(),
            edges: EdgeStore::new(),
            selection: Selection::default(),
            drag: DragMachine::new(),
            ports: PortRegistry::new(),
            connect: PortInteraction::new(),
            predictions: None,
            catalog,
            compat: Box::new(DefaultTypeCompat),
            history,
            container: None,
            content: None,
            now_ms: 0.0,
            last_pointer: Point::ZERO,
        }
    }

    pub fn with_config(mut self, config: CanvasConfig) -> Self {
        self.set_config(config);
        self
    }

    pub fn set_config(&mut self, config: CanvasConfig) {
        self.config = config;
        self.view.scale = self.view.scale.clamp(self.config.min_scale, self.config.max_scale);
        self.ports.mark_dirty();
    }

    /// Replace the type-compatibility predicate.
    pub fn with_compat(mut self, compat: Box<dyn TypeCompat>) -> Self {
        self.compat = compat;
        self
    }

    pub fn set_compat(&mut self, compat: Box<dyn TypeCompat>) {
        self.compat = compat;
    }

    pub fn set_catalog(&mut self, catalog: Catalog) {
        self.catalog = catalog;
        self.predictions = None;
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    pub fn config(&self) -> &CanvasConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn view(&self) -> View {
        self.view
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn edges(&self) -> &EdgeStore {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn drag_state(&self) -> &DragState {
        self.drag.state()
    }

    pub fn edge_preview(&self) -> Option<&EdgePreview> {
        self.drag.preview()
    }

    pub fn snap(&self) -> Option<Snap> {
        self.connect.snap()
    }

    pub fn snap_valid(&self) -> bool {
        self.connect.snap_valid()
    }

    pub fn predictions(&self) -> Option<&Predictions> {
        self.predictions.as_ref()
    }

    pub fn ports(&self) -> &PortRegistry {
        &self.ports
    }

    pub fn history(&self) -> &H {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut H {
        &mut self.history
    }

    fn timestamp(&self) -> u64 {
        self.now_ms.max(0.0) as u64
    }

    /// Hosts without timestamped events can advance the clock directly.
    pub fn set_time(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    fn ctx(&mut self) -> (&mut PortInteraction, ConnectCtx<'_>) {
        let Canvas {
            config,
            view,
            nodes,
            edges,
            drag,
            ports,
            connect,
            predictions,
            catalog,
            compat,
            history,
            now_ms,
            ..
        } = self;
        (
            connect,
            ConnectCtx {
                nodes,
                edges,
                drag,
                ports,
                predictions,
                catalog,
                compat: &**compat,
                history,
                config,
                view: *view,
                now_ms: *now_ms,
            },
        )
    }

    // ─── State ───────────────────────────────────────────────────────────

    pub fn get_state(&self) -> CanvasState {
        CanvasState {
            view: self.view,
            nodes: self.nodes.as_slice().to_vec(),
            edges: self.edges.as_slice().to_vec(),
        }
    }

    /// Replace the graph (and the view, if the state carries one).
    /// Malformed entries are dropped and reported.
    pub fn load_state(&mut self, state: PartialCanvasState) -> LoadReport {
        let (view, report) = self.replace_graph(state);
        if let Some(view) = view {
            self.set_view(view);
        }
        report
    }

    /// Replace the graph, keeping the current view.
    pub fn load_state_without_view(&mut self, state: PartialCanvasState) -> LoadReport {
        self.replace_graph(state).1
    }

    fn replace_graph(&mut self, state: PartialCanvasState) -> (Option<View>, LoadReport) {
        let (view, nodes, edges, report) = state.sanitize();
        if !report.is_clean() {
            log::warn!(
                "load_state dropped {} malformed nodes and {} malformed edges",
                report.nodes_dropped,
                report.edges_dropped
            );
        }
        self.nodes.replace_all(nodes);
        self.edges.replace_all(edges);
        self.selection.clear();
        self.drag = DragMachine::new();
        self.connect.reset();
        self.predictions = None;
        self.ports.mark_dirty();
        self.history.graph_replaced();
        (view, report)
    }

    // ─── View ────────────────────────────────────────────────────────────

    /// Record container and content sizes for centering.
    pub fn set_measurements(&mut self, container: Option<Size>, content: Option<Size>) {
        self.container = container;
        self.content = content;
    }

    /// The view that centers the content in the container at scale 1.
    pub fn centered_view(&self) -> View {
        View::centered(self.container, self.content)
    }

    /// Replace the view. The scale is clamped to the configured zoom range;
    /// a non-finite scale falls back to the lower bound.
    pub fn set_view(&mut self, mut view: View) {
        view.scale = if view.scale.is_finite() {
            view.scale.clamp(self.config.min_scale, self.config.max_scale)
        } else {
            self.config.min_scale
        };
        if view.scale != self.view.scale {
            self.ports.mark_dirty();
        }
        self.view = view;
    }

    /// Cursor-anchored zoom by one step. Positive `delta_sign` zooms in.
    pub fn zoom_at(&mut self, cursor: Point, delta_sign: f32) -> bool {
        let changed = self.view.zoom_at(cursor, delta_sign, &self.config);
        if changed {
            self.ports.mark_dirty();
        }
        changed
    }

    fn zoom_center(&self) -> Point {
        self.container
            .map(|c| Point::new(c.width / 2.0, c.height / 2.0))
            .unwrap_or(Point::ZERO)
    }

    // ─── Frame ───────────────────────────────────────────────────────────

    /// Recompute deferred port geometry. Returns whether it was dirty.
    pub fn on_frame(&mut self) -> bool {
        if !self.ports.is_dirty() {
            return false;
        }
        self.ports.recompute(self.view.scale);
        true
    }

    pub fn register_port(&mut self, key: PortKey, provider: Option<Box<dyn BoundsProvider>>) {
        self.ports.register(key, provider);
    }

    pub fn unregister_port(&mut self, key: &PortKey) {
        self.ports.unregister(key);
    }

    // ─── Selection ───────────────────────────────────────────────────────

    pub fn select_node(&mut self, id: NodeId) -> bool {
        if !self.nodes.contains(id) {
            return false;
        }
        self.selection.select_node(id);
        true
    }

    pub fn select_edge(&mut self, id: EdgeId) -> bool {
        if self.edges.get(id).is_none() {
            return false;
        }
        self.selection.select_edge(id);
        true
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ─── Nodes ───────────────────────────────────────────────────────────

    /// Place a node for `spec` at a screen position.
    pub fn add_node(&mut self, spec: Arc<NodeSpec>, screen_x: f32, screen_y: f32) -> NodeId {
        let position = self.view.screen_to_world(Point::new(screen_x, screen_y));
        let id = self.nodes.unique_id(spec.id, self.timestamp());
        let node = Node::new(id, spec, position);
        self.nodes.add(node.clone());
        self.history.node_added(&node);
        self.ports.mark_dirty();
        log::debug!("node {id} added");
        id
    }

    /// Place a catalog spec by id. `None` if the catalog has no such spec.
    pub fn add_node_from_catalog(&mut self, spec: SpecId, screen_x: f32, screen_y: f32) -> Option<NodeId> {
        let spec = self.catalog.get(spec)?.clone();
        Some(self.add_node(spec, screen_x, screen_y))
    }

    /// Delete a node and every edge touching it, stashing both for
    /// `undo_last_delete`.
    pub fn delete_node(&mut self, id: NodeId) -> Option<Node> {
        if !self.nodes.contains(id) {
            return None;
        }
        let removed = self.edges.remove_all_for_node(id);
        let node = self.nodes.delete(id, removed.clone())?;
        self.history.node_deleted(&node, &removed);
        match self.selection {
            Selection::Node(sel) if sel == id => self.selection.clear(),
            Selection::Edge(sel) if removed.iter().any(|e| e.id == sel) => self.selection.clear(),
            _ => {}
        }
        self.ports.unregister_node(id);
        log::debug!("node {id} deleted with {} edges", removed.len());
        Some(node)
    }

    /// Restore the most recently deleted node and whichever of its edges
    /// can still be connected.
    pub fn undo_last_delete(&mut self) -> Option<NodeId> {
        let stash = self.nodes.undo_last_delete()?;
        let id = stash.node.id;
        self.history.begin_composite("restore node");
        self.history.node_added(&stash.node);
        for edge in stash.edges {
            let ends_exist = self.nodes.contains(edge.source.node_id)
                && self.nodes.contains(edge.target.node_id);
            let duplicate = self.edges.is_duplicate(
                edge.source.node_id,
                edge.source.port_id,
                edge.target.node_id,
                edge.target.port_id,
            );
            if ends_exist && !duplicate && self.edges.add(edge.clone()) {
                self.history.edge_created(&edge);
            }
        }
        self.history.end_composite();
        self.ports.mark_dirty();
        Some(id)
    }

    pub fn copy_node(&mut self, id: NodeId) -> bool {
        self.nodes.copy(id)
    }

    /// Paste the copied node, offset from the original, and select it.
    pub fn paste(&mut self) -> Option<NodeId> {
        let node = self.nodes.paste(self.timestamp(), self.config.paste_offset)?;
        self.history.node_added(&node);
        self.selection.select_node(node.id);
        self.ports.mark_dirty();
        Some(node.id)
    }

    pub fn move_node(&mut self, id: NodeId, position: Point) -> bool {
        let Some(from) = self.nodes.get(id).map(|n| n.position) else {
            return false;
        };
        if !self.nodes.set_position(id, position) {
            return false;
        }
        self.history.node_moved(id, from, position);
        self.ports.mark_dirty();
        true
    }

    pub fn set_parameter_value(&mut self, node_id: NodeId, param_id: &str, value: ParamValue) -> bool {
        self.nodes.set_parameter_value(node_id, param_id, value)
    }

    pub fn rename_node(&mut self, id: NodeId, name: &str) -> bool {
        self.nodes.rename_node(id, name)
    }

    pub fn rename_parameter(&mut self, node_id: NodeId, param_id: &str, name: &str) -> bool {
        self.nodes.rename_parameter(node_id, param_id, name)
    }

    pub fn add_parameter(&mut self, node_id: NodeId, param: ParamSpec) -> bool {
        self.nodes.add_parameter(node_id, param)
    }

    pub fn delete_parameter(&mut self, node_id: NodeId, param_id: &str) -> bool {
        self.nodes.delete_parameter(node_id, param_id)
    }

    /// Flip a node's expanded flag. Port geometry is recomputed next frame.
    pub fn toggle_expanded(&mut self, id: NodeId) -> bool {
        let Some(expanded) = self.nodes.get(id).map(|n| n.is_expanded) else {
            return false;
        };
        self.nodes.set_expanded(id, !expanded);
        self.ports.mark_dirty();
        true
    }

    /// Replace a node's specification, keeping parameter values whose ids
    /// survive, and drop edges whose ports no longer exist.
    pub fn sync_node_schema(&mut self, id: NodeId, spec: NodeSpec) -> Vec<Edge> {
        let Some(current) = self.nodes.get(id).map(|n| Arc::clone(&n.data)) else {
            return Vec::new();
        };
        let mut spec = spec;
        for param in spec.parameters.iter_mut() {
            if let Some(old) = current.parameter(&param.id) {
                param.value = old.value.clone();
            }
        }
        let spec = Arc::new(spec);
        self.nodes.replace_spec(id, Arc::clone(&spec));

        let orphaned = self.edges.remove_where(|e| {
            (e.source.node_id == id && spec.port(PortDirection::Output, e.source.port_id).is_none())
                || (e.target.node_id == id && spec.port(PortDirection::Input, e.target.port_id).is_none())
        });
        if !orphaned.is_empty() {
            log::warn!("schema sync of {id} dropped {} orphaned edges", orphaned.len());
            self.history.begin_composite("sync schema");
            for edge in &orphaned {
                self.history.edge_deleted(edge);
            }
            self.history.end_composite();
            if self
                .selection
                .edge()
                .is_some_and(|sel| orphaned.iter().any(|e| e.id == sel))
            {
                self.selection.clear();
            }
        }
        self.ports.mark_dirty();
        orphaned
    }

    /// Check every required input has an incoming edge. The first offending
    /// node (in store order) is selected.
    pub fn validate_required_inputs(&mut self) -> Result<(), MissingInput> {
        let missing = self.nodes.as_slice().iter().find_map(|node| {
            node.data
                .inputs
                .iter()
                .filter(|p| p.required)
                .find(|p| self.edges.incoming(node.id, p.id).next().is_none())
                .map(|p| MissingInput {
                    node_id: node.id,
                    port_id: p.id,
                    port_name: p.name.clone(),
                })
        });
        match missing {
            Some(missing) => {
                self.selection.select_node(missing.node_id);
                Err(missing)
            }
            None => Ok(()),
        }
    }

    // ─── Edges ───────────────────────────────────────────────────────────

    pub fn delete_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.remove(id)?;
        self.history.edge_deleted(&edge);
        if self.selection.edge() == Some(id) {
            self.selection.clear();
        }
        log::debug!("edge {id} deleted");
        Some(edge)
    }

    /// Delete the selected node (with undo stash) or edge.
    pub fn delete_selected(&mut self) -> bool {
        match self.selection {
            Selection::Node(id) => self.delete_node(id).is_some(),
            Selection::Edge(id) => self.delete_edge(id).is_some(),
            Selection::None => false,
        }
    }

    // ─── Predictions ─────────────────────────────────────────────────────

    pub fn set_predicted_hover(&mut self, id: NodeId, hovered: bool) -> bool {
        self.predictions
            .as_mut()
            .is_some_and(|p| p.set_hover(id, hovered))
    }

    /// Convert a predicted node into a real, connected node.
    pub fn activate_predicted(&mut self, id: NodeId) -> ConnectOutcome {
        let (connect, mut ctx) = self.ctx();
        let outcome = connect.activate(&mut ctx, id, None);
        self.after_connect(&outcome);
        outcome
    }

    pub fn clear_predictions(&mut self) -> bool {
        self.predictions.take().is_some()
    }

    fn after_connect(&mut self, outcome: &ConnectOutcome) {
        match outcome {
            ConnectOutcome::NodeCreated { node, .. } => {
                self.selection.select_node(*node);
                self.ports.mark_dirty();
            }
            ConnectOutcome::Suggested { .. } => self.ports.mark_dirty(),
            _ => {}
        }
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Process one input event. Returns whether a re-render is needed.
    pub fn handle(&mut self, event: &InputEvent) -> bool {
        if let Some(t) = event.time_ms() {
            self.now_ms = t;
        }
        match event {
            InputEvent::PointerDown { x, y, target, .. } => {
                let p = Point::new(*x, *y);
                self.last_pointer = p;
                self.pointer_down(p, *target)
            }
            InputEvent::PointerMove { x, y, .. } => {
                let p = Point::new(*x, *y);
                self.last_pointer = p;
                self.pointer_move(p)
            }
            InputEvent::PointerUp { x, y, target, .. } => {
                let p = Point::new(*x, *y);
                self.last_pointer = p;
                self.pointer_up(p, *target)
            }
            InputEvent::PointerLeave { .. } => self.pointer_up(self.last_pointer, PointerTarget::Canvas),
            InputEvent::Wheel { x, y, delta_y } => self.zoom_at(Point::new(*x, *y), -*delta_y),
            InputEvent::Key {
                key,
                modifiers,
                focus,
            } => {
                if !focus.allows_shortcuts() {
                    return false;
                }
                ShortcutMap::resolve(key, modifiers.ctrl, modifiers.shift, modifiers.alt, modifiers.meta)
                    .is_some_and(|action| self.dispatch(action))
            }
        }
    }

    fn pointer_down(&mut self, p: Point, target: PointerTarget) -> bool {
        if self.drag.is_edge_drag() {
            // Missed release: put a lifted edge back before starting over.
            let (connect, mut ctx) = self.ctx();
            connect.cancel(&mut ctx);
        }
        match target {
            PointerTarget::Canvas => {
                self.predictions = None;
                self.selection.clear();
                self.drag.start_canvas_drag(p, &self.view);
                true
            }
            PointerTarget::Node(id) => {
                let Some(position) = self.nodes.get(id).map(|n| n.position) else {
                    return false;
                };
                self.predictions = None;
                self.selection.select_node(id);
                self.drag.start_node_drag(id, p, position, &self.view);
                true
            }
            PointerTarget::Edge(id) => {
                self.predictions = None;
                self.select_edge(id)
            }
            PointerTarget::Port(key) if key.node_id.is_predicted() => {
                let (connect, mut ctx) = self.ctx();
                let outcome = connect.activate(&mut ctx, key.node_id, Some(key));
                self.after_connect(&outcome);
                !matches!(outcome, ConnectOutcome::None)
            }
            PointerTarget::Port(key) => {
                let (connect, mut ctx) = self.ctx();
                connect.pointer_down(&mut ctx, key, p)
            }
            PointerTarget::PredictedNode(id) => {
                !matches!(self.activate_predicted(id), ConnectOutcome::None)
            }
        }
    }

    fn pointer_move(&mut self, p: Point) -> bool {
        if self.drag.is_edge_drag() {
            let (connect, mut ctx) = self.ctx();
            return connect.pointer_move(&mut ctx, p);
        }
        match self.drag.on_pointer_move(p, &self.view) {
            Some(DragUpdate::Pan { x, y }) => {
                self.view.x = x;
                self.view.y = y;
                true
            }
            Some(DragUpdate::MoveNode { id, position }) => {
                let moved = self.nodes.set_position(id, position);
                if moved {
                    self.ports.mark_dirty();
                }
                moved
            }
            Some(DragUpdate::Preview { .. }) | None => false,
        }
    }

    fn pointer_up(&mut self, p: Point, target: PointerTarget) -> bool {
        if self.drag.is_edge_drag() {
            let port = match target {
                PointerTarget::Port(key) => Some(key),
                _ => None,
            };
            let (connect, mut ctx) = self.ctx();
            let outcome = connect.pointer_up(&mut ctx, p, port);
            self.after_connect(&outcome);
            return true;
        }
        let was_dragging = !self.drag.is_idle();
        if let Some(mv) = self.drag.stop(&self.nodes, self.config.move_threshold) {
            self.history.node_moved(mv.id, mv.from, mv.to);
        }
        self.connect.reset();
        was_dragging
    }

    fn dispatch(&mut self, action: ShortcutAction) -> bool {
        log::trace!("shortcut {action:?}");
        match action {
            ShortcutAction::Copy => self
                .selection
                .node()
                .is_some_and(|id| self.nodes.copy(id)),
            ShortcutAction::Paste => self.paste().is_some(),
            ShortcutAction::UndoDelete => self.undo_last_delete().is_some(),
            ShortcutAction::Delete => self.delete_selected(),
            ShortcutAction::Deselect => self.escape(),
            ShortcutAction::ZoomIn => self.zoom_at(self.zoom_center(), 1.0),
            ShortcutAction::ZoomOut => self.zoom_at(self.zoom_center(), -1.0),
            ShortcutAction::ResetView => {
                let view = self.centered_view();
                let changed = view != self.view;
                self.set_view(view);
                changed
            }
        }
    }

    /// Clear predictions, selection, and any pending connection.
    pub fn escape(&mut self) -> bool {
        let mut changed = self.predictions.take().is_some() || !self.selection.is_empty();
        self.selection.clear();
        if self.drag.is_edge_drag() {
            let (connect, mut ctx) = self.ctx();
            changed |= connect.cancel(&mut ctx);
        }
        changed
    }
}

// ─── Undo / Redo ─────────────────────────────────────────────────────────

impl Canvas<CommandStack> {
    /// Undo the last recorded command. Returns its description.
    pub fn undo(&mut self) -> Option<String> {
        let desc = self.history.undo(&mut StoreTarget {
            nodes: &mut self.nodes,
            edges: &mut self.edges,
        })?;
        self.after_replay();
        Some(desc)
    }

    pub fn redo(&mut self) -> Option<String> {
        let desc = self.history.redo(&mut StoreTarget {
            nodes: &mut self.nodes,
            edges: &mut self.edges,
        })?;
        self.after_replay();
        Some(desc)
    }

    fn after_replay(&mut self) {
        let valid = match self.selection {
            Selection::Node(id) => self.nodes.contains(id),
            Selection::Edge(id) => self.edges.get(id).is_some(),
            Selection::None => true,
        };
        if !valid {
            self.selection.clear();
        }
        self.predictions = None;
        self.ports.mark_dirty();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{FocusTarget, Modifiers};
    use fc_core::geometry::Rect;
    use fc_core::model::PortSpec;
    use pretty_assertions::assert_eq;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            NodeSpec::new("llm", "LLM")
                .with_input(PortSpec::new("prompt", "text").required())
                .with_output(PortSpec::new("reply", "text")),
        ])
    }

    fn llm() -> Arc<NodeSpec> {
        catalog().get(SpecId::intern("llm")).cloned().unwrap()
    }

    #[test]
    fn add_node_converts_screen_to_world() {
        let mut canvas = Canvas::new(catalog());
        canvas.set_view(View { x: 100.0, y: 50.0, scale: 2.0 });
        canvas.set_time(42.0);
        let id = canvas.add_node(llm(), 300.0, 250.0);
        assert_eq!(id.as_str(), "llm-42");
        assert_eq!(canvas.node(id).unwrap().position, Point::new(100.0, 100.0));
    }

    #[test]
    fn canvas_drag_pans_the_view() {
        let mut canvas = Canvas::new(catalog());
        canvas.handle(&InputEvent::pointer_down(10.0, 10.0, 0.0, PointerTarget::Canvas));
        canvas.handle(&InputEvent::pointer_move(60.0, 30.0, 16.0));
        canvas.handle(&InputEvent::pointer_up(60.0, 30.0, 32.0, PointerTarget::Canvas));
        assert_eq!(canvas.view(), View { x: 50.0, y: 20.0, scale: 1.0 });
        assert!(canvas.drag.is_idle());
    }

    #[test]
    fn pressing_canvas_clears_selection() {
        let mut canvas = Canvas::new(catalog());
        let id = canvas.add_node(llm(), 0.0, 0.0);
        canvas.handle(&InputEvent::pointer_down(0.0, 0.0, 0.0, PointerTarget::Node(id)));
        canvas.handle(&InputEvent::pointer_up(0.0, 0.0, 10.0, PointerTarget::Node(id)));
        assert_eq!(canvas.selection(), Selection::Node(id));
        canvas.handle(&InputEvent::pointer_down(500.0, 500.0, 20.0, PointerTarget::Canvas));
        assert_eq!(canvas.selection(), Selection::None);
    }

    #[test]
    fn host_views_are_clamped_to_the_zoom_range() {
        let mut canvas = Canvas::new(catalog());
        canvas.set_view(View { x: 0.0, y: 0.0, scale: 500.0 });
        assert_eq!(canvas.view().scale, 20.0);

        let state = PartialCanvasState::from_json(r#"{"view":{"x":0,"y":0,"scale":0}}"#).unwrap();
        canvas.load_state(state);
        assert_eq!(canvas.view().scale, 0.6);

        let id = canvas.add_node(llm(), 30.0, 60.0);
        let p = canvas.node(id).unwrap().position;
        assert!(p.x.is_finite() && p.y.is_finite());
    }

    #[test]
    fn spec_ids_with_the_predicted_prefix_still_connect() {
        let spec = Arc::new(
            NodeSpec::new("predicted-tool", "Tool").with_output(PortSpec::new("out", "text")),
        );
        let mut canvas = Canvas::new(catalog());
        let id = canvas.add_node(spec, 0.0, 0.0);
        assert!(!id.is_predicted());

        let key = PortKey::new(id, PortId::intern("out"), PortDirection::Output);
        canvas.register_port(key, Some(Box::new(Rect::new(0.0, 0.0, 10.0, 10.0))));
        canvas.on_frame();
        assert!(canvas.handle(&InputEvent::pointer_down(5.0, 5.0, 0.0, PointerTarget::Port(key))));
        assert_eq!(canvas.edge_preview().unwrap().source.node_id, id);
    }

    #[test]
    fn wheel_zoom_is_clamped() {
        let mut canvas = Canvas::new(catalog());
        for _ in 0..100 {
            canvas.handle(&InputEvent::Wheel { x: 0.0, y: 0.0, delta_y: 1.0 });
        }
        assert_eq!(canvas.view().scale, 0.6);
        assert!(!canvas.handle(&InputEvent::Wheel { x: 0.0, y: 0.0, delta_y: 1.0 }));
    }

    #[test]
    fn shortcuts_ignored_while_typing() {
        let mut canvas = Canvas::new(catalog());
        let id = canvas.add_node(llm(), 0.0, 0.0);
        canvas.select_node(id);
        let typing = InputEvent::Key {
            key: "Backspace".into(),
            modifiers: Modifiers::NONE,
            focus: FocusTarget::TextInput,
        };
        assert!(!canvas.handle(&typing));
        assert!(canvas.node(id).is_some());

        assert!(canvas.handle(&InputEvent::key("Delete", Modifiers::NONE)));
        assert!(canvas.node(id).is_none());
        let ctrl = Modifiers { ctrl: true, ..Modifiers::NONE };
        assert!(canvas.handle(&InputEvent::key("z", ctrl)));
        assert!(canvas.node(id).is_some());
    }

    #[test]
    fn validation_selects_first_offender() {
        let mut canvas = Canvas::new(catalog());
        canvas.set_time(1.0);
        let a = canvas.add_node(llm(), 0.0, 0.0);
        let err = canvas.validate_required_inputs().unwrap_err();
        assert_eq!(err.node_id, a);
        assert_eq!(err.port_id, PortId::intern("prompt"));
        assert_eq!(canvas.selection(), Selection::Node(a));
    }

    #[test]
    fn toggle_expanded_defers_geometry() {
        let mut canvas = Canvas::new(catalog());
        let id = canvas.add_node(llm(), 0.0, 0.0);
        canvas.register_port(
            PortKey::new(id, PortId::intern("reply"), PortDirection::Output),
            Some(Box::new(Rect::new(0.0, 0.0, 10.0, 10.0))),
        );
        assert!(canvas.on_frame());
        assert!(!canvas.on_frame());

        assert!(canvas.toggle_expanded(id));
        assert!(!canvas.node(id).unwrap().is_expanded);
        assert!(canvas.ports().is_dirty());
        assert!(canvas.on_frame());
        assert!(!canvas.toggle_expanded(NodeId::intern("ghost")));
    }

    #[test]
    fn centered_view_needs_measurements() {
        let mut canvas = Canvas::new(catalog());
        assert_eq!(canvas.centered_view(), View::IDENTITY);
        canvas.set_measurements(Some(Size::new(800.0, 600.0)), Some(Size::new(200.0, 100.0)));
        assert_eq!(canvas.centered_view(), View { x: 300.0, y: 250.0, scale: 1.0 });
    }
}
