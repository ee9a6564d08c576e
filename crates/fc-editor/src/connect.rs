//! Port interaction protocol.
//!
//! Turns pointer gestures on ports into edge creation, rerouting, snapping,
//! and predicted-node suggestions.
//!
//! ## Gesture table
//!
//! | Gesture                              | Result                                        |
//! |--------------------------------------|-----------------------------------------------|
//! | press output port                    | edge drag from that port                      |
//! | press input port with an edge        | edge detached, drag from its source output   |
//! | quick press + release on same port   | click: predicted nodes for that port          |
//! | release on compatible port           | edge created (reroute = one composite)        |
//! | release lifted edge on other output  | that output now feeds the lifted input        |
//! | release on predicted port            | predicted node materialized and connected     |
//! | release on empty canvas              | predicted nodes at the release point          |
//! | release on invalid port              | rejected, detached edge restored              |
//!
//! While an edge is dragged, the nearest registered port of the opposite
//! direction within `snap_distance` becomes the snap target. No candidate
//! counts as a valid snap.

use crate::drag::{DragMachine, EdgePreview};
use crate::edges::EdgeStore;
use crate::history::HistorySink;
use crate::nodes::NodeStore;
use crate::ports::{PortKey, PortRegistry};
use crate::predict::Predictions;
use fc_core::catalog::Catalog;
use fc_core::config::CanvasConfig;
use fc_core::geometry::{Point, View};
use fc_core::id::NodeId;
use fc_core::model::{Edge, Endpoint, Node, PortDirection, PortRef};
use fc_core::types::TypeCompat;

/// Everything the protocol reads or writes, borrowed from the canvas for
/// the duration of one event.
pub struct ConnectCtx<'a> {
    pub nodes: &'a mut NodeStore,
    pub edges: &'a mut EdgeStore,
    pub drag: &'a mut DragMachine,
    pub ports: &'a PortRegistry,
    pub predictions: &'a mut Option<Predictions>,
    pub catalog: &'a Catalog,
    pub compat: &'a dyn TypeCompat,
    pub history: &'a mut dyn HistorySink,
    pub config: &'a CanvasConfig,
    pub view: View,
    pub now_ms: f64,
}

impl ConnectCtx<'_> {
    /// Resolve a port key against placed nodes, or against the current
    /// predictions for predicted ids.
    pub fn resolve_port(&self, key: &PortKey) -> Option<PortRef> {
        if key.node_id.is_predicted() {
            self.predictions
                .as_ref()?
                .port_ref(key.node_id, key.port_id, key.direction)
        } else {
            self.nodes
                .get(key.node_id)?
                .port_ref(key.direction, key.port_id)
        }
    }

    /// Type check in data-flow orientation: output type into input type.
    pub fn compatible(&self, a: &PortRef, b: &PortRef) -> bool {
        match a.direction {
            PortDirection::Output => self.compat.compatible(&a.data_type, &b.data_type),
            PortDirection::Input => self.compat.compatible(&b.data_type, &a.data_type),
        }
    }

    fn is_multi_input(&self, endpoint: &Endpoint) -> bool {
        self.nodes
            .get(endpoint.node_id)
            .and_then(|n| n.data.port(PortDirection::Input, endpoint.port_id))
            .is_some_and(|p| p.multi)
    }

    fn anchor(&self, port: &PortRef, fallback: Point) -> Point {
        self.ports.position(&PortKey::of(port)).unwrap_or(fallback)
    }

    fn timestamp(&self) -> u64 {
        self.now_ms.max(0.0) as u64
    }

    fn suggest(&mut self, source: PortRef, anchor: Point) -> usize {
        let predictions =
            Predictions::generate(source, anchor, self.catalog, self.compat, self.config);
        let count = predictions.nodes.len();
        *self.predictions = Some(predictions);
        count
    }
}

/// Result of a protocol step, for hosts that want to react.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectOutcome {
    /// Nothing to do (no edge drag was active).
    None,
    /// Predicted nodes are now shown.
    Suggested { count: usize },
    Connected(Edge),
    /// A predicted node became real; `edge` is `None` only when its source
    /// port disappeared in the meantime.
    NodeCreated { node: NodeId, edge: Option<Edge> },
    Rejected,
}

/// Current snap candidate and whether connecting to it would be allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Snap {
    pub key: PortKey,
    pub valid: bool,
}

#[derive(Debug, Clone)]
struct PressedPort {
    port: PortRef,
    time_ms: f64,
    at: Point,
}

#[derive(Debug, Clone, Default)]
pub struct PortInteraction {
    pressed: Option<PressedPort>,
    detached: Option<Edge>,
    snap: Option<Snap>,
}

impl PortInteraction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snap(&self) -> Option<Snap> {
        self.snap
    }

    /// Validity of the current snap target. No target counts as valid.
    pub fn snap_valid(&self) -> bool {
        self.snap.is_none_or(|s| s.valid)
    }

    /// The edge lifted off an input port by the current drag, if any.
    pub fn detached(&self) -> Option<&Edge> {
        self.detached.as_ref()
    }

    /// Forget gesture state without touching the stores.
    pub fn reset(&mut self) {
        self.pressed = None;
        self.detached = None;
        self.snap = None;
    }

    /// Abandon the current edge drag, putting a lifted edge back.
    pub fn cancel(&mut self, ctx: &mut ConnectCtx<'_>) -> bool {
        let detached = self.detached.take();
        self.reset();
        let had_drag = ctx.drag.take_preview().is_some();
        restore(ctx, detached);
        had_drag
    }

    // ─── Pointer down ────────────────────────────────────────────────────

    /// Press on a port handle. Returns whether anything changed.
    pub fn pointer_down(&mut self, ctx: &mut ConnectCtx<'_>, key: PortKey, screen: Point) -> bool {
        self.reset();
        if key.node_id.is_predicted() {
            return !matches!(self.activate(ctx, key.node_id, Some(key)), ConnectOutcome::None);
        }
        let Some(port) = ctx.resolve_port(&key) else {
            return false;
        };

        // Predictions survive only a drag from their own source port.
        if ctx
            .predictions
            .as_ref()
            .is_some_and(|p| !p.source.same_port(&port))
        {
            *ctx.predictions = None;
        }

        let world = ctx.view.screen_to_world(screen);
        self.pressed = Some(PressedPort {
            port: port.clone(),
            time_ms: ctx.now_ms,
            at: screen,
        });

        let mut source = port.clone();
        if port.direction == PortDirection::Input {
            let existing = if ctx.is_multi_input(&port.endpoint()) {
                ctx.edges.latest_incoming(port.node_id, port.port_id)
            } else {
                ctx.edges.incoming(port.node_id, port.port_id).next()
            };
            let lifted = existing.and_then(|edge| {
                let upstream = ctx
                    .nodes
                    .get(edge.source.node_id)?
                    .port_ref(PortDirection::Output, edge.source.port_id)?;
                Some((edge.id, upstream))
            });
            if let Some((edge_id, upstream)) = lifted {
                self.detached = ctx.edges.remove(edge_id);
                log::trace!("detached edge {edge_id} for reroute");
                source = upstream;
            }
        }

        let start = ctx.anchor(&source, world);
        ctx.drag.start_edge_drag(EdgePreview {
            source,
            start,
            end: world,
        });
        true
    }

    // ─── Pointer move ────────────────────────────────────────────────────

    /// Update the preview end and the snap target.
    pub fn pointer_move(&mut self, ctx: &mut ConnectCtx<'_>, screen: Point) -> bool {
        if ctx.drag.on_pointer_move(screen, &ctx.view).is_none() {
            return false;
        }
        let Some(preview) = ctx.drag.preview() else {
            return false;
        };
        let source = preview.source.clone();
        let want = source.direction.opposite();
        let candidate = ctx.ports.nearest(preview.end, ctx.config.snap_distance, |k| {
            k.direction == want && k.node_id != source.node_id
        });
        self.snap = candidate.map(|(key, _)| Snap {
            key,
            valid: ctx
                .resolve_port(&key)
                .is_some_and(|target| ctx.compatible(&source, &target)),
        });
        true
    }

    // ─── Pointer up ──────────────────────────────────────────────────────

    /// Release. `target` is the port under the pointer, if any; otherwise the
    /// snap target is used.
    pub fn pointer_up(
        &mut self,
        ctx: &mut ConnectCtx<'_>,
        screen: Point,
        target: Option<PortKey>,
    ) -> ConnectOutcome {
        let pressed = self.pressed.take();
        let detached = self.detached.take();
        let snap = self.snap.take();
        let Some(preview) = ctx.drag.take_preview() else {
            restore(ctx, detached);
            return ConnectOutcome::None;
        };
        let world = ctx.view.screen_to_world(screen);

        if let Some(pressed) = pressed
            && is_click(ctx, &pressed, screen, target)
        {
            restore(ctx, detached);
            let anchor = ctx.anchor(&pressed.port, world);
            let count = ctx.suggest(pressed.port, anchor);
            return ConnectOutcome::Suggested { count };
        }

        let source = preview.source;
        let Some(key) = target.or(snap.map(|s| s.key)) else {
            // Released over empty canvas: a lifted edge stays removed.
            if let Some(edge) = &detached {
                ctx.history.edge_deleted(edge);
            }
            let count = ctx.suggest(source, world);
            return ConnectOutcome::Suggested { count };
        };

        // A lifted edge dropped on another output swaps its producer: the
        // new output feeds the input the edge was lifted from.
        let resolved = ctx.resolve_port(&key);
        let lifted_input = detached.as_ref().and_then(|old| {
            ctx.nodes
                .get(old.target.node_id)?
                .port_ref(PortDirection::Input, old.target.port_id)
        });
        let (source, dropped) = match (resolved, lifted_input) {
            (Some(output), Some(input))
                if output.direction == PortDirection::Output && !key.node_id.is_predicted() =>
            {
                (output, Some(input))
            }
            (resolved, _) => (source, resolved),
        };

        let Some(target_port) = dropped
            .filter(|t| t.direction != source.direction && t.node_id != source.node_id)
            .filter(|t| ctx.compatible(&source, t))
        else {
            restore(ctx, detached);
            return ConnectOutcome::Rejected;
        };

        if key.node_id.is_predicted() {
            return self.materialize(ctx, key.node_id, Some(target_port), detached);
        }

        let ts = ctx.timestamp();
        let Some(edge) = Edge::connect(&source, &target_port, ts).filter(|e| {
            !ctx.edges.is_duplicate(
                e.source.node_id,
                e.source.port_id,
                e.target.node_id,
                e.target.port_id,
            )
        }) else {
            restore(ctx, detached);
            return ConnectOutcome::Rejected;
        };

        ctx.history
            .begin_composite(if detached.is_some() { "reroute" } else { "connect" });
        if let Some(old) = &detached {
            ctx.history.edge_deleted(old);
        }
        commit_edge(ctx, edge.clone());
        ctx.history.end_composite();
        *ctx.predictions = None;
        ConnectOutcome::Connected(edge)
    }

    // ─── Predicted nodes ─────────────────────────────────────────────────

    /// Convert a predicted node into a real node connected to the pending
    /// source. `via` picks the port on the predicted node; otherwise the
    /// first compatible port is used.
    pub fn activate(
        &mut self,
        ctx: &mut ConnectCtx<'_>,
        id: NodeId,
        via: Option<PortKey>,
    ) -> ConnectOutcome {
        let Some(source) = ctx.predictions.as_ref().map(|p| p.source.clone()) else {
            return ConnectOutcome::None;
        };
        let port = via
            .and_then(|k| ctx.resolve_port(&k))
            .filter(|p| p.node_id == id && p.direction == source.direction.opposite())
            .filter(|p| ctx.compatible(&source, p));
        self.materialize(ctx, id, port, None)
    }

    fn materialize(
        &mut self,
        ctx: &mut ConnectCtx<'_>,
        id: NodeId,
        port: Option<PortRef>,
        detached: Option<Edge>,
    ) -> ConnectOutcome {
        let Some(predictions) = ctx.predictions.take() else {
            restore(ctx, detached);
            return ConnectOutcome::None;
        };
        let Some(candidate) = predictions.get(id).cloned() else {
            *ctx.predictions = Some(predictions);
            restore(ctx, detached);
            return ConnectOutcome::None;
        };
        let source = predictions.source.clone();
        let port_id = port
            .or_else(|| predictions.first_compatible_port(id, ctx.compat))
            .map(|p| p.port_id);

        let ts = ctx.timestamp();
        let node = Node::new(
            ctx.nodes.unique_id(candidate.spec.id, ts),
            candidate.spec,
            candidate.position,
        );
        log::debug!("predicted node {} converted to {}", id, node.id);

        ctx.history.begin_composite("connect new node");
        if let Some(old) = &detached {
            ctx.history.edge_deleted(old);
        }
        ctx.nodes.add(node.clone());
        ctx.history.node_added(&node);

        let source_alive = ctx
            .nodes
            .get(source.node_id)
            .is_some_and(|n| n.port_ref(source.direction, source.port_id).is_some());
        let edge = port_id
            .filter(|_| source_alive)
            .and_then(|pid| node.port_ref(source.direction.opposite(), pid))
            .and_then(|p| Edge::connect(&source, &p, ts));
        if let Some(edge) = &edge {
            commit_edge(ctx, edge.clone());
        }
        ctx.history.end_composite();

        ConnectOutcome::NodeCreated {
            node: node.id,
            edge,
        }
    }
}

fn is_click(ctx: &ConnectCtx<'_>, pressed: &PressedPort, screen: Point, target: Option<PortKey>) -> bool {
    target == Some(PortKey::of(&pressed.port))
        && ctx.now_ms - pressed.time_ms < ctx.config.click_max_ms
        && pressed.at.distance(screen) < ctx.config.click_max_distance
}

fn restore(ctx: &mut ConnectCtx<'_>, detached: Option<Edge>) {
    if let Some(edge) = detached {
        ctx.edges.add(edge);
    }
}

/// Add `edge`, displacing whatever occupies a non-multi target input.
fn commit_edge(ctx: &mut ConnectCtx<'_>, edge: Edge) {
    log::debug!("edge {} created", edge.id);
    if ctx.is_multi_input(&edge.target) {
        ctx.edges.add(edge.clone());
    } else {
        for old in ctx.edges.replace_input_edge(edge.clone()) {
            ctx.history.edge_deleted(&old);
        }
    }
    ctx.history.edge_created(&edge);
}
