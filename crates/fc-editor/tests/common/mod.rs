//! Shared fixture: four nodes with their port handles registered at fixed
//! world positions (identity view, so screen == world).
//!
//! | node | spec   | ports (center)                                        |
//! |------|--------|-------------------------------------------------------|
//! | a    | source | out (100,10)                                          |
//! | b    | llm    | prompt (300,10), context (300,30), reply (400,10)     |
//! | c    | llm    | prompt (300,210), context (300,230), reply (400,210)  |
//! | v    | viewer | img (300,410)                                         |

#![allow(dead_code)]

use fc_core::catalog::Catalog;
use fc_core::geometry::{Point, Rect};
use fc_core::id::{NodeId, PortId};
use fc_core::model::PortDirection;
use fc_core::state::PartialCanvasState;
use fc_editor::{Canvas, HistorySink, InputEvent, PointerTarget, PortKey};

const PORTS: &[(&str, &str, PortDirection, f32, f32)] = &[
    ("a", "out", PortDirection::Output, 100.0, 10.0),
    ("b", "prompt", PortDirection::Input, 300.0, 10.0),
    ("b", "context", PortDirection::Input, 300.0, 30.0),
    ("b", "reply", PortDirection::Output, 400.0, 10.0),
    ("c", "prompt", PortDirection::Input, 300.0, 210.0),
    ("c", "context", PortDirection::Input, 300.0, 230.0),
    ("c", "reply", PortDirection::Output, 400.0, 210.0),
    ("v", "img", PortDirection::Input, 300.0, 410.0),
];

pub fn catalog() -> Catalog {
    Catalog::from_json(include_str!("../fixtures/catalog.json")).unwrap()
}

pub fn flow() -> PartialCanvasState {
    PartialCanvasState::from_json(include_str!("../fixtures/flow.json")).unwrap()
}

pub fn canvas<H: HistorySink>(history: H) -> Canvas<H> {
    let mut canvas = Canvas::with_history(catalog(), history);
    canvas.load_state(flow());
    for (node, port, direction, x, y) in PORTS {
        register(&mut canvas, key(node, port, *direction), *x, *y);
    }
    canvas.on_frame();
    canvas
}

pub fn register<H: HistorySink>(canvas: &mut Canvas<H>, key: PortKey, x: f32, y: f32) {
    canvas.register_port(key, Some(Box::new(Rect::new(x - 5.0, y - 5.0, 10.0, 10.0))));
}

pub fn key(node: &str, port: &str, direction: PortDirection) -> PortKey {
    PortKey::new(NodeId::intern(node), PortId::intern(port), direction)
}

pub fn out(node: &str, port: &str) -> PortKey {
    key(node, port, PortDirection::Output)
}

pub fn inp(node: &str, port: &str) -> PortKey {
    key(node, port, PortDirection::Input)
}

pub fn at<H: HistorySink>(canvas: &Canvas<H>, key: PortKey) -> Point {
    canvas.ports().position(&key).unwrap()
}

/// Press on `from`, move onto `to`, release over it.
pub fn drag_connect<H: HistorySink>(canvas: &mut Canvas<H>, from: PortKey, to: PortKey, t: f64) {
    let (p, q) = (at(canvas, from), at(canvas, to));
    canvas.handle(&InputEvent::pointer_down(p.x, p.y, t, PointerTarget::Port(from)));
    canvas.handle(&InputEvent::pointer_move(q.x, q.y, t + 100.0));
    canvas.handle(&InputEvent::pointer_up(q.x, q.y, t + 400.0, PointerTarget::Port(to)));
}

/// Press on `from` and release over empty canvas at `(x, y)`.
pub fn drag_to_canvas<H: HistorySink>(canvas: &mut Canvas<H>, from: PortKey, x: f32, y: f32, t: f64) {
    let p = at(canvas, from);
    canvas.handle(&InputEvent::pointer_down(p.x, p.y, t, PointerTarget::Port(from)));
    canvas.handle(&InputEvent::pointer_move(x, y, t + 100.0));
    canvas.handle(&InputEvent::pointer_up(x, y, t + 400.0, PointerTarget::Canvas));
}

/// Quick press and release on the same port.
pub fn click_port<H: HistorySink>(canvas: &mut Canvas<H>, port: PortKey, t: f64) {
    let p = at(canvas, port);
    canvas.handle(&InputEvent::pointer_down(p.x, p.y, t, PointerTarget::Port(port)));
    canvas.handle(&InputEvent::pointer_up(p.x + 1.0, p.y, t + 80.0, PointerTarget::Port(port)));
}

/// Edges as `src.port->dst.port`, in store order.
pub fn edge_pairs<H: HistorySink>(canvas: &Canvas<H>) -> Vec<String> {
    canvas
        .edges()
        .as_slice()
        .iter()
        .map(|e| {
            format!(
                "{}.{}->{}.{}",
                e.source.node_id, e.source.port_id, e.target.node_id, e.target.port_id
            )
        })
        .collect()
}
