//! WASM bridge for the flow canvas.
//!
//! Exposes `FcCanvas` to the host web UI. The host renders nodes, ports,
//! and edges itself, resolves hit targets, and forwards pointer, wheel, and
//! key events here. Geometry and state flow back as JSON strings.

use fc_core::catalog::Catalog;
use fc_core::config::CanvasConfig;
use fc_core::geometry::{Rect, Size, View};
use fc_core::id::{EdgeId, NodeId, SpecId};
use fc_core::model::{ParamSpec, ParamValue};
use fc_core::state::{LoadReport, PartialCanvasState};
use fc_editor::input::FocusTarget;
use fc_editor::{Canvas, CommandStack, InputEvent, Modifiers, PointerTarget, PortKey};
use serde_json::json;
use wasm_bindgen::prelude::*;

/// Undo depth of the bridge's command stack.
const HISTORY_DEPTH: usize = 100;

/// The main WASM-exposed canvas.
#[wasm_bindgen]
pub struct FcCanvas {
    canvas: Canvas<CommandStack>,
}

#[wasm_bindgen]
impl FcCanvas {
    /// Create a canvas for the given node catalog (JSON array of node specs).
    /// A malformed catalog yields an empty one.
    #[wasm_bindgen(constructor)]
    pub fn new(catalog_json: &str) -> FcCanvas {
        console_error_panic_hook_setup();
        let catalog = Catalog::from_json(catalog_json).unwrap_or_else(|e| {
            log::warn!("{e}");
            Catalog::default()
        });
        FcCanvas {
            canvas: Canvas::with_history(catalog, CommandStack::new(HISTORY_DEPTH)),
        }
    }

    // ─── Configuration ───────────────────────────────────────────────────

    /// Replace the node catalog. Returns false if the JSON is invalid.
    pub fn set_catalog(&mut self, catalog_json: &str) -> bool {
        match Catalog::from_json(catalog_json) {
            Ok(catalog) => {
                self.canvas.set_catalog(catalog);
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Apply a (possibly partial) config object. Returns false if invalid.
    pub fn set_config(&mut self, config_json: &str) -> bool {
        match CanvasConfig::from_json(config_json) {
            Ok(config) => {
                self.canvas.set_config(config);
                true
            }
            Err(e) => {
                log::warn!("{e}");
                false
            }
        }
    }

    /// Install a JS type-compatibility predicate `(sourceType, targetType) => bool`.
    /// A throwing or non-boolean predicate counts as incompatible.
    pub fn set_type_predicate(&mut self, predicate: js_sys::Function) {
        let compat = move |source: &str, target: &str| {
            predicate
                .call2(
                    &JsValue::NULL,
                    &JsValue::from_str(source),
                    &JsValue::from_str(target),
                )
                .map(|v| v.as_bool().unwrap_or(false))
                .unwrap_or(false)
        };
        self.canvas.set_compat(Box::new(compat));
    }

    // ─── State ───────────────────────────────────────────────────────────

    /// Snapshot of view, nodes, and edges as JSON.
    pub fn get_state(&self) -> String {
        self.canvas.get_state().to_json()
    }

    /// Load a (possibly partial) state. Returns the load report as JSON, or
    /// `{"error":"..."}` if the document is not JSON at all.
    pub fn load_state(&mut self, state_json: &str) -> String {
        match PartialCanvasState::from_json(state_json) {
            Ok(state) => report_json(&self.canvas.load_state(state)),
            Err(e) => json!({ "error": e }).to_string(),
        }
    }

    /// Like `load_state`, but keeps the current viewport.
    pub fn load_state_without_view(&mut self, state_json: &str) -> String {
        match PartialCanvasState::from_json(state_json) {
            Ok(state) => report_json(&self.canvas.load_state_without_view(state)),
            Err(e) => json!({ "error": e }).to_string(),
        }
    }

    /// First node missing a required input, as
    /// `{"ok":false,"nodeId":..,"portId":..,"error":..}`, or `{"ok":true}`.
    pub fn validate(&mut self) -> String {
        match self.canvas.validate_required_inputs() {
            Ok(()) => r#"{"ok":true}"#.to_string(),
            Err(missing) => json!({
                "ok": false,
                "nodeId": missing.node_id.as_str(),
                "portId": missing.port_id.as_str(),
                "error": missing.to_string(),
            })
            .to_string(),
        }
    }

    // ─── View ────────────────────────────────────────────────────────────

    pub fn get_view(&self) -> String {
        view_json(self.canvas.view())
    }

    pub fn set_view(&mut self, x: f32, y: f32, scale: f32) {
        self.canvas.set_view(View { x, y, scale });
    }

    /// Record container and content sizes. Non-positive sizes mean "unknown".
    pub fn set_measurements(
        &mut self,
        container_w: f32,
        container_h: f32,
        content_w: f32,
        content_h: f32,
    ) {
        self.canvas
            .set_measurements(measured(container_w, container_h), measured(content_w, content_h));
    }

    /// View that centers the content in the container, as JSON.
    pub fn centered_view(&self) -> String {
        view_json(self.canvas.centered_view())
    }

    // ─── Port geometry ───────────────────────────────────────────────────

    /// Register a port's screen-space bounds. Returns false for a bad key.
    pub fn register_port(&mut self, key: &str, x: f32, y: f32, width: f32, height: f32) -> bool {
        let Some(key) = PortKey::parse(key) else {
            return false;
        };
        self.canvas
            .register_port(key, Some(Box::new(Rect::new(x, y, width, height))));
        true
    }

    pub fn unregister_port(&mut self, key: &str) -> bool {
        let Some(key) = PortKey::parse(key) else {
            return false;
        };
        self.canvas.unregister_port(&key);
        true
    }

    /// Recompute port positions if anything moved. Call once per paint.
    pub fn on_frame(&mut self) -> bool {
        self.canvas.on_frame()
    }

    /// World-space port centers: `{"node::port::direction":{"x":..,"y":..}}`.
    pub fn get_port_positions(&self) -> String {
        let positions: serde_json::Map<String, serde_json::Value> = self
            .canvas
            .ports()
            .positions()
            .iter()
            .map(|(key, p)| (key.encode(), json!({ "x": p.x, "y": p.y })))
            .collect();
        serde_json::Value::Object(positions).to_string()
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Pointer pressed. `target` is `canvas`, `node:<id>`, `edge:<id>`,
    /// `port:<key>`, or `predicted:<id>`. Returns whether to re-render.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f32,
        y: f32,
        time_ms: f64,
        target: &str,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        self.canvas.handle(&InputEvent::PointerDown {
            x,
            y,
            time_ms,
            target: parse_target(target),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
        })
    }

    pub fn handle_pointer_move(&mut self, x: f32, y: f32, time_ms: f64) -> bool {
        self.canvas
            .handle(&InputEvent::pointer_move(x, y, time_ms))
    }

    pub fn handle_pointer_up(&mut self, x: f32, y: f32, time_ms: f64, target: &str) -> bool {
        self.canvas
            .handle(&InputEvent::pointer_up(x, y, time_ms, parse_target(target)))
    }

    pub fn handle_pointer_leave(&mut self, time_ms: f64) -> bool {
        self.canvas.handle(&InputEvent::PointerLeave { time_ms })
    }

    pub fn handle_wheel(&mut self, x: f32, y: f32, delta_y: f32) -> bool {
        self.canvas.handle(&InputEvent::Wheel { x, y, delta_y })
    }

    /// Keyboard event. `focus` names the focused element's kind:
    /// `input`, `select`, `textarea`, or anything else for the canvas.
    pub fn handle_key(
        &mut self,
        key: &str,
        ctrl: bool,
        shift: bool,
        alt: bool,
        meta: bool,
        focus: &str,
    ) -> bool {
        self.canvas.handle(&InputEvent::Key {
            key: key.to_string(),
            modifiers: Modifiers {
                shift,
                ctrl,
                alt,
                meta,
            },
            focus: parse_focus(focus),
        })
    }

    // ─── Imperative API ──────────────────────────────────────────────────

    /// Add a catalog node at a screen position. Returns its id, or "".
    pub fn add_node(&mut self, spec_id: &str, screen_x: f32, screen_y: f32) -> String {
        self.canvas
            .add_node_from_catalog(SpecId::intern(spec_id), screen_x, screen_y)
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn delete_node(&mut self, id: &str) -> bool {
        self.canvas.delete_node(NodeId::intern(id)).is_some()
    }

    pub fn delete_edge(&mut self, id: &str) -> bool {
        self.canvas.delete_edge(EdgeId::intern(id)).is_some()
    }

    pub fn delete_selected(&mut self) -> bool {
        self.canvas.delete_selected()
    }

    pub fn select_node(&mut self, id: &str) -> bool {
        self.canvas.select_node(NodeId::intern(id))
    }

    pub fn select_edge(&mut self, id: &str) -> bool {
        self.canvas.select_edge(EdgeId::intern(id))
    }

    pub fn clear_selection(&mut self) {
        self.canvas.clear_selection();
    }

    /// Current selection: `{"kind":"node"|"edge"|"none","id":..}`.
    pub fn get_selection(&self) -> String {
        let selection = self.canvas.selection();
        if let Some(id) = selection.node() {
            json!({ "kind": "node", "id": id.as_str() }).to_string()
        } else if let Some(id) = selection.edge() {
            json!({ "kind": "edge", "id": id.as_str() }).to_string()
        } else {
            r#"{"kind":"none"}"#.to_string()
        }
    }

    pub fn toggle_expanded(&mut self, id: &str) -> bool {
        self.canvas.toggle_expanded(NodeId::intern(id))
    }

    pub fn rename_node(&mut self, id: &str, name: &str) -> bool {
        self.canvas.rename_node(NodeId::intern(id), name)
    }

    /// Set a parameter from a JSON value (`true`, `0.5`, `"text"`, ...).
    pub fn set_parameter_value(&mut self, node_id: &str, param_id: &str, value_json: &str) -> bool {
        let Ok(value) = serde_json::from_str::<ParamValue>(value_json) else {
            log::warn!("Parameter value is not JSON: {value_json}");
            return false;
        };
        self.canvas
            .set_parameter_value(NodeId::intern(node_id), param_id, value)
    }

    pub fn rename_parameter(&mut self, node_id: &str, param_id: &str, name: &str) -> bool {
        self.canvas
            .rename_parameter(NodeId::intern(node_id), param_id, name)
    }

    /// Add a parameter from `{"id":..,"name":..,"value":..}`. Returns false
    /// for malformed JSON or a duplicate id.
    pub fn add_parameter(&mut self, node_id: &str, param_json: &str) -> bool {
        let param = match serde_json::from_str::<ParamSpec>(param_json) {
            Ok(param) => param,
            Err(e) => {
                log::warn!("Parameter parse error: {e}");
                return false;
            }
        };
        self.canvas.add_parameter(NodeId::intern(node_id), param)
    }

    pub fn delete_parameter(&mut self, node_id: &str, param_id: &str) -> bool {
        self.canvas
            .delete_parameter(NodeId::intern(node_id), param_id)
    }

    pub fn copy_node(&mut self, id: &str) -> bool {
        self.canvas.copy_node(NodeId::intern(id))
    }

    /// Paste the copied node. Returns the new id, or "".
    pub fn paste(&mut self) -> String {
        self.canvas
            .paste()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    /// Restore the most recently deleted node. Returns its id, or "".
    pub fn undo_last_delete(&mut self) -> String {
        self.canvas
            .undo_last_delete()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default()
    }

    pub fn undo(&mut self) -> bool {
        self.canvas.undo().is_some()
    }

    pub fn redo(&mut self) -> bool {
        self.canvas.redo().is_some()
    }

    pub fn can_undo(&self) -> bool {
        self.canvas.history().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.canvas.history().can_redo()
    }

    // ─── Predicted nodes ─────────────────────────────────────────────────

    /// Current suggestions as JSON, or `null`.
    pub fn get_predictions(&self) -> String {
        let Some(predictions) = self.canvas.predictions() else {
            return "null".to_string();
        };
        let nodes: Vec<serde_json::Value> = predictions
            .nodes
            .iter()
            .map(|p| {
                json!({
                    "id": p.id.as_str(),
                    "data": &*p.spec,
                    "position": p.position,
                    "hovered": p.hovered,
                })
            })
            .collect();
        json!({
            "source": PortKey::of(&predictions.source).encode(),
            "nodes": nodes,
        })
        .to_string()
    }

    pub fn set_predicted_hover(&mut self, id: &str, hovered: bool) -> bool {
        self.canvas.set_predicted_hover(NodeId::intern(id), hovered)
    }

    /// Convert a predicted node into a real one. Returns the new node id, or "".
    pub fn activate_predicted(&mut self, id: &str) -> String {
        match self.canvas.activate_predicted(NodeId::intern(id)) {
            fc_editor::ConnectOutcome::NodeCreated { node, .. } => node.as_str().to_string(),
            _ => String::new(),
        }
    }

    pub fn clear_predictions(&mut self) -> bool {
        self.canvas.clear_predictions()
    }

    // ─── Edge preview ────────────────────────────────────────────────────

    /// In-flight edge as world-space endpoints plus snap state, or `null`.
    pub fn get_edge_preview(&self) -> String {
        let Some(preview) = self.canvas.edge_preview() else {
            return "null".to_string();
        };
        let snap = self.canvas.snap().map(|s| s.key.encode());
        json!({
            "source": PortKey::of(&preview.source).encode(),
            "start": preview.start,
            "end": preview.end,
            "snap": snap,
            "valid": self.canvas.snap_valid(),
        })
        .to_string()
    }
}

// ─── Helpers ─────────────────────────────────────────────────────────────

fn parse_target(target: &str) -> PointerTarget {
    let parsed = match target.split_once(':') {
        Some(("node", id)) => Some(PointerTarget::Node(NodeId::intern(id))),
        Some(("edge", id)) => Some(PointerTarget::Edge(EdgeId::intern(id))),
        Some(("predicted", id)) => Some(PointerTarget::PredictedNode(NodeId::intern(id))),
        Some(("port", key)) => PortKey::parse(key).map(PointerTarget::Port),
        _ => None,
    };
    parsed.unwrap_or(PointerTarget::Canvas)
}

fn parse_focus(focus: &str) -> FocusTarget {
    match focus.to_ascii_lowercase().as_str() {
        "input" => FocusTarget::TextInput,
        "select" => FocusTarget::Select,
        "textarea" => FocusTarget::TextArea,
        _ => FocusTarget::Canvas,
    }
}

fn measured(width: f32, height: f32) -> Option<Size> {
    (width > 0.0 && height > 0.0).then(|| Size::new(width, height))
}

fn view_json(view: View) -> String {
    json!({ "x": view.x, "y": view.y, "scale": view.scale }).to_string()
}

fn report_json(report: &LoadReport) -> String {
    json!({
        "nodesLoaded": report.nodes_loaded,
        "nodesDropped": report.nodes_dropped,
        "edgesLoaded": report.edges_loaded,
        "edgesDropped": report.edges_dropped,
    })
    .to_string()
}

fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("FC WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

// ─── Standalone validation functions (no canvas needed) ──────────────────

/// Check a catalog document. Returns `{"ok":true,"count":N}` or `{"ok":false,"error":".."}`.
#[wasm_bindgen]
pub fn validate_catalog(catalog_json: &str) -> String {
    match Catalog::from_json(catalog_json) {
        Ok(catalog) => json!({ "ok": true, "count": catalog.len() }).to_string(),
        Err(e) => json!({ "ok": false, "error": e }).to_string(),
    }
}

/// Whether an output of `source` type may feed an input of `target` type,
/// under the built-in type grammar.
#[wasm_bindgen]
pub fn types_compatible(source: &str, target: &str) -> bool {
    use fc_core::types::{DefaultTypeCompat, TypeCompat};
    DefaultTypeCompat.compatible(source, target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fc_core::id::PortId;
    use fc_core::model::PortDirection;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_pointer_targets() {
        assert_eq!(parse_target("canvas"), PointerTarget::Canvas);
        assert_eq!(parse_target("node:llm-1"), PointerTarget::Node(NodeId::intern("llm-1")));
        assert_eq!(parse_target("edge:e1"), PointerTarget::Edge(EdgeId::intern("e1")));
        assert_eq!(
            parse_target("predicted:predicted-llm-0"),
            PointerTarget::PredictedNode(NodeId::intern("predicted-llm-0"))
        );
        assert_eq!(
            parse_target("port:n1::reply::output"),
            PointerTarget::Port(PortKey::new(
                NodeId::intern("n1"),
                PortId::intern("reply"),
                PortDirection::Output
            ))
        );
    }

    #[test]
    fn unknown_targets_fall_back_to_canvas() {
        assert_eq!(parse_target(""), PointerTarget::Canvas);
        assert_eq!(parse_target("port:garbage"), PointerTarget::Canvas);
        assert_eq!(parse_target("widget:1"), PointerTarget::Canvas);
    }

    #[test]
    fn focus_names_gate_shortcuts() {
        assert!(parse_focus("canvas").allows_shortcuts());
        assert!(!parse_focus("INPUT").allows_shortcuts());
        assert!(!parse_focus("textarea").allows_shortcuts());
    }

    #[test]
    fn unknown_measurements_are_none() {
        assert_eq!(measured(0.0, 10.0), None);
        assert_eq!(measured(10.0, 20.0), Some(Size::new(10.0, 20.0)));
    }

    #[test]
    fn bridge_round_trip_without_a_browser() {
        let catalog = r#"[{"id":"source","name":"Source","inputs":[],
            "outputs":[{"id":"out","name":"Out","type":"text"}],"parameters":[]}]"#;
        let mut canvas = FcCanvas::new(catalog);
        let id = canvas.add_node("source", 10.0, 20.0);
        assert!(!id.is_empty());
        assert!(canvas.can_undo());
        assert!(canvas.undo());
        assert!(canvas.get_state().contains(r#""nodes":[]"#));
        assert_eq!(canvas.get_selection(), r#"{"kind":"none"}"#);
        assert_eq!(canvas.get_predictions(), "null");
    }

    #[test]
    fn node_editing_handle_is_reachable_from_js() {
        let catalog = r#"[{"id":"source","name":"Source",
            "parameters":[{"id":"text","name":"Text","value":""}]}]"#;
        let mut canvas = FcCanvas::new(catalog);
        let id = canvas.add_node("source", 0.0, 0.0);

        assert!(canvas.add_parameter(&id, r#"{"id":"limit","name":"Limit","value":3}"#));
        assert!(!canvas.add_parameter(&id, r#"{"id":"limit"}"#));
        assert!(!canvas.add_parameter(&id, "not json"));
        assert!(canvas.rename_parameter(&id, "limit", "Max items"));
        assert!(canvas.delete_parameter(&id, "text"));
        let state = canvas.get_state();
        assert!(state.contains(r#""name":"Max items""#));
        assert!(!state.contains(r#""id":"text""#));

        assert!(canvas.copy_node(&id));
        let pasted = canvas.paste();
        assert!(!pasted.is_empty());
        assert_ne!(pasted, id);

        assert!(canvas.delete_node(&pasted));
        assert_eq!(canvas.undo_last_delete(), pasted);
        assert_eq!(canvas.undo_last_delete(), "");
    }

    #[test]
    fn validate_catalog_reports_errors() {
        assert!(validate_catalog("[]").contains(r#""ok":true"#));
        assert!(validate_catalog("{").contains(r#""ok":false"#));
    }
}
