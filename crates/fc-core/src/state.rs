//! Persisted canvas state: the snapshot a host must round-trip.
//!
//! ```json
//! { "view": {"x":0,"y":0,"scale":1},
//!   "nodes": [{"id":"n1","data":{...},"position":{"x":0,"y":0},"isExpanded":true}],
//!   "edges": [{"id":"e1","source":{"nodeId":..,"portId":..,"portType":"output"},
//!              "target":{"nodeId":..,"portId":..,"portType":"input"}}] }
//! ```

use crate::geometry::View;
use crate::model::{Edge, Node};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A complete, well-formed canvas snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CanvasState {
    #[serde(default)]
    pub view: View,
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl CanvasState {
    pub fn to_json(&self) -> String {
        // Serialization of these types cannot fail: all map keys are strings.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// # Errors
    /// Returns a message if the JSON does not describe a well-formed state.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("State parse error: {e}"))
    }

    /// Compact binary snapshot (MessagePack, named fields).
    ///
    /// # Errors
    /// Returns a message if encoding fails.
    pub fn to_msgpack(&self) -> Result<Vec<u8>, String> {
        rmp_serde::to_vec_named(self).map_err(|e| format!("Snapshot encode error: {e}"))
    }

    /// # Errors
    /// Returns a message if the bytes are not a snapshot produced by `to_msgpack`.
    pub fn from_msgpack(bytes: &[u8]) -> Result<Self, String> {
        rmp_serde::from_slice(bytes).map_err(|e| format!("Snapshot decode error: {e}"))
    }
}

/// Host-supplied state whose entries have not been validated yet.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PartialCanvasState {
    #[serde(default)]
    pub view: Option<View>,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub edges: Vec<Value>,
}

impl PartialCanvasState {
    /// # Errors
    /// Returns a message only if the top-level JSON is malformed; malformed
    /// entries inside `nodes`/`edges` are kept for `sanitize` to filter.
    pub fn from_json(json: &str) -> Result<Self, String> {
        serde_json::from_str(json).map_err(|e| format!("State parse error: {e}"))
    }

    /// Keep only structurally valid nodes (with `id` and `data`) and edges
    /// (with `id`, `source`, and `target`).
    pub fn sanitize(self) -> (Option<View>, Vec<Node>, Vec<Edge>, LoadReport) {
        let total_nodes = self.nodes.len();
        let total_edges = self.edges.len();

        let nodes: Vec<Node> = self
            .nodes
            .into_iter()
            .filter_map(|v| parse_entry(v, "node", &["id", "data"]))
            .collect();
        let edges: Vec<Edge> = self
            .edges
            .into_iter()
            .filter_map(|v| parse_entry(v, "edge", &["id", "source", "target"]))
            .collect();

        let report = LoadReport {
            nodes_loaded: nodes.len(),
            nodes_dropped: total_nodes - nodes.len(),
            edges_loaded: edges.len(),
            edges_dropped: total_edges - edges.len(),
        };
        (self.view, nodes, edges, report)
    }
}

impl From<CanvasState> for PartialCanvasState {
    fn from(state: CanvasState) -> Self {
        Self {
            view: Some(state.view),
            nodes: state
                .nodes
                .iter()
                .filter_map(|n| serde_json::to_value(n).ok())
                .collect(),
            edges: state
                .edges
                .iter()
                .filter_map(|e| serde_json::to_value(e).ok())
                .collect(),
        }
    }
}

/// Decode one host entry, or `None` (logged) if it is missing a required
/// field or does not match the model.
fn parse_entry<T: serde::de::DeserializeOwned>(
    value: Value,
    kind: &str,
    fields: &[&str],
) -> Option<T> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("<no id>")
        .to_string();
    if !has_fields(&value, fields) {
        log::debug!("dropping {kind} {id}: missing one of {fields:?}");
        return None;
    }
    serde_json::from_value(value)
        .map_err(|e| log::debug!("dropping {kind} {id}: {e}"))
        .ok()
}

fn has_fields(value: &Value, fields: &[&str]) -> bool {
    value
        .as_object()
        .is_some_and(|obj| fields.iter().all(|f| obj.get(*f).is_some_and(|v| !v.is_null())))
}

/// Outcome of loading a partial state. Drops are diagnostics, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadReport {
    pub nodes_loaded: usize,
    pub nodes_dropped: usize,
    pub edges_loaded: usize,
    pub edges_dropped: usize,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.nodes_dropped == 0 && self.edges_dropped == 0
    }
}
