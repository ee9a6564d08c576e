//! Canvas data model.
//!
//! A `Node` is a placed instance of an immutable `NodeSpec` taken from the
//! host's catalog. An `Edge` always runs from an output port to an input port
//! of a different node. Ports are not stored on their own: they are derived
//! from the node's specification and addressed by `(node, port, direction)`.

use crate::geometry::Point;
use crate::id::{EdgeId, NodeId, PortId, SpecId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

// ─── Ports ───────────────────────────────────────────────────────────────

/// Which side of a node a port sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortDirection {
    Input,
    Output,
}

impl PortDirection {
    pub fn opposite(self) -> Self {
        match self {
            PortDirection::Input => PortDirection::Output,
            PortDirection::Output => PortDirection::Input,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PortDirection::Input => "input",
            PortDirection::Output => "output",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "input" => Some(PortDirection::Input),
            "output" => Some(PortDirection::Output),
            _ => None,
        }
    }
}

impl fmt::Display for PortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed connection point declared by a node specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortSpec {
    pub id: PortId,
    #[serde(default)]
    pub name: String,
    /// Data type understood by the compatibility predicate (e.g. `text`).
    #[serde(rename = "type", default)]
    pub data_type: String,
    #[serde(default)]
    pub required: bool,
    /// Input ports only: accepts more than one incoming edge.
    #[serde(default)]
    pub multi: bool,
}

impl PortSpec {
    pub fn new(id: &str, data_type: &str) -> Self {
        Self {
            id: PortId::intern(id),
            name: id.to_string(),
            data_type: data_type.to_string(),
            required: false,
            multi: false,
        }
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }
}

// ─── Parameters ──────────────────────────────────────────────────────────

/// Runtime value of a node parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    /// Lists, objects, and null pass through untouched.
    Other(serde_json::Value),
}

impl Default for ParamValue {
    fn default() -> Self {
        ParamValue::Other(serde_json::Value::Null)
    }
}

impl ParamValue {
    /// Convert `incoming` to the runtime type of `self`.
    ///
    /// Numeric parameters stay numeric; returns `None` when the incoming
    /// value cannot be represented in that type.
    pub fn coerce(&self, incoming: ParamValue) -> Option<ParamValue> {
        match (self, incoming) {
            (ParamValue::Number(_), ParamValue::Number(n)) => Some(ParamValue::Number(n)),
            (ParamValue::Number(_), ParamValue::Text(s)) => {
                s.trim().parse::<f64>().ok().map(ParamValue::Number)
            }
            (ParamValue::Number(_), ParamValue::Bool(b)) => {
                Some(ParamValue::Number(if b { 1.0 } else { 0.0 }))
            }
            (ParamValue::Number(_), _) => None,
            (ParamValue::Bool(_), ParamValue::Bool(b)) => Some(ParamValue::Bool(b)),
            (ParamValue::Bool(_), ParamValue::Text(s)) => match s.trim() {
                "true" => Some(ParamValue::Bool(true)),
                "false" => Some(ParamValue::Bool(false)),
                _ => None,
            },
            (ParamValue::Bool(_), ParamValue::Number(n)) => Some(ParamValue::Bool(n != 0.0)),
            (ParamValue::Bool(_), _) => None,
            (ParamValue::Text(_), ParamValue::Number(n)) => Some(ParamValue::Text(n.to_string())),
            (ParamValue::Text(_), ParamValue::Bool(b)) => Some(ParamValue::Text(b.to_string())),
            (ParamValue::Text(_), ParamValue::Text(s)) => Some(ParamValue::Text(s)),
            (ParamValue::Text(_), ParamValue::Other(v)) => Some(ParamValue::Text(v.to_string())),
            (ParamValue::Other(_), v) => Some(v),
        }
    }
}

/// A named, editable parameter on a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: ParamValue,
}

impl ParamSpec {
    pub fn new(id: &str, value: ParamValue) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_string(),
            value,
        }
    }
}

// ─── Node specifications ─────────────────────────────────────────────────

fn unnamed_spec() -> SpecId {
    SpecId::intern("unnamed")
}

/// An entry of the node catalog: name, typed ports, and parameters.
///
/// Every field is optional on the wire; unknown host fields are preserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    #[serde(default = "unnamed_spec")]
    pub id: SpecId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inputs: SmallVec<[PortSpec; 4]>,
    #[serde(default)]
    pub outputs: SmallVec<[PortSpec; 4]>,
    #[serde(default)]
    pub parameters: Vec<ParamSpec>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl NodeSpec {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: SpecId::intern(id),
            name: name.to_string(),
            inputs: SmallVec::new(),
            outputs: SmallVec::new(),
            parameters: Vec::new(),
            extra: serde_json::Map::new(),
        }
    }

    #[must_use]
    pub fn with_input(mut self, port: PortSpec) -> Self {
        self.inputs.push(port);
        self
    }

    #[must_use]
    pub fn with_output(mut self, port: PortSpec) -> Self {
        self.outputs.push(port);
        self
    }

    #[must_use]
    pub fn with_parameter(mut self, param: ParamSpec) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn ports(&self, direction: PortDirection) -> &[PortSpec] {
        match direction {
            PortDirection::Input => &self.inputs,
            PortDirection::Output => &self.outputs,
        }
    }

    pub fn port(&self, direction: PortDirection, id: PortId) -> Option<&PortSpec> {
        self.ports(direction).iter().find(|p| p.id == id)
    }

    pub fn parameter(&self, id: &str) -> Option<&ParamSpec> {
        self.parameters.iter().find(|p| p.id == id)
    }
}

// ─── Nodes ───────────────────────────────────────────────────────────────

fn expanded_by_default() -> bool {
    true
}

/// A placed node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    /// Shared specification; copied on write when name/parameters change.
    pub data: Arc<NodeSpec>,
    #[serde(default)]
    pub position: Point,
    #[serde(default = "expanded_by_default")]
    pub is_expanded: bool,
}

impl Node {
    pub fn new(id: NodeId, data: Arc<NodeSpec>, position: Point) -> Self {
        Self {
            id,
            data,
            position,
            is_expanded: true,
        }
    }

    /// Resolve a port on this node's current specification into a descriptor.
    pub fn port_ref(&self, direction: PortDirection, port_id: PortId) -> Option<PortRef> {
        self.data.port(direction, port_id).map(|p| PortRef {
            node_id: self.id,
            port_id: p.id,
            direction,
            data_type: p.data_type.clone(),
        })
    }
}

// ─── Edges ───────────────────────────────────────────────────────────────

/// One end of an edge. `direction` is persisted as `portType`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub node_id: NodeId,
    pub port_id: PortId,
    #[serde(rename = "portType")]
    pub direction: PortDirection,
}

impl Endpoint {
    pub fn new(node_id: NodeId, port_id: PortId, direction: PortDirection) -> Self {
        Self {
            node_id,
            port_id,
            direction,
        }
    }
}

/// A directed connection from an output port to an input port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    pub source: Endpoint,
    pub target: Endpoint,
}

impl Edge {
    /// Build an edge between two ports, normalizing orientation so the
    /// source is the output side. Returns `None` for same-direction ports
    /// or self-loops.
    pub fn connect(a: &PortRef, b: &PortRef, timestamp_ms: u64) -> Option<Edge> {
        if a.direction == b.direction || a.node_id == b.node_id {
            return None;
        }
        let (out, inp) = if a.direction == PortDirection::Output {
            (a, b)
        } else {
            (b, a)
        };
        Some(Edge {
            id: EdgeId::for_connection(
                out.node_id,
                out.port_id,
                inp.node_id,
                inp.port_id,
                timestamp_ms,
            ),
            source: out.endpoint(),
            target: inp.endpoint(),
        })
    }

    pub fn touches(&self, node_id: NodeId) -> bool {
        self.source.node_id == node_id || self.target.node_id == node_id
    }

    pub fn ends_at(&self, node_id: NodeId, port_id: PortId) -> bool {
        self.target.node_id == node_id && self.target.port_id == port_id
    }

    pub fn same_connection(&self, other: &Edge) -> bool {
        self.source.node_id == other.source.node_id
            && self.source.port_id == other.source.port_id
            && self.target.node_id == other.target.node_id
            && self.target.port_id == other.target.port_id
    }
}

/// A port descriptor plus its data type, as used during interaction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PortRef {
    pub node_id: NodeId,
    pub port_id: PortId,
    pub direction: PortDirection,
    pub data_type: String,
}

impl PortRef {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.node_id, self.port_id, self.direction)
    }

    pub fn same_port(&self, other: &PortRef) -> bool {
        self.node_id == other.node_id
            && self.port_id == other.port_id
            && self.direction == other.direction
    }
}
