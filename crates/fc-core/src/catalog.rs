//! The host-supplied list of node specifications.

use crate::id::SpecId;
use crate::model::{NodeSpec, PortDirection};
use crate::types::TypeCompat;
use std::sync::Arc;

/// Read-only set of node specifications available for placement.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    specs: Vec<Arc<NodeSpec>>,
}

impl Catalog {
    pub fn new(specs: Vec<NodeSpec>) -> Self {
        Self {
            specs: specs.into_iter().map(Arc::new).collect(),
        }
    }

    /// Parse a JSON array of specifications.
    ///
    /// # Errors
    /// Returns a message if the JSON is not an array of specs.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let specs: Vec<NodeSpec> =
            serde_json::from_str(json).map_err(|e| format!("Catalog parse error: {e}"))?;
        Ok(Self::new(specs))
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<NodeSpec>> {
        self.specs.iter()
    }

    pub fn get(&self, id: SpecId) -> Option<&Arc<NodeSpec>> {
        self.specs.iter().find(|s| s.id == id)
    }

    /// Specs exposing at least one port on `side` that can be connected to a
    /// port of `data_type` sitting on the opposite side.
    ///
    /// `side == Input` finds consumers of an output; `side == Output` finds
    /// producers for an input.
    pub fn connectable(
        &self,
        side: PortDirection,
        data_type: &str,
        compat: &dyn TypeCompat,
    ) -> Vec<Arc<NodeSpec>> {
        self.specs
            .iter()
            .filter(|spec| {
                spec.ports(side).iter().any(|p| match side {
                    PortDirection::Input => compat.compatible(data_type, &p.data_type),
                    PortDirection::Output => compat.compatible(&p.data_type, data_type),
                })
            })
            .cloned()
            .collect()
    }

    /// Specs with an input that accepts `data_type`.
    pub fn consumers_of(&self, data_type: &str, compat: &dyn TypeCompat) -> Vec<Arc<NodeSpec>> {
        self.connectable(PortDirection::Input, data_type, compat)
    }

    /// Specs with an output that can feed an input of `data_type`.
    pub fn producers_of(&self, data_type: &str, compat: &dyn TypeCompat) -> Vec<Arc<NodeSpec>> {
        self.connectable(PortDirection::Output, data_type, compat)
    }
}
