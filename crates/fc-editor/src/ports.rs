//! Port Position Registry.
//!
//! Rendered port handles register a bounds provider under a [`PortKey`].
//! Recomputation is deferred: anything that may move ports marks the
//! registry dirty, and the canvas recomputes once per frame. Between a
//! change and the next frame, snapping sees last frame's positions.

use fc_core::geometry::{Point, Rect};
use fc_core::id::{NodeId, PortId};
use fc_core::model::{PortDirection, PortRef};
use std::collections::HashMap;
use std::fmt;

const KEY_DELIMITER: &str = "::";

/// Identity of one rendered port: `(node, port, direction)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortKey {
    pub node_id: NodeId,
    pub port_id: PortId,
    pub direction: PortDirection,
}

impl PortKey {
    pub fn new(node_id: NodeId, port_id: PortId, direction: PortDirection) -> Self {
        Self {
            node_id,
            port_id,
            direction,
        }
    }

    pub fn of(port: &PortRef) -> Self {
        Self::new(port.node_id, port.port_id, port.direction)
    }

    /// Composite string form, `node::port::direction`.
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parse the form produced by [`PortKey::encode`]. The node id may itself
    /// contain the delimiter; port ids and directions may not.
    pub fn parse(s: &str) -> Option<PortKey> {
        let mut parts = s.rsplitn(3, KEY_DELIMITER);
        let direction = PortDirection::parse(parts.next()?)?;
        let port = parts.next()?;
        let node = parts.next()?;
        if node.is_empty() || port.is_empty() {
            return None;
        }
        Some(PortKey::new(NodeId::intern(node), PortId::intern(port), direction))
    }
}

impl fmt::Display for PortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{KEY_DELIMITER}{}{KEY_DELIMITER}{}",
            self.node_id, self.port_id, self.direction
        )
    }
}

/// Supplies a port's bounding box in content-local screen pixels, or `None`
/// when the element is not currently rendered.
pub trait BoundsProvider {
    fn bounds(&self) -> Option<Rect>;
}

impl BoundsProvider for Rect {
    fn bounds(&self) -> Option<Rect> {
        Some(*self)
    }
}

impl<F> BoundsProvider for F
where
    F: Fn() -> Option<Rect>,
{
    fn bounds(&self) -> Option<Rect> {
        self()
    }
}

#[derive(Default)]
pub struct PortRegistry {
    providers: HashMap<PortKey, Box<dyn BoundsProvider>>,
    positions: HashMap<PortKey, Point>,
    dirty: bool,
}

impl fmt::Debug for PortRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortRegistry")
            .field("registered", &self.providers.len())
            .field("positions", &self.positions)
            .field("dirty", &self.dirty)
            .finish()
    }
}

impl PortRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a provider. `None` unregisters.
    pub fn register(&mut self, key: PortKey, provider: Option<Box<dyn BoundsProvider>>) {
        match provider {
            Some(provider) => {
                self.providers.insert(key, provider);
                self.dirty = true;
            }
            None => self.unregister(&key),
        }
    }

    pub fn unregister(&mut self, key: &PortKey) {
        if self.providers.remove(key).is_some() {
            self.positions.remove(key);
            self.dirty = true;
        }
    }

    /// Drop every port belonging to `node_id`.
    pub fn unregister_node(&mut self, node_id: NodeId) {
        let before = self.providers.len();
        self.providers.retain(|k, _| k.node_id != node_id);
        self.positions.retain(|k, _| k.node_id != node_id);
        if self.providers.len() != before {
            self.dirty = true;
        }
    }

    pub fn is_registered(&self, key: &PortKey) -> bool {
        self.providers.contains_key(key)
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Recompute every world-space center: bounds center divided by `scale`.
    /// Unrendered ports keep no position.
    pub fn recompute(&mut self, scale: f32) {
        let scale = if scale > 0.0 { scale } else { 1.0 };
        self.positions = self
            .providers
            .iter()
            .filter_map(|(key, provider)| {
                provider.bounds().map(|r| {
                    let c = r.center();
                    (*key, Point::new(c.x / scale, c.y / scale))
                })
            })
            .collect();
        self.dirty = false;
        log::trace!("recomputed {} port positions", self.positions.len());
    }

    pub fn position(&self, key: &PortKey) -> Option<Point> {
        self.positions.get(key).copied()
    }

    pub fn positions(&self) -> &HashMap<PortKey, Point> {
        &self.positions
    }

    /// Nearest port within `max_distance` of `world` that passes `filter`.
    pub fn nearest(
        &self,
        world: Point,
        max_distance: f32,
        filter: impl Fn(&PortKey) -> bool,
    ) -> Option<(PortKey, f32)> {
        self.positions
            .iter()
            .filter(|(key, _)| filter(key))
            .map(|(key, p)| (*key, p.distance(world)))
            .filter(|(_, d)| *d <= max_distance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;
    use std::rc::Rc;

    fn key(node: &str, port: &str, direction: PortDirection) -> PortKey {
        PortKey::new(NodeId::intern(node), PortId::intern(port), direction)
    }

    #[test]
    fn key_encoding_roundtrips() {
        let k = key("llm::1", "prompt", PortDirection::Input);
        assert_eq!(k.encode(), "llm::1::prompt::input");
        assert_eq!(PortKey::parse(&k.encode()), Some(k));
        assert_eq!(PortKey::parse("n::p::sideways"), None);
        assert_eq!(PortKey::parse("::p::input"), None);
        assert_eq!(PortKey::parse("garbage"), None);
    }

    #[test]
    fn positions_are_centers_divided_by_scale() {
        let mut reg = PortRegistry::new();
        let k = key("n", "out", PortDirection::Output);
        reg.register(k, Some(Box::new(Rect::new(90.0, 40.0, 20.0, 20.0))));
        assert!(reg.is_dirty());
        reg.recompute(2.0);
        assert!(!reg.is_dirty());
        assert_eq!(reg.position(&k), Some(Point::new(50.0, 25.0)));
    }

    #[test]
    fn recompute_is_deferred_until_requested() {
        let x = Rc::new(Cell::new(0.0_f32));
        let provider_x = Rc::clone(&x);
        let mut reg = PortRegistry::new();
        let k = key("n", "in", PortDirection::Input);
        reg.register(
            k,
            Some(Box::new(move || Some(Rect::new(provider_x.get(), 0.0, 0.0, 0.0)))),
        );
        reg.recompute(1.0);
        x.set(100.0);
        // Stale until the next frame.
        assert_eq!(reg.position(&k), Some(Point::ZERO));
        reg.mark_dirty();
        reg.recompute(1.0);
        assert_eq!(reg.position(&k), Some(Point::new(100.0, 0.0)));
    }

    #[test]
    fn nearest_respects_radius_and_filter() {
        let mut reg = PortRegistry::new();
        let near = key("a", "in", PortDirection::Input);
        let far = key("b", "in", PortDirection::Input);
        let wrong = key("c", "out", PortDirection::Output);
        reg.register(near, Some(Box::new(Rect::new(10.0, 0.0, 0.0, 0.0))));
        reg.register(far, Some(Box::new(Rect::new(100.0, 0.0, 0.0, 0.0))));
        reg.register(wrong, Some(Box::new(Rect::new(1.0, 0.0, 0.0, 0.0))));
        reg.recompute(1.0);

        let hit = reg.nearest(Point::ZERO, 30.0, |k| k.direction == PortDirection::Input);
        assert_eq!(hit.map(|h| h.0), Some(near));
        assert_eq!(reg.nearest(Point::new(200.0, 0.0), 30.0, |_| true), None);
    }

    #[test]
    fn unregister_removes_position() {
        let mut reg = PortRegistry::new();
        let k = key("n", "in", PortDirection::Input);
        reg.register(k, Some(Box::new(Rect::new(0.0, 0.0, 4.0, 4.0))));
        reg.recompute(1.0);
        reg.register(k, None);
        assert!(!reg.is_registered(&k));
        assert_eq!(reg.position(&k), None);
    }
}
