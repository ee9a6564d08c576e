//! Input abstraction layer.
//!
//! Normalizes host pointer, wheel, and keyboard events into a unified
//! `InputEvent` enum consumed by the canvas. Hit testing against rendered
//! elements is the host's job: pointer events arrive with the
//! `PointerTarget` the host resolved under the cursor.

use crate::ports::PortKey;
use fc_core::geometry::Point;
use fc_core::id::{EdgeId, NodeId};

/// Keyboard modifier state at the time of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };
}

/// What the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerTarget {
    /// Empty canvas background.
    Canvas,
    /// The body of a placed node.
    Node(NodeId),
    /// An edge path.
    Edge(EdgeId),
    /// A port handle, on a placed node or on a predicted node.
    Port(PortKey),
    /// The body of a predicted (suggested) node.
    PredictedNode(NodeId),
}

/// Element holding keyboard focus when a key event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FocusTarget {
    #[default]
    Canvas,
    TextInput,
    Select,
    TextArea,
}

impl FocusTarget {
    /// Whether canvas shortcuts may fire with this focus.
    pub fn allows_shortcuts(self) -> bool {
        matches!(self, FocusTarget::Canvas)
    }
}

/// A normalized input event. Coordinates are screen pixels relative to the
/// canvas container; `time_ms` is a monotonic host timestamp.
#[derive(Debug, Clone)]
pub enum InputEvent {
    PointerDown {
        x: f32,
        y: f32,
        time_ms: f64,
        target: PointerTarget,
        modifiers: Modifiers,
    },
    PointerMove {
        x: f32,
        y: f32,
        time_ms: f64,
    },
    PointerUp {
        x: f32,
        y: f32,
        time_ms: f64,
        target: PointerTarget,
    },
    /// Pointer left the canvas; handled exactly like a release over empty canvas.
    PointerLeave { time_ms: f64 },
    /// Wheel / pinch. Positive `delta_y` scrolls down, which zooms out.
    Wheel { x: f32, y: f32, delta_y: f32 },
    Key {
        key: String,
        modifiers: Modifiers,
        focus: FocusTarget,
    },
}

impl InputEvent {
    pub fn pointer_down(x: f32, y: f32, time_ms: f64, target: PointerTarget) -> Self {
        Self::PointerDown {
            x,
            y,
            time_ms,
            target,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn pointer_move(x: f32, y: f32, time_ms: f64) -> Self {
        Self::PointerMove { x, y, time_ms }
    }

    pub fn pointer_up(x: f32, y: f32, time_ms: f64, target: PointerTarget) -> Self {
        Self::PointerUp {
            x,
            y,
            time_ms,
            target,
        }
    }

    pub fn key(key: &str, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.to_string(),
            modifiers,
            focus: FocusTarget::Canvas,
        }
    }

    /// Extract the screen position if this is a positioned event.
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y, .. }
            | Self::PointerUp { x, y, .. }
            | Self::Wheel { x, y, .. } => Some(Point::new(*x, *y)),
            _ => None,
        }
    }

    pub fn time_ms(&self) -> Option<f64> {
        match self {
            Self::PointerDown { time_ms, .. }
            | Self::PointerMove { time_ms, .. }
            | Self::PointerUp { time_ms, .. }
            | Self::PointerLeave { time_ms } => Some(*time_ms),
            _ => None,
        }
    }
}
