//! Plane geometry and the pan/zoom view transform.
//!
//! World coordinates are where nodes live; screen coordinates are relative to
//! the canvas container's top-left corner. `screen = world * scale + (x, y)`.

use crate::config::CanvasConfig;
use serde::{Deserialize, Serialize};

/// A point in either world or screen space (the caller knows which).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }
}

/// Width and height of a measured box.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Axis-aligned rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.x + self.width && p.y >= self.y && p.y <= self.y + self.height
    }
}

/// The pan/zoom transform applied to canvas content.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct View {
    pub x: f32,
    pub y: f32,
    pub scale: f32,
}

impl Default for View {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl View {
    pub const IDENTITY: View = View {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    };

    /// Translate the view by a screen-space delta.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    pub fn screen_to_world(&self, p: Point) -> Point {
        Point::new((p.x - self.x) / self.scale, (p.y - self.y) / self.scale)
    }

    pub fn world_to_screen(&self, p: Point) -> Point {
        Point::new(p.x * self.scale + self.x, p.y * self.scale + self.y)
    }

    /// Cursor-anchored zoom: rescales by one sensitivity step in the
    /// direction of `delta_sign` (positive zooms in) while keeping the world
    /// point under `cursor` fixed on screen.
    ///
    /// Returns `false` (and leaves the view untouched) when the clamped scale
    /// does not change.
    pub fn zoom_at(&mut self, cursor: Point, delta_sign: f32, config: &CanvasConfig) -> bool {
        let sign = if delta_sign > 0.0 {
            1.0
        } else if delta_sign < 0.0 {
            -1.0
        } else {
            return false;
        };
        let next = (self.scale + sign * config.zoom_sensitivity * self.scale)
            .clamp(config.min_scale, config.max_scale);
        self.rescale_at(cursor, next)
    }

    /// Set the scale to `next`, keeping the world point under `cursor` fixed.
    pub fn rescale_at(&mut self, cursor: Point, next: f32) -> bool {
        if (next - self.scale).abs() <= f32::EPSILON {
            return false;
        }
        let world = self.screen_to_world(cursor);
        self.x = cursor.x - world.x * next;
        self.y = cursor.y - world.y * next;
        self.scale = next;
        true
    }

    /// The view that centers `content` inside `container` at scale 1.
    /// Falls back to the identity view when either box is not measured yet.
    pub fn centered(container: Option<Size>, content: Option<Size>) -> View {
        match (container, content) {
            (Some(container), Some(content)) => View {
                x: (container.width - content.width) / 2.0,
                y: (container.height - content.height) / 2.0,
                scale: 1.0,
            },
            _ => View::IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!(
            (a.x - b.x).abs() < 1e-3 && (a.y - b.y).abs() < 1e-3,
            "{a:?} != {b:?}"
        );
    }

    #[test]
    fn zoom_keeps_cursor_anchored() {
        let config = CanvasConfig::default();
        let mut view = View::IDENTITY;
        let cursor = Point::new(100.0, 100.0);
        let world_before = view.screen_to_world(cursor);

        assert!(view.zoom_at(cursor, 1.0, &config));
        assert!((view.scale - 1.1).abs() < 1e-5);
        assert_close(view.world_to_screen(world_before), cursor);
    }

    #[test]
    fn zoom_anchor_holds_across_scale_range() {
        let config = CanvasConfig::default();
        let cursor = Point::new(100.0, 100.0);
        for start in [0.6_f32, 1.0, 2.5, 7.0, 19.0, 20.0] {
            for sign in [1.0, -1.0] {
                let mut view = View {
                    x: 0.0,
                    y: 0.0,
                    scale: start,
                };
                let world = view.screen_to_world(cursor);
                view.zoom_at(cursor, sign, &config);
                assert!(view.scale >= config.min_scale && view.scale <= config.max_scale);
                assert_close(view.world_to_screen(world), cursor);
            }
        }
    }

    #[test]
    fn zoom_at_clamp_is_noop() {
        let config = CanvasConfig::default();
        let mut view = View {
            x: 12.0,
            y: -4.0,
            scale: config.max_scale,
        };
        let before = view;
        assert!(!view.zoom_at(Point::new(50.0, 50.0), 1.0, &config));
        assert_eq!(view, before);
    }

    #[test]
    fn centered_view_falls_back_to_identity() {
        assert_eq!(View::centered(None, Some(Size::new(10.0, 10.0))), View::IDENTITY);
        let v = View::centered(Some(Size::new(800.0, 600.0)), Some(Size::new(200.0, 100.0)));
        assert_eq!(
            v,
            View {
                x: 300.0,
                y: 250.0,
                scale: 1.0
            }
        );
    }

    #[test]
    fn screen_world_roundtrip() {
        let view = View {
            x: 40.0,
            y: -20.0,
            scale: 2.0,
        };
        let p = Point::new(13.0, 7.5);
        assert_close(view.screen_to_world(view.world_to_screen(p)), p);
    }
}
