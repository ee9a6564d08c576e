//! Tunable interaction constants.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Configuration for canvas interaction and predicted-node placement.
///
/// Every field has a default, so hosts may supply a partial JSON object and
/// override only what they need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CanvasConfig {
    /// Lower zoom clamp. Default: **0.6**.
    pub min_scale: f32,
    /// Upper zoom clamp. Default: **20.0**.
    pub max_scale: f32,
    /// Relative scale change per wheel notch. Default: **0.1**.
    pub zoom_sensitivity: f32,

    /// World-space radius within which a dragged edge snaps to a port.
    pub snap_distance: f32,
    /// Node-drag displacement (world units) above which a move is recorded.
    pub move_threshold: f32,
    /// A port press released within this many milliseconds may be a click.
    pub click_max_ms: f64,
    /// A port press travelling less than this many screen pixels may be a click.
    pub click_max_distance: f32,

    /// Offset applied to a pasted node relative to its original.
    pub paste_offset: Point,

    pub predicted_h_spacing: f32,
    pub predicted_v_spacing: f32,
    /// Horizontal gap between the anchor point and the nearest grid column.
    pub predicted_clearance: f32,
    /// Assumed node width, used to mirror the grid to the left of an anchor.
    pub predicted_node_width: f32,
    pub predicted_max_columns: usize,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.6,
            max_scale: 20.0,
            zoom_sensitivity: 0.1,
            snap_distance: 30.0,
            move_threshold: 5.0,
            click_max_ms: 250.0,
            click_max_distance: 5.0,
            paste_offset: Point::new(50.0, 50.0),
            predicted_h_spacing: 250.0,
            predicted_v_spacing: 150.0,
            predicted_clearance: 100.0,
            predicted_node_width: 200.0,
            predicted_max_columns: 3,
        }
    }
}

impl CanvasConfig {
    /// Parse a (possibly partial) JSON configuration object.
    ///
    /// # Errors
    /// Returns a message when the JSON is malformed or the zoom range is empty.
    pub fn from_json(json: &str) -> Result<Self, String> {
        let config: CanvasConfig =
            serde_json::from_str(json).map_err(|e| format!("Config parse error: {e}"))?;
        if config.min_scale <= 0.0 || config.min_scale > config.max_scale {
            return Err(format!(
                "Config error: invalid zoom range [{}, {}]",
                config.min_scale, config.max_scale
            ));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = CanvasConfig::from_json(r#"{"snapDistance": 12}"#).unwrap();
        assert_eq!(config.snap_distance, 12.0);
        assert_eq!(config.move_threshold, 5.0);
        assert_eq!(config.predicted_max_columns, 3);
    }

    #[test]
    fn rejects_inverted_zoom_range() {
        let err = CanvasConfig::from_json(r#"{"minScale": 4, "maxScale": 2}"#).unwrap_err();
        assert!(err.contains("zoom range"));
    }
}
