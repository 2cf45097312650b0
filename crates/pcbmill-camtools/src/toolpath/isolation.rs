//! Isolation routing: offset rings around copper

use serde::{Deserialize, Serialize};
use tracing::debug;

use pcbmill_core::PlanningError;

use crate::board::Layer;
use crate::geometry::{offset_all, JoinStyle, Ring};

/// Parameters for isolation routing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsolationParameters {
    /// Number of concentric passes around each feature
    pub pass_count: u32,
    /// Distance between consecutive passes (mm)
    pub stepover: f64,
    /// Cutting depth (negative, mm)
    pub cut_depth: f64,
    /// Height for travel between loops (mm)
    pub safe_z: f64,
    /// Corner treatment of the offsets
    pub join: JoinStyle,
}

impl Default for IsolationParameters {
    fn default() -> Self {
        Self {
            pass_count: 1,
            stepover: 0.05,
            cut_depth: -0.05,
            safe_z: 2.0,
            join: JoinStyle::Round,
        }
    }
}

/// Rings traced by the tool center around a copper layer
///
/// Pass `k` offsets all copper by `tool_radius + k * stepover` and merges the
/// grown shapes, so touching features share one ring. Every outer and hole
/// ring of the merged result is returned.
pub fn isolation_rings(
    layer: &Layer,
    tool_radius: f64,
    params: &IsolationParameters,
) -> Result<Vec<Ring>, PlanningError> {
    if layer.is_empty() {
        return Ok(Vec::new());
    }

    let mut rings = Vec::new();
    for pass in 0..params.pass_count {
        let distance = tool_radius + pass as f64 * params.stepover;
        let grown = offset_all(&layer.polygons, distance, params.join)?;
        debug!(
            layer = %layer.name,
            pass,
            distance,
            polygons = grown.len(),
            "Isolation pass offset"
        );
        rings.extend(grown.into_iter().flat_map(|p| {
            let mut all = vec![p.outer];
            all.extend(p.holes);
            all
        }));
    }

    if rings.is_empty() {
        return Err(PlanningError::EmptyIsolationPath {
            layer: layer.name.clone(),
        });
    }
    Ok(rings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::LayerKind;
    use crate::geometry::{BoundingBox, Point, Polygon};

    fn pad_layer() -> Layer {
        let pad = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(10.0, 5.0)).unwrap();
        Layer::new("top", LayerKind::Copper, vec![pad])
    }

    #[test]
    fn test_single_pass_ring_extent() {
        let rings = isolation_rings(&pad_layer(), 0.5, &IsolationParameters::default()).unwrap();
        assert_eq!(rings.len(), 1);
        let bbox = rings[0].bounding_box();
        let expected = BoundingBox::new(-0.5, -0.5, 10.5, 5.5);
        assert!((bbox.min_x - expected.min_x).abs() < 1e-6);
        assert!((bbox.min_y - expected.min_y).abs() < 1e-6);
        assert!((bbox.max_x - expected.max_x).abs() < 1e-6);
        assert!((bbox.max_y - expected.max_y).abs() < 1e-6);
    }

    #[test]
    fn test_multiple_passes_step_out() {
        let params = IsolationParameters {
            pass_count: 3,
            stepover: 0.2,
            ..IsolationParameters::default()
        };
        let rings = isolation_rings(&pad_layer(), 0.5, &params).unwrap();
        assert_eq!(rings.len(), 3);
        assert!((rings[2].bounding_box().max_x - 10.9).abs() < 1e-6);
    }

    #[test]
    fn test_touching_features_share_ring() {
        let a = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(2.0, 2.0)).unwrap();
        let b = Polygon::rectangle(Point::new(2.5, 0.0), Point::new(4.5, 2.0)).unwrap();
        let layer = Layer::new("top", LayerKind::Copper, vec![a, b]);
        let rings = isolation_rings(&layer, 0.5, &IsolationParameters::default()).unwrap();
        assert_eq!(rings.len(), 1);
    }

    #[test]
    fn test_empty_layer_has_no_rings() {
        let layer = Layer::new("bottom", LayerKind::Copper, Vec::new());
        assert!(isolation_rings(&layer, 0.5, &IsolationParameters::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_collapsed_copper_has_no_path() {
        // a pad collapsed to a single point
        let dot = Polygon {
            outer: Ring::new(vec![Point::new(1.0, 1.0); 3]),
            holes: Vec::new(),
        };
        let layer = Layer::new("top", LayerKind::Copper, vec![dot]);
        let err = isolation_rings(&layer, 0.5, &IsolationParameters::default()).unwrap_err();
        assert_eq!(
            err,
            PlanningError::EmptyIsolationPath {
                layer: "top".to_string()
            }
        );
    }
}
