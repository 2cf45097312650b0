//! Board transforms: mirroring for bottom-side milling, then translation
//!
//! Transforms are pure; they return a new [`BoardModel`].

use tracing::debug;

use pcbmill_core::MirrorAxis;

use crate::board::{BoardModel, DrillHole, Layer};
use crate::geometry::Point;

/// Reflection across a line parallel to one axis
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mirror {
    pub axis: MirrorAxis,
    /// Position of the mirror line; the board center when `None`
    pub reference: Option<f64>,
}

impl Mirror {
    pub fn new(axis: MirrorAxis, reference: Option<f64>) -> Self {
        Self { axis, reference }
    }

    /// Mirror line position for `board`
    pub fn reference_for(&self, board: &BoardModel) -> f64 {
        if let Some(r) = self.reference {
            return r;
        }
        let center = board.bounds().center();
        match self.axis {
            MirrorAxis::X => center.y,
            MirrorAxis::Y | MirrorAxis::None => center.x,
        }
    }

    /// Reflect one point across the line at `reference`
    pub fn point(&self, p: Point, reference: f64) -> Point {
        match self.axis {
            MirrorAxis::None => p,
            MirrorAxis::X => Point::new(p.x, 2.0 * reference - p.y),
            MirrorAxis::Y => Point::new(2.0 * reference - p.x, p.y),
        }
    }

    pub fn apply(&self, board: &BoardModel) -> BoardModel {
        if self.axis == MirrorAxis::None {
            return board.clone();
        }
        let reference = self.reference_for(board);
        debug!(axis = %self.axis, reference, "Mirroring board");
        map_board(board, |p| self.point(p, reference))
    }
}

/// Mirror, then optionally move the lower-left corner to the origin, then shift
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    pub mirror: Mirror,
    pub origin_at_lower_left: bool,
    pub translation: Point,
}

impl Transform {
    pub fn new(mirror: Mirror) -> Self {
        Self {
            mirror,
            ..Self::default()
        }
    }

    pub fn with_origin_at_lower_left(mut self, enabled: bool) -> Self {
        self.origin_at_lower_left = enabled;
        self
    }

    pub fn with_translation(mut self, translation: Point) -> Self {
        self.translation = translation;
        self
    }

    pub fn apply(&self, board: &BoardModel) -> BoardModel {
        let mirrored = self.mirror.apply(board);
        let mut shift = self.translation;
        if self.origin_at_lower_left {
            let bounds = mirrored.bounds();
            if !bounds.is_empty() {
                shift = shift - Point::new(bounds.min_x, bounds.min_y);
            }
        }
        if shift.x == 0.0 && shift.y == 0.0 {
            return mirrored;
        }
        debug!(dx = shift.x, dy = shift.y, "Translating board");
        map_board(&mirrored, |p| p + shift)
    }
}

fn map_board<F: Fn(Point) -> Point>(board: &BoardModel, f: F) -> BoardModel {
    BoardModel {
        layers: board
            .layers
            .iter()
            .map(|layer| Layer {
                name: layer.name.clone(),
                kind: layer.kind,
                polygons: layer.polygons.iter().map(|p| p.map_points(&f)).collect(),
            })
            .collect(),
        holes: board
            .holes
            .iter()
            .map(|h| DrillHole {
                position: f(h.position),
                ..*h
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::LayerKind;
    use crate::geometry::{Polygon, Winding};

    fn board() -> BoardModel {
        let pad = Polygon::rectangle(Point::new(5.0, 0.0), Point::new(15.0, 5.0)).unwrap();
        BoardModel::new()
            .with_layer(Layer::new("top", LayerKind::Copper, vec![pad]))
            .with_holes(vec![DrillHole {
                position: Point::new(10.0, 2.0),
                diameter: 0.8,
                plated: true,
                tool: 1,
            }])
    }

    #[test]
    fn test_mirror_y_at_fifty() {
        let mirror = Mirror::new(MirrorAxis::Y, Some(50.0));
        assert_eq!(mirror.point(Point::new(10.0, 3.0), 50.0), Point::new(90.0, 3.0));
        let out = mirror.apply(&board());
        assert_eq!(out.holes[0].position, Point::new(90.0, 2.0));
    }

    #[test]
    fn test_mirror_keeps_winding() {
        let out = Mirror::new(MirrorAxis::X, None).apply(&board());
        let polygon = &out.layers[0].polygons[0];
        assert_eq!(polygon.outer.winding(), Winding::CounterClockwise);
        // board spans y 0..5, so the line sits at 2.5
        assert!(out.holes[0].position.approx_eq(Point::new(10.0, 3.0)));
    }

    #[test]
    fn test_double_mirror_restores_vertices() {
        let original = board();
        let mirror = Mirror::new(MirrorAxis::Y, Some(20.0));
        let twice = mirror.apply(&mirror.apply(&original));
        assert_eq!(twice, original);
    }

    #[test]
    fn test_lower_left_origin_with_offset() {
        let out = Transform::new(Mirror::default())
            .with_origin_at_lower_left(true)
            .with_translation(Point::new(1.0, 1.0))
            .apply(&board());
        let bounds = out.bounds();
        assert!((bounds.min_x - 1.0).abs() < 1e-12);
        assert!((bounds.min_y - 1.0).abs() < 1e-12);
    }
}
