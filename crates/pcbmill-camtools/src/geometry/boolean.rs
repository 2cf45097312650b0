//! Boolean operations on polygon sets
//!
//! Backed by `i_overlay`. Results are re-normalized into [`Polygon`]s and
//! slivers below [`SLIVER_AREA`] are dropped.

use i_overlay::core::fill_rule::FillRule as OverlayFillRule;
use i_overlay::core::overlay_rule::OverlayRule;
use i_overlay::float::single::SingleFloatOverlay;
use pcbmill_core::GeometryError;
use serde::{Deserialize, Serialize};

use super::{Point, Polygon, Ring, Winding};

/// Rings with an absolute area below this (mm²) are discarded
pub const SLIVER_AREA: f64 = 1e-6;

/// Upper bound on input vertices for a single overlay
pub const MAX_OVERLAY_VERTICES: usize = 5_000_000;

type Contour = Vec<[f64; 2]>;
type Shape = Vec<Contour>;

/// How overlapping contours of one operand are filled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FillRule {
    /// Inside where the crossing count is odd
    EvenOdd,
    /// Inside where the winding number is not zero
    #[default]
    NonZero,
}

impl From<FillRule> for OverlayFillRule {
    fn from(rule: FillRule) -> Self {
        match rule {
            FillRule::EvenOdd => OverlayFillRule::EvenOdd,
            FillRule::NonZero => OverlayFillRule::NonZero,
        }
    }
}

fn to_shapes(polygons: &[Polygon]) -> Vec<Shape> {
    polygons
        .iter()
        .map(|poly| {
            poly.rings()
                .map(|ring| ring.points.iter().map(|&p| p.into()).collect())
                .collect()
        })
        .collect()
}

fn ring_from_contour(contour: &Contour) -> Option<Ring> {
    let points: Vec<Point> = contour.iter().map(|&p| p.into()).collect();
    let ring = Ring::cleaned(&points).ok()?;
    if ring.signed_area().abs() < SLIVER_AREA {
        return None;
    }
    Some(ring)
}

fn from_shapes(shapes: &[Shape]) -> Vec<Polygon> {
    let mut result = Vec::with_capacity(shapes.len());
    for shape in shapes {
        let Some((outer, holes)) = shape.split_first() else {
            continue;
        };
        let Some(outer) = ring_from_contour(outer) else {
            continue;
        };
        result.push(Polygon {
            outer: outer.oriented(Winding::CounterClockwise),
            holes: holes
                .iter()
                .filter_map(ring_from_contour)
                .map(|r| r.oriented(Winding::Clockwise))
                .collect(),
        });
    }
    result
}

fn check_budget(vertices: usize) -> Result<(), GeometryError> {
    if vertices > MAX_OVERLAY_VERTICES {
        return Err(GeometryError::TooComplex {
            vertices,
            limit: MAX_OVERLAY_VERTICES,
        });
    }
    Ok(())
}

fn overlay(
    subject: &[Polygon],
    clip: &[Polygon],
    rule: OverlayRule,
    fill: FillRule,
) -> Result<Vec<Polygon>, GeometryError> {
    check_budget(subject.iter().chain(clip).map(Polygon::vertex_count).sum())?;
    let subj = to_shapes(subject);
    let clip = to_shapes(clip);
    let shapes = subj.overlay(&clip, rule, fill.into());
    Ok(from_shapes(&shapes))
}

/// Area covered by either set
pub fn union(a: &[Polygon], b: &[Polygon], fill: FillRule) -> Result<Vec<Polygon>, GeometryError> {
    if a.is_empty() && b.is_empty() {
        return Ok(Vec::new());
    }
    overlay(a, b, OverlayRule::Union, fill)
}

/// Area of `a` not covered by `b`
pub fn subtract(
    a: &[Polygon],
    b: &[Polygon],
    fill: FillRule,
) -> Result<Vec<Polygon>, GeometryError> {
    if a.is_empty() {
        return Ok(Vec::new());
    }
    if b.is_empty() {
        return Ok(a.to_vec());
    }
    overlay(a, b, OverlayRule::Difference, fill)
}

/// Area covered by both sets
pub fn intersect(
    a: &[Polygon],
    b: &[Polygon],
    fill: FillRule,
) -> Result<Vec<Polygon>, GeometryError> {
    if a.is_empty() || b.is_empty() {
        return Ok(Vec::new());
    }
    overlay(a, b, OverlayRule::Intersect, fill)
}

/// Merge a set with itself, resolving overlaps
pub fn union_all(polygons: &[Polygon], fill: FillRule) -> Result<Vec<Polygon>, GeometryError> {
    union(polygons, &[], fill)
}

/// Merge loose point loops (any winding) into normalized polygons
pub fn polygons_from_loops(
    loops: &[Vec<Point>],
    fill: FillRule,
) -> Result<Vec<Polygon>, GeometryError> {
    check_budget(loops.iter().map(Vec::len).sum())?;
    let shapes: Vec<Shape> = loops
        .iter()
        .filter(|l| l.len() >= 3)
        .map(|l| vec![l.iter().map(|&p| p.into()).collect()])
        .collect();
    if shapes.is_empty() {
        return Ok(Vec::new());
    }
    let empty: Vec<Shape> = Vec::new();
    let merged = shapes.overlay(&empty, OverlayRule::Union, fill.into());
    Ok(from_shapes(&merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::total_area;

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon {
        Polygon::rectangle(Point::new(x0, y0), Point::new(x1, y1)).unwrap()
    }

    #[test]
    fn test_union_of_overlapping_squares() {
        let a = [rect(0.0, 0.0, 10.0, 10.0)];
        let b = [rect(5.0, 5.0, 15.0, 15.0)];
        let result = union(&a, &b, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert!((total_area(&result) - 175.0).abs() < 1e-6);
    }

    #[test]
    fn test_subtract_makes_hole() {
        let a = [rect(0.0, 0.0, 10.0, 10.0)];
        let b = [rect(4.0, 4.0, 6.0, 6.0)];
        let result = subtract(&a, &b, FillRule::NonZero).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].holes.len(), 1);
        assert_eq!(result[0].outer.winding(), Winding::CounterClockwise);
        assert_eq!(result[0].holes[0].winding(), Winding::Clockwise);
        assert!((result[0].area() - 96.0).abs() < 1e-6);
    }

    #[test]
    fn test_intersect_disjoint_is_empty() {
        let a = [rect(0.0, 0.0, 1.0, 1.0)];
        let b = [rect(2.0, 2.0, 3.0, 3.0)];
        assert!(intersect(&a, &b, FillRule::NonZero).unwrap().is_empty());
    }

    #[test]
    fn test_even_odd_self_overlap() {
        let loops = vec![
            rect(0.0, 0.0, 10.0, 10.0).outer.points,
            rect(2.0, 2.0, 8.0, 8.0).outer.points,
        ];
        let even_odd = polygons_from_loops(&loops, FillRule::EvenOdd).unwrap();
        assert!((total_area(&even_odd) - 64.0).abs() < 1e-6);
        let non_zero = polygons_from_loops(&loops, FillRule::NonZero).unwrap();
        assert!((total_area(&non_zero) - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_vertex_budget() {
        assert!(check_budget(MAX_OVERLAY_VERTICES).is_ok());
        assert_eq!(
            check_budget(MAX_OVERLAY_VERTICES + 1),
            Err(GeometryError::TooComplex {
                vertices: MAX_OVERLAY_VERTICES + 1,
                limit: MAX_OVERLAY_VERTICES,
            })
        );

        let loops = vec![vec![Point::new(0.0, 0.0); MAX_OVERLAY_VERTICES + 1]];
        let err = polygons_from_loops(&loops, FillRule::NonZero).unwrap_err();
        assert!(matches!(err, GeometryError::TooComplex { .. }));
    }
}
