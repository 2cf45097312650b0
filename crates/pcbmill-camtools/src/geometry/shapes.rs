//! Shape builders for apertures and strokes
//!
//! Curved outlines use circumscribed flattening so a built shape always
//! covers the ideal one.

use pcbmill_core::{GeometryError, EPSILON};

use super::{Arc, Point, Polygon};
use crate::arc_expander::ArcExpander;

/// Counter-clockwise polygon covering a circle of `diameter` at `center`
pub fn circle(center: Point, diameter: f64) -> Vec<Point> {
    ArcExpander::default().circle(center, diameter / 2.0)
}

/// Axis-aligned rectangle centered on `center`
pub fn rectangle(center: Point, width: f64, height: f64) -> Vec<Point> {
    let hw = width / 2.0;
    let hh = height / 2.0;
    vec![
        Point::new(center.x - hw, center.y - hh),
        Point::new(center.x + hw, center.y - hh),
        Point::new(center.x + hw, center.y + hh),
        Point::new(center.x - hw, center.y + hh),
    ]
}

/// Stadium shape; the shorter side is fully rounded
pub fn obround(center: Point, width: f64, height: f64) -> Vec<Point> {
    if (width - height).abs() <= EPSILON {
        return circle(center, width);
    }
    let (c1, c2, d) = if width > height {
        let off = (width - height) / 2.0;
        (
            Point::new(center.x - off, center.y),
            Point::new(center.x + off, center.y),
            height,
        )
    } else {
        let off = (height - width) / 2.0;
        (
            Point::new(center.x, center.y - off),
            Point::new(center.x, center.y + off),
            width,
        )
    };
    let mut points = circle(c1, d);
    points.extend(circle(c2, d));
    convex_hull(&points)
}

/// Regular polygon with its first vertex at `rotation_deg`
pub fn regular_polygon(
    center: Point,
    outer_diameter: f64,
    vertices: u32,
    rotation_deg: f64,
) -> Vec<Point> {
    let r = outer_diameter / 2.0;
    let start = rotation_deg.to_radians();
    let step = 2.0 * std::f64::consts::PI / vertices.max(3) as f64;
    (0..vertices.max(3))
        .map(|i| Point::polar(center, r, start + step * i as f64))
        .collect()
}

/// Rotate points about the origin by `degrees`
pub fn rotate_points(points: &[Point], degrees: f64) -> Vec<Point> {
    if degrees.abs() <= f64::EPSILON {
        return points.to_vec();
    }
    let angle = degrees.to_radians();
    points.iter().map(|p| p.rotate(angle)).collect()
}

/// Convex hull (monotone chain), counter-clockwise without collinear points
pub fn convex_hull(points: &[Point]) -> Vec<Point> {
    let mut pts = points.to_vec();
    pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
    pts.dedup_by(|a, b| a.approx_eq(*b));
    if pts.len() < 3 {
        return pts;
    }

    let mut lower: Vec<Point> = Vec::new();
    for &p in &pts {
        while lower.len() >= 2
            && (lower[lower.len() - 1] - lower[lower.len() - 2]).cross(p - lower[lower.len() - 2])
                <= 0.0
        {
            lower.pop();
        }
        lower.push(p);
    }
    let mut upper: Vec<Point> = Vec::new();
    for &p in pts.iter().rev() {
        while upper.len() >= 2
            && (upper[upper.len() - 1] - upper[upper.len() - 2]).cross(p - upper[upper.len() - 2])
                <= 0.0
        {
            upper.pop();
        }
        upper.push(p);
    }
    lower.pop();
    upper.pop();
    lower.extend(upper);
    lower
}

/// Area swept by a convex shape (given relative to its origin) moved from `from` to `to`
pub fn stroke(shape: &[Point], from: Point, to: Point) -> Vec<Point> {
    let mut points: Vec<Point> = shape.iter().map(|&p| p + from).collect();
    if !from.approx_eq(to) {
        points.extend(shape.iter().map(|&p| p + to));
    }
    convex_hull(&points)
}

/// Area swept by a round aperture of `width` along an arc
///
/// An annular sector closed by round caps at both ends; a full circle
/// gives an annulus.
pub fn arc_stroke(arc: &Arc, width: f64) -> Result<Vec<Polygon>, GeometryError> {
    let expander = ArcExpander::default();
    let radius = arc.radius();
    let half = width / 2.0;
    let outer_r = radius + half;
    let inner_r = radius - half;

    if arc.is_full_circle() {
        let outer = expander.circle(arc.center, outer_r);
        let holes = if inner_r > EPSILON {
            vec![expander.inscribed_circle(arc.center, inner_r)]
        } else {
            Vec::new()
        };
        return Ok(vec![Polygon::new(outer, holes)?]);
    }

    let scale = |p: Point, r: f64| arc.center + (p - arc.center).normalized() * r;
    let outer_arc = Arc::new(
        scale(arc.start, outer_r),
        scale(arc.end, outer_r),
        arc.center,
        arc.direction,
    );
    let mut points = expander.expand_arc_outside(&outer_arc);
    if inner_r > EPSILON {
        let inner_arc = Arc::new(
            scale(arc.end, inner_r),
            scale(arc.start, inner_r),
            arc.center,
            arc.direction.reversed(),
        );
        points.push(inner_arc.start);
        points.extend(expander.expand_arc(&inner_arc));
    } else {
        points.push(arc.center);
    }

    Ok(vec![
        Polygon::simple(points)?,
        Polygon::simple(circle(arc.start, width))?,
        Polygon::simple(circle(arc.end, width))?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{signed_area, ArcDirection, Containment};

    #[test]
    fn test_hull_drops_interior_points() {
        let hull = convex_hull(&[
            Point::new(0.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 1.0),
            Point::new(2.0, 2.0),
            Point::new(0.0, 2.0),
        ]);
        assert_eq!(hull.len(), 4);
        assert!(signed_area(&hull) > 0.0);
    }

    #[test]
    fn test_stroke_of_square_aperture() {
        let shape = rectangle(Point::origin(), 1.0, 1.0);
        let swept = stroke(&shape, Point::new(0.0, 0.0), Point::new(10.0, 0.0));
        assert!((signed_area(&swept) - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_obround_area_between_bounds() {
        let shape = obround(Point::origin(), 4.0, 2.0);
        let area = signed_area(&shape);
        let ideal = 2.0 * 2.0 + std::f64::consts::PI;
        assert!(area >= ideal - 1e-9);
        assert!(area < ideal + 0.05);
    }

    #[test]
    fn test_arc_stroke_covers_centerline() {
        let arc = Arc::new(
            Point::new(5.0, 0.0),
            Point::new(0.0, 5.0),
            Point::origin(),
            ArcDirection::CounterClockwise,
        );
        let pieces = arc_stroke(&arc, 1.0).unwrap();
        let mid = Point::polar(Point::origin(), 5.0, std::f64::consts::FRAC_PI_4);
        assert!(pieces.iter().any(|p| p.contains(mid) == Containment::Inside));
        let outside = Point::polar(Point::origin(), 6.0, std::f64::consts::FRAC_PI_4);
        assert!(pieces.iter().all(|p| p.contains(outside) == Containment::Outside));
    }

    #[test]
    fn test_full_circle_stroke_is_annulus() {
        let p = Point::new(3.0, 0.0);
        let arc = Arc::new(p, p, Point::origin(), ArcDirection::Clockwise);
        let pieces = arc_stroke(&arc, 0.5).unwrap();
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].holes.len(), 1);
        assert_eq!(pieces[0].contains(Point::origin()), Containment::Outside);
    }
}
