//! Rings, polylines and polygons with holes
//!
//! A normalized [`Polygon`] has a counter-clockwise outer ring and clockwise
//! holes, each with at least three distinct vertices. Rings are stored open:
//! the closing edge from the last vertex back to the first is implicit.

use pcbmill_core::{GeometryError, EPSILON};
use serde::{Deserialize, Serialize};

use super::{BoundingBox, Point, Segment};

/// Rotational direction of a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Winding {
    CounterClockwise,
    Clockwise,
}

/// Result of a point containment query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Containment {
    Inside,
    Outside,
    /// Within [`EPSILON`] of an edge
    Boundary,
}

impl Containment {
    /// Inside or on the boundary
    pub fn is_covered(self) -> bool {
        !matches!(self, Containment::Outside)
    }
}

/// Shoelace area of a closed vertex loop; positive for counter-clockwise
pub fn signed_area(points: &[Point]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    let mut sum = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        sum += p.cross(q);
    }
    sum / 2.0
}

/// Drop repeated, collinear and spike vertices until the loop is stable
fn clean_loop(points: &[Point]) -> Vec<Point> {
    let mut pts: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        if pts.last().is_none_or(|last: &Point| !last.approx_eq(p)) {
            pts.push(p);
        }
    }
    while pts.len() > 1 && pts[0].approx_eq(pts[pts.len() - 1]) {
        pts.pop();
    }

    let mut changed = true;
    while changed && pts.len() >= 3 {
        changed = false;
        let mut i = 0;
        while i < pts.len() && pts.len() >= 3 {
            let n = pts.len();
            let a = pts[(i + n - 1) % n];
            let b = pts[i];
            let c = pts[(i + 1) % n];
            let base = c - a;
            let base_len = base.length();
            let degenerate = if base_len <= EPSILON {
                true
            } else {
                (b - a).cross(base).abs() / base_len <= EPSILON
            };
            if degenerate || b.approx_eq(c) {
                pts.remove(i);
                changed = true;
            } else {
                i += 1;
            }
        }
    }
    pts
}

/// Closed vertex loop
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Ring {
    pub points: Vec<Point>,
}

impl Ring {
    /// Wrap vertices as they are, without cleanup
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    /// Clean degenerate vertices; fails below three distinct vertices
    pub fn cleaned(points: &[Point]) -> Result<Self, GeometryError> {
        let pts = clean_loop(points);
        if pts.len() < 3 {
            return Err(GeometryError::Degenerate {
                vertices: pts.len(),
            });
        }
        Ok(Self { points: pts })
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn signed_area(&self) -> f64 {
        signed_area(&self.points)
    }

    pub fn winding(&self) -> Winding {
        if self.signed_area() >= 0.0 {
            Winding::CounterClockwise
        } else {
            Winding::Clockwise
        }
    }

    /// Reverse vertex order, keeping the first vertex in place
    pub fn reverse(&mut self) {
        if self.points.len() > 1 {
            self.points[1..].reverse();
        }
    }

    /// Ring with the requested winding
    pub fn oriented(mut self, winding: Winding) -> Self {
        if self.winding() != winding {
            self.reverse();
        }
        self
    }

    /// Edges including the closing edge
    pub fn edges(&self) -> impl Iterator<Item = Segment> + '_ {
        let n = self.points.len();
        (0..n).map(move |i| Segment::new(self.points[i], self.points[(i + 1) % n]))
    }

    /// Closed perimeter length
    pub fn perimeter(&self) -> f64 {
        self.edges().map(|e| e.length()).sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(self.points.iter().copied())
    }

    /// Distance from `p` to the nearest edge
    pub fn distance_to(&self, p: Point) -> f64 {
        self.edges()
            .map(|e| e.distance_to(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Ray-casting containment; points within [`EPSILON`] of an edge are on the boundary
    pub fn contains(&self, p: Point) -> Containment {
        if self.points.len() < 3 {
            return Containment::Outside;
        }
        if self.distance_to(p) <= EPSILON {
            return Containment::Boundary;
        }
        let mut inside = false;
        let n = self.points.len();
        let mut j = n - 1;
        for i in 0..n {
            let a = self.points[i];
            let b = self.points[j];
            if (a.y > p.y) != (b.y > p.y) {
                let x = a.x + (p.y - a.y) * (b.x - a.x) / (b.y - a.y);
                if p.x < x {
                    inside = !inside;
                }
            }
            j = i;
        }
        if inside {
            Containment::Inside
        } else {
            Containment::Outside
        }
    }

    /// Rotate the vertex order so `index` becomes the first vertex
    pub fn rotated_to(&self, index: usize) -> Ring {
        let mut points = self.points.clone();
        let n = points.len();
        if n > 0 {
            points.rotate_left(index % n);
        }
        Ring { points }
    }

    /// Vertices with the first repeated at the end
    pub fn closed_points(&self) -> Vec<Point> {
        let mut pts = self.points.clone();
        if let Some(&first) = pts.first() {
            pts.push(first);
        }
        pts
    }
}

/// Open ordered sequence of points
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Polyline {
    pub points: Vec<Point>,
}

impl Polyline {
    pub fn new(points: Vec<Point>) -> Self {
        Self { points }
    }

    pub fn start(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn end(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn length(&self) -> f64 {
        self.points.windows(2).map(|w| w[0].distance(w[1])).sum()
    }

    /// Start and end coincide within `tolerance`
    pub fn is_closed(&self, tolerance: f64) -> bool {
        match (self.start(), self.end()) {
            (Some(a), Some(b)) => self.points.len() > 2 && a.distance(b) <= tolerance,
            _ => false,
        }
    }
}

/// Outer ring plus holes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polygon {
    pub outer: Ring,
    pub holes: Vec<Ring>,
}

impl Polygon {
    /// Build a normalized polygon: cleaned rings, outer counter-clockwise, holes clockwise
    pub fn new(outer: Vec<Point>, holes: Vec<Vec<Point>>) -> Result<Self, GeometryError> {
        let outer = Ring::cleaned(&outer)?.oriented(Winding::CounterClockwise);
        let holes = holes
            .iter()
            .map(|h| Ring::cleaned(h).map(|r| r.oriented(Winding::Clockwise)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { outer, holes })
    }

    /// Polygon without holes
    pub fn simple(outer: Vec<Point>) -> Result<Self, GeometryError> {
        Self::new(outer, Vec::new())
    }

    /// Axis-aligned rectangle from two corners
    pub fn rectangle(min: Point, max: Point) -> Result<Self, GeometryError> {
        Self::simple(vec![
            min,
            Point::new(max.x, min.y),
            max,
            Point::new(min.x, max.y),
        ])
    }

    /// Outer ring followed by holes
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.outer).chain(self.holes.iter())
    }

    pub fn vertex_count(&self) -> usize {
        self.rings().map(Ring::len).sum()
    }

    /// Net signed area (outer minus holes for a normalized polygon)
    pub fn signed_area(&self) -> f64 {
        self.rings().map(Ring::signed_area).sum()
    }

    pub fn area(&self) -> f64 {
        self.signed_area().abs()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.outer.bounding_box()
    }

    /// Containment against the outer ring and every hole
    pub fn contains(&self, p: Point) -> Containment {
        match self.outer.contains(p) {
            Containment::Outside => Containment::Outside,
            Containment::Boundary => Containment::Boundary,
            Containment::Inside => {
                for hole in &self.holes {
                    match hole.contains(p) {
                        Containment::Inside => return Containment::Outside,
                        Containment::Boundary => return Containment::Boundary,
                        Containment::Outside => {}
                    }
                }
                Containment::Inside
            }
        }
    }

    /// Distance from `p` to the nearest boundary edge
    pub fn boundary_distance(&self, p: Point) -> f64 {
        self.rings()
            .map(|r| r.distance_to(p))
            .fold(f64::INFINITY, f64::min)
    }

    /// Apply `f` to every vertex; re-orients rings when `f` flips handedness
    pub fn map_points<F: Fn(Point) -> Point>(&self, f: F) -> Polygon {
        let map_ring = |ring: &Ring, winding: Winding| {
            Ring::new(ring.points.iter().map(|&p| f(p)).collect()).oriented(winding)
        };
        Polygon {
            outer: map_ring(&self.outer, Winding::CounterClockwise),
            holes: self
                .holes
                .iter()
                .map(|h| map_ring(h, Winding::Clockwise))
                .collect(),
        }
    }

    pub fn translated(&self, offset: Point) -> Polygon {
        self.map_points(|p| p + offset)
    }
}

/// Point containment in a polygon set; the first non-outside answer wins
pub fn point_in_polygon(polygons: &[Polygon], p: Point) -> Containment {
    let mut result = Containment::Outside;
    for poly in polygons {
        match poly.contains(p) {
            Containment::Inside => return Containment::Inside,
            Containment::Boundary => result = Containment::Boundary,
            Containment::Outside => {}
        }
    }
    result
}

/// Bounding box of a polygon set
pub fn bounding_box(polygons: &[Polygon]) -> BoundingBox {
    polygons
        .iter()
        .fold(BoundingBox::empty(), |acc, p| acc.union(&p.bounding_box()))
}

/// Total area of a polygon set
pub fn total_area(polygons: &[Polygon]) -> f64 {
    polygons.iter().map(Polygon::area).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(size: f64) -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(size, 0.0),
            Point::new(size, size),
            Point::new(0.0, size),
        ]
    }

    #[test]
    fn test_normalization_orients_rings() {
        let mut outer = square(10.0);
        outer.reverse();
        let hole = vec![
            Point::new(2.0, 2.0),
            Point::new(4.0, 2.0),
            Point::new(4.0, 4.0),
            Point::new(2.0, 4.0),
        ];
        let poly = Polygon::new(outer, vec![hole]).unwrap();
        assert_eq!(poly.outer.winding(), Winding::CounterClockwise);
        assert_eq!(poly.holes[0].winding(), Winding::Clockwise);
        assert!((poly.area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_degenerate_ring_rejected() {
        let err = Polygon::simple(vec![
            Point::new(0.0, 0.0),
            Point::new(1.0, 0.0),
            Point::new(2.0, 0.0),
            Point::new(1.0, 0.0),
        ])
        .unwrap_err();
        assert!(matches!(err, GeometryError::Degenerate { .. }));
    }

    #[test]
    fn test_cleanup_drops_duplicates_and_collinear() {
        let ring = Ring::cleaned(&[
            Point::new(0.0, 0.0),
            Point::new(0.0, 0.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ])
        .unwrap();
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn test_containment() {
        let poly = Polygon::new(
            square(10.0),
            vec![vec![
                Point::new(4.0, 4.0),
                Point::new(6.0, 4.0),
                Point::new(6.0, 6.0),
                Point::new(4.0, 6.0),
            ]],
        )
        .unwrap();
        assert_eq!(poly.contains(Point::new(1.0, 1.0)), Containment::Inside);
        assert_eq!(poly.contains(Point::new(5.0, 5.0)), Containment::Outside);
        assert_eq!(poly.contains(Point::new(10.0, 5.0)), Containment::Boundary);
        assert_eq!(poly.contains(Point::new(4.0, 5.0)), Containment::Boundary);
        assert_eq!(poly.contains(Point::new(11.0, 5.0)), Containment::Outside);
    }

    #[test]
    fn test_reverse_keeps_first_vertex() {
        let mut ring = Ring::new(square(1.0));
        ring.reverse();
        assert_eq!(ring.points[0], Point::new(0.0, 0.0));
        assert_eq!(ring.points[1], Point::new(0.0, 1.0));
        assert_eq!(ring.winding(), Winding::Clockwise);
    }

    #[test]
    fn test_rotated_to_wraps_index() {
        let ring = Ring::new(square(2.0));
        let rotated = ring.rotated_to(6);
        assert_eq!(rotated.points[0], Point::new(2.0, 2.0));
        assert_eq!(rotated.points.len(), 4);
        let closed = rotated.closed_points();
        assert_eq!(closed.first(), closed.last());
        assert!(Ring::new(Vec::new()).rotated_to(3).points.is_empty());
    }
}
