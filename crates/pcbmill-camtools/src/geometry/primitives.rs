//! Segments, arcs and the boundary elements built from them

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::Point;
use crate::arc_expander::ArcExpander;

/// Direction of travel around an arc center
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArcDirection {
    Clockwise,
    CounterClockwise,
}

impl ArcDirection {
    /// The opposite direction, as produced by a mirror
    pub fn reversed(self) -> Self {
        match self {
            Self::Clockwise => Self::CounterClockwise,
            Self::CounterClockwise => Self::Clockwise,
        }
    }
}

/// Directed straight segment
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: Point,
    pub end: Point,
}

impl Segment {
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    pub fn length(&self) -> f64 {
        self.start.distance(self.end)
    }

    /// Distance from `p` to the closest point of the segment
    pub fn distance_to(&self, p: Point) -> f64 {
        self.closest_point(p).distance(p)
    }

    /// Closest point of the segment to `p`
    pub fn closest_point(&self, p: Point) -> Point {
        let d = self.end - self.start;
        let len_sq = d.dot(d);
        if len_sq <= f64::EPSILON {
            return self.start;
        }
        let t = ((p - self.start).dot(d) / len_sq).clamp(0.0, 1.0);
        self.start + d * t
    }
}

/// Directed circular arc
///
/// An arc whose start and end coincide is a full circle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arc {
    pub start: Point,
    pub end: Point,
    pub center: Point,
    pub direction: ArcDirection,
}

impl Arc {
    pub fn new(start: Point, end: Point, center: Point, direction: ArcDirection) -> Self {
        Self {
            start,
            end,
            center,
            direction,
        }
    }

    /// Radius measured at the start point
    pub fn radius(&self) -> f64 {
        self.start.distance(self.center)
    }

    pub fn is_full_circle(&self) -> bool {
        self.start.approx_eq(self.end)
    }

    /// Signed swept angle: positive counter-clockwise, magnitude in (0, 2π]
    pub fn sweep(&self) -> f64 {
        let full = 2.0 * PI;
        if self.is_full_circle() {
            return match self.direction {
                ArcDirection::CounterClockwise => full,
                ArcDirection::Clockwise => -full,
            };
        }
        let mut delta = (self.end - self.center).angle() - (self.start - self.center).angle();
        match self.direction {
            ArcDirection::CounterClockwise if delta <= 0.0 => delta += full,
            ArcDirection::Clockwise if delta >= 0.0 => delta -= full,
            _ => {}
        }
        delta
    }

    /// Arc length
    pub fn length(&self) -> f64 {
        self.radius() * self.sweep().abs()
    }

    /// Vertices after the start, chord error within the default tolerance
    pub fn flatten(&self) -> Vec<Point> {
        ArcExpander::default().expand_arc(self)
    }

    /// The same arc traversed backwards
    pub fn reversed(&self) -> Arc {
        Arc::new(self.end, self.start, self.center, self.direction.reversed())
    }
}

/// A piece of a region or outline boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum BoundaryElement {
    Segment(Segment),
    Arc(Arc),
}

impl BoundaryElement {
    pub fn start(&self) -> Point {
        match self {
            Self::Segment(s) => s.start,
            Self::Arc(a) => a.start,
        }
    }

    pub fn end(&self) -> Point {
        match self {
            Self::Segment(s) => s.end,
            Self::Arc(a) => a.end,
        }
    }

    /// The element traversed backwards
    pub fn reversed(&self) -> BoundaryElement {
        match self {
            Self::Segment(s) => Self::Segment(Segment::new(s.end, s.start)),
            Self::Arc(a) => Self::Arc(a.reversed()),
        }
    }
}

/// Flatten a chain of boundary elements into vertices, starting at the first element's start
pub fn flatten_elements(elements: &[BoundaryElement]) -> Vec<Point> {
    let mut points = Vec::new();
    let Some(first) = elements.first() else {
        return points;
    };
    points.push(first.start());
    for element in elements {
        match element {
            BoundaryElement::Segment(s) => points.push(s.end),
            BoundaryElement::Arc(a) => points.extend(a.flatten()),
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_directions() {
        let ccw = Arc::new(
            Point::new(1.0, 0.0),
            Point::new(0.0, 1.0),
            Point::origin(),
            ArcDirection::CounterClockwise,
        );
        assert!((ccw.sweep() - PI / 2.0).abs() < 1e-12);

        let cw = Arc::new(ccw.start, ccw.end, ccw.center, ArcDirection::Clockwise);
        assert!((cw.sweep() + 3.0 * PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_full_circle_sweep() {
        let p = Point::new(2.0, 0.0);
        let arc = Arc::new(p, p, Point::origin(), ArcDirection::Clockwise);
        assert!(arc.is_full_circle());
        assert_eq!(arc.sweep(), -2.0 * PI);
        assert!((arc.length() - 4.0 * PI).abs() < 1e-12);
    }

    #[test]
    fn test_segment_distance() {
        let s = Segment::new(Point::origin(), Point::new(10.0, 0.0));
        assert_eq!(s.distance_to(Point::new(5.0, 3.0)), 3.0);
        assert_eq!(s.distance_to(Point::new(-4.0, 3.0)), 5.0);
    }

    #[test]
    fn test_flatten_elements_chain() {
        let elements = [
            BoundaryElement::Segment(Segment::new(Point::origin(), Point::new(1.0, 0.0))),
            BoundaryElement::Arc(Arc::new(
                Point::new(1.0, 0.0),
                Point::new(0.0, 1.0),
                Point::origin(),
                ArcDirection::CounterClockwise,
            )),
        ];
        let points = flatten_elements(&elements);
        assert_eq!(points[0], Point::origin());
        assert_eq!(points[1], Point::new(1.0, 0.0));
        assert_eq!(*points.last().unwrap(), Point::new(0.0, 1.0));
    }
}
