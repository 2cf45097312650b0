//! Arc Expander
//!
//! Converts arcs and circles to line segments with a bounded chord error.
//! Copper outlines use the circumscribed variants so the flattened shape
//! always covers the true curve.

use std::f64::consts::PI;

use crate::geometry::{Arc, Point};

/// Default maximum deviation between a curve and its flattening (mm)
pub const ARC_TOLERANCE: f64 = 0.002;

/// Arc expansion configuration
#[derive(Debug, Clone)]
pub struct ArcExpanderConfig {
    /// Maximum distance between the curve and a segment
    pub tolerance: f64,
    /// Minimum number of segments for a full circle
    pub min_circle_segments: usize,
    /// Upper bound on segments for any single curve
    pub max_segments: usize,
}

impl Default for ArcExpanderConfig {
    fn default() -> Self {
        Self {
            tolerance: ARC_TOLERANCE,
            min_circle_segments: 8,
            max_segments: 1024,
        }
    }
}

/// Converts arcs and circles to line segments
#[derive(Debug, Clone)]
pub struct ArcExpander {
    config: ArcExpanderConfig,
}

impl ArcExpander {
    /// Create a new arc expander
    pub fn new(config: ArcExpanderConfig) -> Self {
        Self { config }
    }

    /// Largest angular step with chord (sagitta) error within tolerance
    fn chord_step(&self, radius: f64) -> f64 {
        if radius <= self.config.tolerance {
            return PI / 2.0;
        }
        (2.0 * (1.0 - self.config.tolerance / radius).acos()).min(PI / 2.0)
    }

    /// Largest angular step whose tangent polygon stays within tolerance
    fn tangent_step(&self, radius: f64) -> f64 {
        if radius <= 0.0 {
            return PI / 2.0;
        }
        (2.0 * (radius / (radius + self.config.tolerance)).acos()).min(PI / 2.0)
    }

    fn segments_for(&self, sweep: f64, step: f64) -> usize {
        ((sweep.abs() / step).ceil() as usize).clamp(1, self.config.max_segments)
    }

    /// Expand an arc into chords; returns every vertex after the start, ending exactly at `arc.end`
    pub fn expand_arc(&self, arc: &Arc) -> Vec<Point> {
        let radius = arc.radius();
        let sweep = arc.sweep();
        let start_angle = (arc.start - arc.center).angle();
        let n = self.segments_for(sweep, self.chord_step(radius));

        let mut points = Vec::with_capacity(n);
        for i in 1..n {
            let fraction = i as f64 / n as f64;
            points.push(Point::polar(arc.center, radius, start_angle + sweep * fraction));
        }
        points.push(arc.end);
        points
    }

    /// Expand an arc into tangent segments lying on or outside the circle
    ///
    /// Includes the start point. Intermediate vertices sit at `r / cos(step / 2)`
    /// at half-step angles, so every segment touches the circle.
    pub fn expand_arc_outside(&self, arc: &Arc) -> Vec<Point> {
        let radius = arc.radius();
        let sweep = arc.sweep();
        let start_angle = (arc.start - arc.center).angle();
        let n = self.segments_for(sweep, self.tangent_step(radius));
        let step = sweep / n as f64;
        let outer = radius / (step / 2.0).cos();

        let mut points = Vec::with_capacity(n + 2);
        points.push(arc.start);
        for i in 0..n {
            let angle = start_angle + step * (i as f64 + 0.5);
            points.push(Point::polar(arc.center, outer, angle));
        }
        points.push(arc.end);
        points
    }

    fn circle_segments(&self, step: f64) -> usize {
        let n = ((2.0 * PI / step).ceil() as usize)
            .clamp(self.config.min_circle_segments, self.config.max_segments);
        n.div_ceil(4) * 4
    }

    /// Counter-clockwise polygon circumscribing a circle
    ///
    /// The vertex count is a multiple of four and edges are tangent at the
    /// axis points, so the polygon's bounding box equals the circle's.
    pub fn circle(&self, center: Point, radius: f64) -> Vec<Point> {
        let n = self.circle_segments(self.tangent_step(radius));
        let step = 2.0 * PI / n as f64;
        let outer = radius / (step / 2.0).cos();
        (0..n)
            .map(|i| Point::polar(center, outer, step * (i as f64 + 0.5)))
            .collect()
    }

    /// Counter-clockwise polygon inscribed in a circle (vertices on the circle)
    pub fn inscribed_circle(&self, center: Point, radius: f64) -> Vec<Point> {
        let n = self.circle_segments(self.chord_step(radius));
        let step = 2.0 * PI / n as f64;
        (0..n)
            .map(|i| Point::polar(center, radius, step * i as f64))
            .collect()
    }
}

impl Default for ArcExpander {
    fn default() -> Self {
        Self::new(ArcExpanderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ArcDirection;

    #[test]
    fn test_quarter_arc_within_tolerance() {
        let arc = Arc::new(
            Point::new(10.0, 0.0),
            Point::new(0.0, 10.0),
            Point::origin(),
            ArcDirection::CounterClockwise,
        );
        let expander = ArcExpander::default();
        let points = expander.expand_arc(&arc);
        assert_eq!(*points.last().unwrap(), Point::new(0.0, 10.0));

        let mut prev = arc.start;
        for p in &points {
            assert!((p.length() - 10.0).abs() < 1e-9);
            let mid = (prev + *p) * 0.5;
            assert!(10.0 - mid.length() <= ARC_TOLERANCE + 1e-9);
            prev = *p;
        }
    }

    #[test]
    fn test_clockwise_arc_goes_the_short_way() {
        let arc = Arc::new(
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
            Point::origin(),
            ArcDirection::Clockwise,
        );
        let points = ArcExpander::default().expand_arc(&arc);
        assert!(points.iter().all(|p| p.x >= -1e-9 && p.y >= -1e-9));
    }

    #[test]
    fn test_circle_extents_are_exact() {
        let poly = ArcExpander::default().circle(Point::new(1.0, 1.0), 0.5);
        assert_eq!(poly.len() % 4, 0);
        let max_x = poly.iter().map(|p| p.x).fold(f64::MIN, f64::max);
        let min_y = poly.iter().map(|p| p.y).fold(f64::MAX, f64::min);
        assert!(max_x >= 1.5 - 1e-12);
        assert!(max_x - 1.5 <= ARC_TOLERANCE);
        assert!(min_y <= 0.5 + 1e-12);
    }

    #[test]
    fn test_outside_arc_never_undercuts() {
        let arc = Arc::new(
            Point::new(2.0, 0.0),
            Point::new(-2.0, 0.0),
            Point::origin(),
            ArcDirection::CounterClockwise,
        );
        let points = ArcExpander::default().expand_arc_outside(&arc);
        for pair in points.windows(2) {
            let mid = (pair[0] + pair[1]) * 0.5;
            assert!(mid.length() >= 2.0 - 1e-9);
        }
    }
}
