//! Polygon offsetting
//!
//! Offsets are built as a Minkowski band: a rectangle of half-width `|d|`
//! along every edge plus a join piece at every vertex where the offset
//! boundary wraps around a corner. Growing unions the band onto the
//! polygon, shrinking subtracts it. Material is always on the left of a
//! normalized ring, so the outward normal of an edge is its right normal.

use pcbmill_core::{GeometryError, EPSILON};
use serde::{Deserialize, Serialize};

use super::boolean::{subtract, union, FillRule};
use super::{signed_area, Point, Polygon, Ring};
use crate::arc_expander::ArcExpander;

/// Corner treatment of an offset boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum JoinStyle {
    /// Circular arc around the corner
    Round,
    /// Sharp corner; beveled when the miter exceeds `limit` times the distance
    Miter { limit: f64 },
}

impl Default for JoinStyle {
    fn default() -> Self {
        Self::Round
    }
}

fn ccw(mut points: Vec<Point>) -> Vec<Point> {
    if signed_area(&points) < 0.0 {
        points.reverse();
    }
    points
}

fn band_piece(points: Vec<Point>) -> Option<Polygon> {
    Polygon::simple(ccw(points)).ok()
}

/// Pieces covering every point within `dist` of the ring on the side given by `outward`
fn ring_band(
    ring: &Ring,
    dist: f64,
    outward: bool,
    join: JoinStyle,
    expander: &ArcExpander,
    pieces: &mut Vec<Polygon>,
) {
    let pts = &ring.points;
    let n = pts.len();
    if n < 2 {
        return;
    }

    for i in 0..n {
        let a = pts[i];
        let b = pts[(i + 1) % n];
        let dir = (b - a).normalized();
        if dir.length() == 0.0 {
            continue;
        }
        let normal = dir.perp() * dist;
        if let Some(piece) = band_piece(vec![a - normal, b - normal, b + normal, a + normal]) {
            pieces.push(piece);
        }
    }

    for i in 0..n {
        let prev = pts[(i + n - 1) % n];
        let v = pts[i];
        let next = pts[(i + 1) % n];
        let d1 = (v - prev).normalized();
        let d2 = (next - v).normalized();
        let turn = d1.cross(d2);

        // Left turns leave a gap on the outside, right turns on the inside.
        let gap_outside = turn > EPSILON;
        let gap_inside = turn < -EPSILON;
        if (outward && !gap_outside) || (!outward && !gap_inside) {
            continue;
        }

        match join {
            JoinStyle::Round => {
                if let Some(piece) = band_piece(expander.circle(v, dist)) {
                    pieces.push(piece);
                }
            }
            JoinStyle::Miter { limit } => {
                // Right normals point outward, left normals inward.
                let (n1, n2) = if outward {
                    (-d1.perp(), -d2.perp())
                } else {
                    (d1.perp(), d2.perp())
                };
                let p1 = v + n1 * dist;
                let p2 = v + n2 * dist;
                let cos_theta = n1.dot(n2);
                let miter_ratio = (2.0 / (1.0 + cos_theta)).sqrt();
                let points = if 1.0 + cos_theta > EPSILON && miter_ratio <= limit {
                    let apex = v + (n1 + n2) * (dist / (1.0 + cos_theta));
                    vec![v, p1, apex, p2]
                } else {
                    vec![v, p1, p2]
                };
                if let Some(piece) = band_piece(points) {
                    pieces.push(piece);
                }
            }
        }
    }
}

fn band(polygons: &[Polygon], dist: f64, outward: bool, join: JoinStyle) -> Vec<Polygon> {
    let expander = ArcExpander::default();
    let mut pieces = Vec::new();
    for poly in polygons {
        for ring in poly.rings() {
            ring_band(ring, dist, outward, join, &expander, &mut pieces);
        }
    }
    pieces
}

fn check_distance(distance: f64) -> Result<(), GeometryError> {
    if !distance.is_finite() {
        return Err(GeometryError::InvalidParameter {
            name: "distance".to_string(),
            reason: "must be finite".to_string(),
        });
    }
    Ok(())
}

/// Offset one polygon; positive distances grow it
///
/// Shrinking can split the polygon into several pieces or remove it
/// entirely, in which case the result is empty.
pub fn offset(
    polygon: &Polygon,
    distance: f64,
    join: JoinStyle,
) -> Result<Vec<Polygon>, GeometryError> {
    offset_all(std::slice::from_ref(polygon), distance, join)
}

/// Offset a polygon set; grown results are merged where they meet
pub fn offset_all(
    polygons: &[Polygon],
    distance: f64,
    join: JoinStyle,
) -> Result<Vec<Polygon>, GeometryError> {
    check_distance(distance)?;
    if polygons.is_empty() {
        return Ok(Vec::new());
    }
    if distance.abs() <= EPSILON {
        return Ok(polygons.to_vec());
    }

    if distance > 0.0 {
        let pieces = band(polygons, distance, true, join);
        union(polygons, &pieces, FillRule::NonZero)
    } else {
        let mut result = Vec::new();
        for poly in polygons {
            let pieces = band(std::slice::from_ref(poly), -distance, false, join);
            result.extend(subtract(std::slice::from_ref(poly), &pieces, FillRule::NonZero)?);
        }
        Ok(result)
    }
}
