//! Board outline cutting with depth passes and holding tabs

use serde::{Deserialize, Serialize};

use pcbmill_core::PlanningError;

use super::{ToolpathMove, ToolpathSection};
use crate::board::Layer;
use crate::geometry::{offset_all, JoinStyle, Point, Ring, EPSILON};

/// Side of the outline the tool center follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CutSide {
    #[default]
    Inside,
    Outside,
}

/// Holding tabs left standing on the deepest passes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabPlacement {
    /// Requested tab centers; each is projected onto the nearest loop
    pub positions: Vec<Point>,
    /// Length of material left along the cut (mm)
    pub width: f64,
    /// Tab height above the final depth (mm)
    pub height: f64,
}

/// Parameters for outline cutting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineParameters {
    /// Final depth (negative, mm)
    pub depth: f64,
    /// Maximum depth of one pass (mm)
    pub depth_per_pass: f64,
    pub side: CutSide,
    /// Height for travel between loops (mm)
    pub safe_z: f64,
    pub join: JoinStyle,
    pub tabs: Option<TabPlacement>,
}

impl Default for OutlineParameters {
    fn default() -> Self {
        Self {
            depth: -1.6,
            depth_per_pass: 0.6,
            side: CutSide::Inside,
            safe_z: 2.0,
            join: JoinStyle::Round,
            tabs: None,
        }
    }
}

/// Z of each pass, shallowest first, ending exactly at `depth`
pub fn depth_levels(depth: f64, per_pass: f64) -> Vec<f64> {
    let total = depth.abs();
    if total <= EPSILON {
        return vec![depth];
    }
    let step = if per_pass > EPSILON { per_pass } else { total };
    let passes = (total / step - EPSILON).ceil().max(1.0) as usize;
    (1..=passes)
        .map(|k| {
            let z = -(k as f64 * step);
            if k == passes {
                depth
            } else {
                z.max(depth)
            }
        })
        .collect()
}

/// Tool center loops around the board outline
pub fn outline_rings(
    layer: &Layer,
    tool_radius: f64,
    params: &OutlineParameters,
) -> Result<Vec<Ring>, PlanningError> {
    let distance = match params.side {
        CutSide::Inside => -tool_radius,
        CutSide::Outside => tool_radius,
    };
    let offset = offset_all(&layer.polygons, distance, params.join)?;
    let rings: Vec<Ring> = offset
        .into_iter()
        .flat_map(|p| {
            let mut all = vec![p.outer];
            all.extend(p.holes);
            all
        })
        .collect();
    if rings.is_empty() {
        return Err(PlanningError::OutlineTooSmall {
            tool_diameter: tool_radius * 2.0,
        });
    }
    Ok(rings)
}

/// Arc-length position of the point of the closed loop `points` closest to
/// `p`, measured from its first vertex
pub fn project_onto(points: &[Point], p: Point) -> f64 {
    let mut best = (f64::INFINITY, 0.0);
    let mut travelled = 0.0;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = a.distance(b);
        let t = if length > EPSILON {
            ((p - a).dot(b - a) / (length * length)).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let closest = a + (b - a) * t;
        let d = closest.distance(p);
        if d < best.0 - EPSILON {
            best = (d, travelled + t * length);
        }
        travelled += length;
    }
    best.1
}

/// A lifted stretch of a loop, as center and half length along the path
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabSpan {
    pub center: f64,
    pub half: f64,
}

fn in_span(s: f64, span: &TabSpan, perimeter: f64) -> bool {
    let d = (s - span.center).rem_euclid(perimeter);
    d.min(perimeter - d) <= span.half
}

fn perimeter(points: &[Point]) -> f64 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

fn lifting(z: f64, spans: &[TabSpan], tab_top: f64) -> bool {
    !spans.is_empty() && z < tab_top - EPSILON
}

/// Arc-length position to enter the closed loop `points` at: its first
/// vertex when that is clear of every span, otherwise the position farthest
/// outside them. `None` when the spans cover the whole loop.
pub fn clear_entry(points: &[Point], spans: &[TabSpan]) -> Option<f64> {
    let perimeter = perimeter(points);
    if !spans.iter().any(|s| in_span(0.0, s, perimeter)) {
        return Some(0.0);
    }
    let mut centers: Vec<f64> = spans
        .iter()
        .map(|s| s.center.rem_euclid(perimeter))
        .collect();
    centers.sort_by(f64::total_cmp);

    let clearance = |s: f64| {
        spans
            .iter()
            .map(|span| {
                let d = (s - span.center).rem_euclid(perimeter);
                d.min(perimeter - d) - span.half
            })
            .fold(f64::INFINITY, f64::min)
    };
    let (best, room) = centers
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let next = if i + 1 < centers.len() {
                centers[i + 1]
            } else {
                centers[0] + perimeter
            };
            let mid = ((c + next) / 2.0).rem_euclid(perimeter);
            (mid, clearance(mid))
        })
        .max_by(|a, b| a.1.total_cmp(&b.1))?;
    (room > EPSILON).then_some(best)
}

/// The closed loop `points` restarted at arc-length position `s`, with a
/// vertex inserted there when it falls inside an edge
pub fn entered_at(points: &[Point], s: f64) -> Vec<Point> {
    let open = &points[..points.len().saturating_sub(1)];
    let mut travelled = 0.0;
    for (i, pair) in points.windows(2).enumerate() {
        let (a, b) = (pair[0], pair[1]);
        let length = a.distance(b);
        if s < travelled + length - EPSILON || i + 2 == points.len() {
            let t = if length > EPSILON {
                ((s - travelled) / length).clamp(0.0, 1.0)
            } else {
                0.0
            };
            let start = a + (b - a) * t;
            let mut loop_points = vec![start];
            let after = if start.approx_eq(b) { i + 2 } else { i + 1 };
            loop_points.extend(open.iter().cycle().skip(after).take(open.len()));
            loop_points.dedup_by(|x, y| x.approx_eq(*y));
            if loop_points.last().is_some_and(|p| p.approx_eq(start)) {
                loop_points.pop();
            }
            loop_points.push(start);
            return loop_points;
        }
        travelled += length;
    }
    points.to_vec()
}

/// Depth at the first vertex of `points` for a pass at `z`: `tab_top` when
/// that vertex sits on a tab still standing at `z`
pub fn entry_depth(points: &[Point], z: f64, spans: &[TabSpan], tab_top: f64) -> f64 {
    if !lifting(z, spans, tab_top) {
        return z;
    }
    let perimeter = perimeter(points);
    if spans.iter().any(|s| in_span(0.0, s, perimeter)) {
        tab_top
    } else {
        z
    }
}

/// Cut one closed loop (`points` ends where it starts) at depth `z`, lifting
/// to `tab_top` over the tab spans while `z` is below it
///
/// The tool is expected at [`entry_depth`] over the first vertex and is left
/// there again; the returned value is that depth.
pub fn cut_level(
    section: &mut ToolpathSection,
    points: &[Point],
    z: f64,
    spans: &[TabSpan],
    tab_top: f64,
) -> f64 {
    let feed = section.tool.feed_rate;
    if !lifting(z, spans, tab_top) {
        section.cut_through(&points[1..], z);
        return z;
    }

    let perimeter = perimeter(points);
    let mut boundaries: Vec<f64> = spans
        .iter()
        .flat_map(|s| {
            [
                (s.center - s.half).rem_euclid(perimeter),
                (s.center + s.half).rem_euclid(perimeter),
            ]
        })
        .collect();
    boundaries.sort_by(f64::total_cmp);

    let mut current_z = entry_depth(points, z, spans, tab_top);
    let mut position = points[0];
    let mut travelled = 0.0;
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        let length = a.distance(b);
        if length <= EPSILON {
            continue;
        }
        let (s0, s1) = (travelled, travelled + length);
        let mut cuts: Vec<f64> = boundaries
            .iter()
            .copied()
            .filter(|&s| s > s0 + EPSILON && s < s1 - EPSILON)
            .collect();
        cuts.push(s1);

        let mut from = s0;
        for to in cuts {
            let mid = (from + to) / 2.0;
            let piece_z = if spans.iter().any(|s| in_span(mid, s, perimeter)) {
                tab_top
            } else {
                z
            };
            if (piece_z - current_z).abs() > EPSILON {
                section.push(ToolpathMove::Linear {
                    to: position,
                    z: piece_z,
                    feed,
                });
                current_z = piece_z;
            }
            position = a + (b - a) * ((to - s0) / length);
            section.push(ToolpathMove::Linear {
                to: position,
                z: piece_z,
                feed,
            });
            from = to;
        }
        travelled = s1;
    }
    current_z
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::LayerKind;
    use crate::geometry::Polygon;
    use pcbmill_core::Tool;

    fn board_outline() -> Layer {
        let edge = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(50.0, 30.0)).unwrap();
        Layer::new("edge", LayerKind::Outline, vec![edge])
    }

    #[test]
    fn test_depth_levels() {
        assert_eq!(depth_levels(-1.6, 0.6), vec![-0.6, -1.2, -1.6]);
        assert_eq!(depth_levels(-1.2, 0.6), vec![-0.6, -1.2]);
        assert_eq!(depth_levels(-0.3, 0.6), vec![-0.3]);
    }

    #[test]
    fn test_inside_and_outside_rings() {
        let inside = outline_rings(&board_outline(), 0.5, &OutlineParameters::default()).unwrap();
        let bbox = inside[0].bounding_box();
        assert!((bbox.min_x - 0.5).abs() < 1e-6 && (bbox.max_y - 29.5).abs() < 1e-6);

        let params = OutlineParameters {
            side: CutSide::Outside,
            ..OutlineParameters::default()
        };
        let outside = outline_rings(&board_outline(), 0.5, &params).unwrap();
        let bbox = outside[0].bounding_box();
        assert!((bbox.min_x + 0.5).abs() < 1e-6 && (bbox.max_y - 30.5).abs() < 1e-6);
    }

    #[test]
    fn test_tool_larger_than_board() {
        let tiny = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(1.0, 1.0)).unwrap();
        let layer = Layer::new("edge", LayerKind::Outline, vec![tiny]);
        let err = outline_rings(&layer, 1.0, &OutlineParameters::default()).unwrap_err();
        assert!(matches!(err, PlanningError::OutlineTooSmall { .. }));
    }

    #[test]
    fn test_tab_lifts_over_span() {
        let points = vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ];
        let center = project_onto(&points, Point::new(5.0, -3.0));
        assert!((center - 5.0).abs() < 1e-9);

        let mut section = ToolpathSection::new(Tool::mill(2, 1.0, 300.0, 60.0));
        let spans = [TabSpan { center, half: 1.5 }];
        cut_level(&mut section, &points, -1.6, &spans, -1.0);

        let tab_moves: Vec<Point> = section
            .moves
            .iter()
            .filter_map(|m| match m {
                ToolpathMove::Linear { to, z, .. } if (*z + 1.0).abs() < 1e-9 => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(tab_moves.len(), 2);
        assert!(tab_moves[0].approx_eq(Point::new(3.5, 0.0)));
        assert!(tab_moves[1].approx_eq(Point::new(6.5, 0.0)));
        assert_eq!(section.last_position(), Some(Point::new(0.0, 0.0)));
    }

    fn square_loop() -> Vec<Point> {
        vec![
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(0.0, 0.0),
        ]
    }

    #[test]
    fn test_entry_moves_off_tab() {
        let points = square_loop();
        let clear = [TabSpan { center: 5.0, half: 1.5 }];
        assert_eq!(clear_entry(&points, &clear), Some(0.0));

        let on_entry = [TabSpan { center: 0.0, half: 1.5 }];
        let s = clear_entry(&points, &on_entry).unwrap();
        assert!((s - 20.0).abs() < 1e-9);

        let moved = entered_at(&points, 25.0);
        assert_eq!(moved.len(), 6);
        assert!(moved[0].approx_eq(Point::new(5.0, 10.0)));
        assert!(moved[1].approx_eq(Point::new(0.0, 10.0)));
        assert!(moved[5].approx_eq(moved[0]));
        let length: f64 = moved.windows(2).map(|w| w[0].distance(w[1])).sum();
        assert!((length - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_fully_covered_loop_stays_at_tab_top() {
        let points = square_loop();
        let spans = [
            TabSpan { center: 5.0, half: 11.0 },
            TabSpan { center: 25.0, half: 11.0 },
        ];
        assert_eq!(clear_entry(&points, &spans), None);
        assert_eq!(entry_depth(&points, -1.6, &spans, -1.0), -1.0);

        let mut section = ToolpathSection::new(Tool::mill(2, 1.0, 300.0, 60.0));
        let end_z = cut_level(&mut section, &points, -1.6, &spans, -1.0);
        assert_eq!(end_z, -1.0);
        assert!(section.moves.iter().all(|m| match m {
            ToolpathMove::Linear { z, .. } => (*z + 1.0).abs() < 1e-9,
            _ => true,
        }));
    }
}
