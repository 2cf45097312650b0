//! Travel accounting for planned toolpaths

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Toolpath, ToolpathMove};
use crate::geometry::{Arc, Point};

/// Distances and counts of one toolpath
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolpathStats {
    /// XY distance travelled by rapids (mm)
    pub rapid_distance: f64,
    /// Distance travelled while cutting (mm)
    pub cut_distance: f64,
    pub plunge_count: usize,
    /// Sections after the first
    pub tool_changes: usize,
    pub move_count: usize,
}

impl ToolpathStats {
    /// Walk the moves from the machine origin
    pub fn from_toolpath(path: &Toolpath) -> Self {
        let mut stats = Self {
            tool_changes: path.sections.len().saturating_sub(1),
            ..Self::default()
        };
        let mut position = Point::origin();
        let mut z = 0.0;
        for m in path.moves() {
            stats.move_count += 1;
            match *m {
                ToolpathMove::Rapid { to } => {
                    stats.rapid_distance += position.distance(to);
                    position = to;
                }
                ToolpathMove::Plunge { z: target, .. } => {
                    stats.plunge_count += 1;
                    z = target;
                }
                ToolpathMove::Linear { to, z: target, .. } => {
                    let xy = position.distance(to);
                    stats.cut_distance += (xy * xy + (target - z) * (target - z)).sqrt();
                    position = to;
                    z = target;
                }
                ToolpathMove::Arc {
                    to,
                    center,
                    direction,
                    z: target,
                    ..
                } => {
                    let planar = Arc::new(position, to, center, direction).length();
                    stats.cut_distance += (planar * planar + (target - z) * (target - z)).sqrt();
                    position = to;
                    z = target;
                }
                ToolpathMove::Retract { z: target } => z = target,
            }
        }
        stats
    }
}

impl fmt::Display for ToolpathStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} moves, rapid {:.1}mm, cut {:.1}mm, {} plunges, {} tool changes",
            self.move_count,
            self.rapid_distance,
            self.cut_distance,
            self.plunge_count,
            self.tool_changes
        )
    }
}

/// Rapid travel of a planned visit order against the order of the input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TravelComparison {
    pub file_order: f64,
    pub planned: f64,
}

impl TravelComparison {
    /// Travel through `file_order`, and through the same points in `planned` order
    pub fn new(start: Point, file_order: &[Point], planned: &[usize]) -> Self {
        let planned_points: Vec<Point> = planned.iter().map(|&i| file_order[i]).collect();
        Self {
            file_order: tour_length(start, file_order),
            planned: tour_length(start, &planned_points),
        }
    }

    pub fn saved(&self) -> f64 {
        self.file_order - self.planned
    }

    /// Saving as a percentage of the file-order travel
    pub fn saved_percent(&self) -> f64 {
        if self.file_order <= 0.0 {
            0.0
        } else {
            self.saved() / self.file_order * 100.0
        }
    }
}

fn tour_length(start: Point, points: &[Point]) -> f64 {
    points
        .iter()
        .fold((start, 0.0), |(from, total), &p| (p, total + from.distance(p)))
        .1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolpath::{PathKind, ToolpathSection};
    use pcbmill_core::Tool;

    #[test]
    fn test_stats_count_rapids_and_cuts() {
        let mut section = ToolpathSection::new(Tool::mill(1, 0.2, 300.0, 60.0));
        section.enter(Point::new(3.0, 4.0), -0.1);
        section.cut_through(&[Point::new(13.0, 4.0)], -0.1);
        section.retract(2.0);
        let path = Toolpath {
            kind: PathKind::Isolation,
            sections: vec![section],
        };
        let stats = path.stats();
        assert!((stats.rapid_distance - 5.0).abs() < 1e-12);
        assert!((stats.cut_distance - 10.0).abs() < 1e-12);
        assert_eq!(stats.plunge_count, 1);
        assert_eq!(stats.tool_changes, 0);
        assert_eq!(stats.move_count, 4);
    }

    #[test]
    fn test_travel_comparison() {
        let points = [Point::new(10.0, 0.0), Point::new(1.0, 0.0), Point::new(5.0, 0.0)];
        let cmp = TravelComparison::new(Point::origin(), &points, &[1, 2, 0]);
        assert!((cmp.file_order - 23.0).abs() < 1e-12);
        assert!((cmp.planned - 10.0).abs() < 1e-12);
        assert!(cmp.saved_percent() > 50.0);
    }
}
