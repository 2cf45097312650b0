//! Toolpath planning
//!
//! The planner turns a transformed [`BoardModel`](crate::BoardModel) into
//! machine-independent move lists. Each [`Toolpath`] holds one section per
//! tool; a section boundary is a tool change. Moves carry absolute XY and Z in
//! millimeters and the feed they run at. The emitter decides how they are
//! spelled.

pub mod drill;
pub mod isolation;
pub mod ordering;
pub mod outline;
pub mod planner;
pub mod stats;

use std::fmt;

use serde::{Deserialize, Serialize};

use pcbmill_core::Tool;

use crate::geometry::{ArcDirection, Point};

pub use drill::DrillParameters;
pub use isolation::IsolationParameters;
pub use ordering::{NearestNeighbor, PathOrdering};
pub use outline::{CutSide, OutlineParameters, TabPlacement};
pub use planner::ToolpathPlanner;
pub use stats::{ToolpathStats, TravelComparison};

/// What a toolpath machines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PathKind {
    Isolation,
    Outline,
    Drill,
}

impl fmt::Display for PathKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Isolation => write!(f, "isolation"),
            Self::Outline => write!(f, "outline"),
            Self::Drill => write!(f, "drill"),
        }
    }
}

/// One machine motion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ToolpathMove {
    /// Travel in XY at the current (safe) height
    Rapid { to: Point },
    /// Straight feed down to `z` at the current XY
    Plunge { z: f64, feed: f64 },
    /// Straight cut
    Linear { to: Point, z: f64, feed: f64 },
    /// Circular cut from the current position; equal start and end is a full circle
    Arc {
        to: Point,
        center: Point,
        direction: ArcDirection,
        z: f64,
        feed: f64,
    },
    /// Rapid up to `z` at the current XY
    Retract { z: f64 },
}

impl ToolpathMove {
    pub fn is_cut(&self) -> bool {
        matches!(self, Self::Linear { .. } | Self::Arc { .. })
    }

    /// XY end point, if the move changes it
    pub fn end_point(&self) -> Option<Point> {
        match self {
            Self::Rapid { to } | Self::Linear { to, .. } | Self::Arc { to, .. } => Some(*to),
            Self::Plunge { .. } | Self::Retract { .. } => None,
        }
    }
}

/// Moves machined with one tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolpathSection {
    pub tool: Tool,
    pub moves: Vec<ToolpathMove>,
}

impl ToolpathSection {
    pub fn new(tool: Tool) -> Self {
        Self {
            tool,
            moves: Vec::new(),
        }
    }

    pub fn push(&mut self, m: ToolpathMove) {
        self.moves.push(m);
    }

    /// Rapid over `entry`, then feed down to `z`
    pub fn enter(&mut self, entry: Point, z: f64) {
        self.moves.push(ToolpathMove::Rapid { to: entry });
        self.moves.push(ToolpathMove::Plunge {
            z,
            feed: self.tool.plunge_rate,
        });
    }

    /// Cut along `points` at depth `z` using the tool feed
    pub fn cut_through(&mut self, points: &[Point], z: f64) {
        let feed = self.tool.feed_rate;
        self.moves.extend(
            points
                .iter()
                .map(|&to| ToolpathMove::Linear { to, z, feed }),
        );
    }

    pub fn retract(&mut self, z: f64) {
        self.moves.push(ToolpathMove::Retract { z });
    }

    /// XY position after the last move that set one
    pub fn last_position(&self) -> Option<Point> {
        self.moves.iter().rev().find_map(ToolpathMove::end_point)
    }
}

/// Planned moves of one kind, one section per tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Toolpath {
    pub kind: PathKind,
    pub sections: Vec<ToolpathSection>,
}

impl Toolpath {
    pub fn new(kind: PathKind) -> Self {
        Self {
            kind,
            sections: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sections.iter().all(|s| s.moves.is_empty())
    }

    pub fn moves(&self) -> impl Iterator<Item = &ToolpathMove> {
        self.sections.iter().flat_map(|s| s.moves.iter())
    }

    /// Check the motion discipline: XY rapids happen only while retracted and
    /// cuts only after a plunge, so no section starts with a cut
    pub fn is_well_formed(&self) -> bool {
        self.sections.iter().all(|section| {
            let mut engaged = false;
            section.moves.iter().all(|m| match m {
                ToolpathMove::Rapid { .. } => !engaged,
                ToolpathMove::Plunge { .. } => {
                    engaged = true;
                    true
                }
                ToolpathMove::Retract { .. } => {
                    engaged = false;
                    true
                }
                ToolpathMove::Linear { .. } | ToolpathMove::Arc { .. } => engaged,
            })
        })
    }

    pub fn stats(&self) -> ToolpathStats {
        ToolpathStats::from_toolpath(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section() -> ToolpathSection {
        ToolpathSection::new(Tool::mill(1, 0.2, 300.0, 60.0))
    }

    #[test]
    fn test_enter_cut_retract_is_well_formed() {
        let mut s = section();
        s.enter(Point::new(1.0, 1.0), -0.1);
        s.cut_through(&[Point::new(2.0, 1.0), Point::new(1.0, 1.0)], -0.1);
        s.retract(2.0);
        let path = Toolpath {
            kind: PathKind::Isolation,
            sections: vec![s],
        };
        assert!(path.is_well_formed());
        assert_eq!(path.sections[0].last_position(), Some(Point::new(1.0, 1.0)));
    }

    #[test]
    fn test_cut_before_plunge_is_rejected() {
        let mut s = section();
        s.cut_through(&[Point::new(2.0, 1.0)], -0.1);
        let path = Toolpath {
            kind: PathKind::Isolation,
            sections: vec![s],
        };
        assert!(!path.is_well_formed());
    }
}
