//! Toolpath planner
//!
//! Produces geometry and visit order only; depths come from the parameter
//! structs and feeds from the supplied [`Tool`]s.

use tracing::{debug, info, warn};

use pcbmill_core::{PlanningError, Tool};

use super::drill::{drill_cycle, group_holes, helical_cycle, DrillParameters};
use super::isolation::{isolation_rings, IsolationParameters};
use super::ordering::{NearestNeighbor, PathOrdering};
use super::outline::{
    clear_entry, cut_level, depth_levels, entered_at, entry_depth, outline_rings, project_onto,
    OutlineParameters, TabSpan,
};
use super::stats::TravelComparison;
use super::{PathKind, Toolpath, ToolpathMove, ToolpathSection};
use crate::board::{BoardModel, DrillHole};
use crate::geometry::{Point, Ring, EPSILON};

/// Plans isolation, outline and drill toolpaths for a board
#[derive(Debug, Clone, Default)]
pub struct ToolpathPlanner<O = NearestNeighbor> {
    ordering: O,
}

impl ToolpathPlanner {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<O: PathOrdering> ToolpathPlanner<O> {
    /// Use a different visit ordering
    pub fn with_ordering<P: PathOrdering>(self, ordering: P) -> ToolpathPlanner<P> {
        ToolpathPlanner { ordering }
    }

    /// Cut closed `rings` at `z`, each entered at the vertex the ordering picks
    fn cut_rings(
        &self,
        section: &mut ToolpathSection,
        rings: &[Ring],
        z: f64,
        safe_z: f64,
    ) {
        let loops: Vec<Vec<Point>> = rings.iter().map(|r| r.points.clone()).collect();
        let start = section.last_position().unwrap_or_else(Point::origin);
        for (index, entry) in self.ordering.order_loops(start, &loops) {
            let mut points = rings[index].rotated_to(entry).closed_points();
            let tab_spans = |points: &[Point]| match &params.tabs {
                Some(tabs) => tabs
                    .positions
                    .iter()
                    .zip(&tab_owner)
                    .filter(|(_, owner)| **owner == Some(index))
                    .map(|(&p, _)| TabSpan {
                        center: project_onto(points, p),
                        half: (tabs.width + tool.diameter) / 2.0,
                    })
                    .collect::<Vec<_>>(),
                None => Vec::new(),
            };
            let tab_top = params
                .tabs
                .as_ref()
                .map_or(params.depth, |tabs| params.depth + tabs.height);

            // never plunge inside a tab
            let mut spans = tab_spans(&points);
            match clear_entry(&points, &spans) {
                Some(s) if s > EPSILON => {
                    points = entered_at(&points, s);
                    spans = tab_spans(&points);
                }
                Some(_) => {}
                None => warn!(
                    loop_index = index,
                    tab_top, "Tabs cover the whole loop; it is not cut below the tab top"
                ),
            }

            let mut current_z = params.safe_z;
            for (pass, &z) in levels.iter().enumerate() {
                let entry_z = entry_depth(&points, z, &spans, tab_top);
                if pass == 0 {
                    section.enter(points[0], entry_z);
                } else if entry_z < current_z - EPSILON {
                    section.push(ToolpathMove::Plunge {
                        z: entry_z,
                        feed: tool.plunge_rate,
                    });
                }
                current_z = cut_level(&mut section, &points, z, &spans, tab_top);
            }
            section.retract(params.safe_z);
        }

        let mut path = Toolpath::new(PathKind::Outline);
        path.sections.push(section);
        info!(
            loops = rings.len(),
            passes = levels.len(),
            stats = %path.stats(),
            "Planned outline cut"
        );
        Ok(path)
    }

    /// One section per bit diameter, ascending, plus a milled-hole section
    ///
    /// `drill_tool` builds the bit for a group from its lowest Excellon tool
    /// index and diameter. Holes above the milling threshold go to `mill`.
    pub fn plan_drilling<F>(
        &self,
        holes: &[DrillHole],
        params: &DrillParameters,
        drill_tool: F,
        mill: Option<&Tool>,
    ) -> Result<Toolpath, PlanningError>
    where
        F: Fn(u32, f64) -> Tool,
    {
        let mut path = Toolpath::new(PathKind::Drill);
        let milled: Vec<&DrillHole> = match mill {
            Some(_) => holes.iter().filter(|h| params.is_milled(h)).collect(),
            None => Vec::new(),
        };
        let drilled = holes
            .iter()
            .filter(|h| mill.is_none() || !params.is_milled(h));

        let mut position = Point::origin();
        for group in group_holes(drilled, params) {
            let order = self.ordering.order_points(position, &group.positions);
            let comparison = TravelComparison::new(position, &group.positions, &order);
            let mut section = ToolpathSection::new(drill_tool(group.tool, group.diameter));
            for &i in &order {
                drill_cycle(&mut section, group.positions[i], params);
            }
            position = section.last_position().unwrap_or(position);
            info!(
                diameter = group.diameter,
                holes = group.positions.len(),
                travel = comparison.planned,
                file_order_travel = comparison.file_order,
                "Planned drill group"
            );
            path.sections.push(section);
        }

        if let (Some(mill), false) = (mill, milled.is_empty()) {
            let centers: Vec<Point> = milled.iter().map(|h| h.position).collect();
            let order = self.ordering.order_points(position, &centers);
            let mut section = ToolpathSection::new(mill.clone());
            for &i in &order {
                helical_cycle(&mut section, centers[i], milled[i].diameter, params);
            }
            debug!(holes = milled.len(), "Planned milled holes");
            path.sections.push(section);
        }

        info!(stats = %path.stats(), "Planned drilling");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Layer, LayerKind};
    use crate::geometry::Polygon;
    use crate::toolpath::TabPlacement;

    fn drill(number: u32, diameter: f64) -> Tool {
        Tool::drill(number, diameter, 100.0)
    }

    #[test]
    fn test_two_holes_same_tool() {
        let holes = [
            DrillHole {
                position: Point::new(50.0, 0.0),
                diameter: 0.8,
                plated: true,
                tool: 1,
            },
            DrillHole {
                position: Point::new(0.0, 0.0),
                diameter: 0.8,
                plated: true,
                tool: 1,
            },
        ];
        let path = ToolpathPlanner::new()
            .plan_drilling(&holes, &DrillParameters::default(), drill, None)
            .unwrap();
        assert_eq!(path.sections.len(), 1);
        let moves = &path.sections[0].moves;
        assert_eq!(moves[0], ToolpathMove::Rapid { to: Point::new(0.0, 0.0) });
        assert_eq!(moves.iter().filter(|m| matches!(m, ToolpathMove::Plunge { .. })).count(), 2);
        assert_eq!(moves.iter().filter(|m| matches!(m, ToolpathMove::Retract { .. })).count(), 2);
        assert_eq!(path.stats().tool_changes, 0);
    }

    #[test]
    fn test_missing_outline() {
        let board = BoardModel::new();
        let err = ToolpathPlanner::new()
            .plan_outline(&board, &Tool::mill(2, 1.0, 300.0, 60.0), &OutlineParameters::default())
            .unwrap_err();
        assert_eq!(err, PlanningError::MissingOutline);
    }

    #[test]
    fn test_outline_passes_plunge_deeper() {
        let edge = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(20.0, 10.0)).unwrap();
        let board = BoardModel::new().with_layer(Layer::new("edge", LayerKind::Outline, vec![edge]));
        let path = ToolpathPlanner::new()
            .plan_outline(&board, &Tool::mill(2, 1.0, 300.0, 60.0), &OutlineParameters::default())
            .unwrap();
        let plunges: Vec<f64> = path
            .moves()
            .filter_map(|m| match m {
                ToolpathMove::Plunge { z, .. } => Some(*z),
                _ => None,
            })
            .collect();
        assert_eq!(plunges, vec![-0.6, -1.2, -1.6]);
        assert!(path.is_well_formed());
    }

    #[test]
    fn test_outline_entry_avoids_tab() {
        let edge = Polygon::rectangle(Point::new(0.0, 0.0), Point::new(20.0, 10.0)).unwrap();
        let board = BoardModel::new().with_layer(Layer::new("edge", LayerKind::Outline, vec![edge]));
        // the tool center loop starts at its corner nearest the origin
        let tab_center = Point::new(0.5, 0.5);
        let params = OutlineParameters {
            tabs: Some(TabPlacement {
                positions: vec![tab_center],
                width: 3.0,
                height: 0.8,
            }),
            ..OutlineParameters::default()
        };
        let tab_top = params.depth + 0.8;
        let path = ToolpathPlanner::new()
            .plan_outline(&board, &Tool::mill(2, 1.0, 300.0, 60.0), &params)
            .unwrap();
        assert!(path.is_well_formed());

        let on_tab = |p: Point| p.distance(tab_center) < 2.0 - 1e-6;
        let mut position = Point::origin();
        let mut lifted = 0;
        for m in path.moves() {
            match *m {
                ToolpathMove::Rapid { to } => position = to,
                ToolpathMove::Plunge { z, .. } => {
                    assert!(!on_tab(position) || z >= tab_top - 1e-9, "plunge to {z} on the tab");
                }
                ToolpathMove::Linear { to, z, .. } => {
                    let mid = position + (to - position) * 0.5;
                    if on_tab(to) || on_tab(mid) {
                        assert!(z >= tab_top - 1e-9, "cut at {z} through the tab");
                        lifted += 1;
                    }
                    position = to;
                }
                _ => {}
            }
        }
        assert!(lifted > 0);

        let deepest = path
            .moves()
            .filter_map(|m| match m {
                ToolpathMove::Linear { z, .. } => Some(*z),
                _ => None,
            })
            .fold(f64::INFINITY, f64::min);
        assert!((deepest - params.depth).abs() < 1e-9);
    }
}
