//! Drilling: grouping hits by bit, peck cycles and helical milling

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{ToolpathMove, ToolpathSection};
use crate::board::DrillHole;
use crate::geometry::{ArcDirection, Point, EPSILON};

/// Clearance above the surface a peck retracts to (mm)
pub const PECK_CLEARANCE: f64 = 0.5;

/// Parameters for the drilling planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrillParameters {
    /// Final depth of every hole (negative, mm)
    pub depth: f64,
    /// Maximum depth of each plunge; `None` drills in one stroke
    pub peck_depth: Option<f64>,
    /// Height for travel between holes (mm)
    pub safe_z: f64,
    /// Excellon tool index to physical bit diameter
    pub tool_table: BTreeMap<u32, f64>,
    /// Holes wider than this are milled helically with the mill
    pub mill_holes_above: Option<f64>,
    /// Depth gained per helix turn (mm)
    pub helix_pitch: f64,
}

impl Default for DrillParameters {
    fn default() -> Self {
        Self {
            depth: -1.7,
            peck_depth: None,
            safe_z: 2.0,
            tool_table: BTreeMap::new(),
            mill_holes_above: None,
            helix_pitch: 0.5,
        }
    }
}

impl DrillParameters {
    /// Diameter of the bit that drills `hole`
    pub fn bit_diameter(&self, hole: &DrillHole) -> f64 {
        self.tool_table
            .get(&hole.tool)
            .copied()
            .unwrap_or(hole.diameter)
    }

    pub fn is_milled(&self, hole: &DrillHole) -> bool {
        self.mill_holes_above
            .is_some_and(|limit| hole.diameter > limit + EPSILON)
    }
}

/// Holes drilled by one bit
#[derive(Debug, Clone, PartialEq)]
pub struct DrillGroup {
    pub diameter: f64,
    /// Lowest Excellon tool index in the group
    pub tool: u32,
    pub positions: Vec<Point>,
}

/// Group `holes` by bit diameter, ascending, dropping repeated positions
pub fn group_holes<'a>(
    holes: impl IntoIterator<Item = &'a DrillHole>,
    params: &DrillParameters,
) -> Vec<DrillGroup> {
    // keyed on 0.1 µm so equal diameters from different tools share a bit
    let mut groups: BTreeMap<i64, DrillGroup> = BTreeMap::new();
    for hole in holes {
        let diameter = params.bit_diameter(hole);
        let key = (diameter * 1e4).round() as i64;
        let group = groups.entry(key).or_insert_with(|| DrillGroup {
            diameter,
            tool: hole.tool,
            positions: Vec::new(),
        });
        group.tool = group.tool.min(hole.tool);
        if group.positions.iter().any(|p| p.approx_eq(hole.position)) {
            warn!(
                x = hole.position.x,
                y = hole.position.y,
                diameter,
                "Dropping duplicate drill hit"
            );
            continue;
        }
        group.positions.push(hole.position);
    }
    groups.into_values().collect()
}

/// Plunge to `depth`, in pecks when configured, then retract to `safe_z`
pub fn drill_cycle(section: &mut ToolpathSection, at: Point, params: &DrillParameters) {
    let feed = section.tool.plunge_rate;
    section.push(ToolpathMove::Rapid { to: at });
    match params.peck_depth.filter(|p| *p > EPSILON) {
        None => section.push(ToolpathMove::Plunge {
            z: params.depth,
            feed,
        }),
        Some(peck) => {
            let mut z = 0.0;
            while z > params.depth + EPSILON {
                z = (z - peck).max(params.depth);
                section.push(ToolpathMove::Plunge { z, feed });
                if z > params.depth + EPSILON {
                    section.push(ToolpathMove::Retract { z: PECK_CLEARANCE });
                }
            }
        }
    }
    section.retract(params.safe_z);
}

/// Mill a hole of `diameter` at `center` with a helix of full circles
///
/// Falls back to a plain plunge when the tool is not smaller than the hole.
pub fn helical_cycle(
    section: &mut ToolpathSection,
    center: Point,
    diameter: f64,
    params: &DrillParameters,
) {
    let radius = (diameter - section.tool.diameter) / 2.0;
    if radius <= EPSILON {
        drill_cycle(section, center, params);
        return;
    }
    let feed = section.tool.feed_rate;
    let start = center + Point::new(radius, 0.0);
    let pitch = if params.helix_pitch > EPSILON {
        params.helix_pitch
    } else {
        params.depth.abs()
    };

    section.enter(start, 0.0);
    let mut z = 0.0;
    while z > params.depth + EPSILON {
        z = (z - pitch).max(params.depth);
        section.push(ToolpathMove::Arc {
            to: start,
            center,
            direction: ArcDirection::Clockwise,
            z,
            feed,
        });
    }
    // clean-up turn at full depth
    section.push(ToolpathMove::Arc {
        to: start,
        center,
        direction: ArcDirection::Clockwise,
        z: params.depth,
        feed,
    });
    section.push(ToolpathMove::Linear {
        to: center,
        z: params.depth,
        feed,
    });
    section.retract(params.safe_z);
}
