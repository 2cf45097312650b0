//! Milling configuration for PcbMill
//!
//! The configuration is supplied as a value by the embedding application
//! (typically deserialized from JSON or TOML). Keys are snake_case and every
//! field has a default, so partial documents deserialize.
//!
//! Configuration is organized into logical sections:
//! - Isolation routing (top-level tool, depth and pass settings)
//! - Board outline cutting and holding tabs
//! - Drilling
//! - Machine motion (heights, feeds, spindle, dialect)
//! - Placement (mirroring, origin and offset)

use pcbmill_core::{ConfigurationError, Dialect, MirrorAxis, Tool, Units};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Corner treatment of isolation offsets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Arcs around convex corners
    #[default]
    Round,
    /// Sharp corners, beveled past the miter limit
    Miter,
}

/// Side of the board edge the outline tool runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutlineSide {
    /// Tool center inside the outline
    #[default]
    Inside,
    /// Tool center outside the outline, board keeps its drawn size
    Outside,
}

/// Where machine zero ends up relative to the board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OriginMode {
    /// Keep the coordinates of the input files
    #[default]
    Keep,
    /// Move the lower-left corner of the board to (0, 0)
    LowerLeft,
}

/// Holding tab settings for outline cutting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabSettings {
    /// Tab locations in board coordinates; each is projected onto the cut
    pub positions: Vec<[f64; 2]>,
    /// Tab length along the cut in mm
    pub width: f64,
    /// Tab height above the final outline depth in mm
    pub height: f64,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            positions: Vec::new(),
            width: 2.0,
            height: 0.6,
        }
    }
}

/// Board outline cutting settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlineSettings {
    /// Outline mill diameter in mm
    pub tool_diameter: f64,
    /// Final cut depth (negative, mm)
    pub depth: f64,
    /// Maximum depth removed per pass (mm)
    pub depth_per_pass: f64,
    /// Tool compensation side
    pub side: OutlineSide,
}

impl Default for OutlineSettings {
    fn default() -> Self {
        Self {
            tool_diameter: 1.0,
            depth: -1.6,
            depth_per_pass: 0.6,
            side: OutlineSide::Inside,
        }
    }
}

/// Drilling settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrillSettings {
    /// Final drill depth (negative, mm)
    pub depth: f64,
    /// Peck increment in mm; `None` drills in one plunge
    pub peck_depth: Option<f64>,
    /// Plunge feed rate in mm/min
    pub feed_rate: f64,
    /// Holes wider than this (mm) are milled helically with the isolation tool
    pub mill_holes_above: Option<f64>,
}

impl Default for DrillSettings {
    fn default() -> Self {
        Self {
            depth: -1.7,
            peck_depth: None,
            feed_rate: 100.0,
            mill_holes_above: None,
        }
    }
}

/// Machine motion settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MachineSettings {
    /// Travel height above the work in mm
    pub safe_z: f64,
    /// Height for tool changes in mm
    pub tool_change_z: f64,
    /// Horizontal cutting feed in mm/min
    pub feed_rate: f64,
    /// Vertical plunge feed in mm/min
    pub plunge_rate: f64,
    /// Spindle speed in RPM
    pub spindle_speed: f64,
    /// Turn coolant on while cutting (USBCNC only)
    pub coolant: bool,
}

impl Default for MachineSettings {
    fn default() -> Self {
        Self {
            safe_z: 2.0,
            tool_change_z: 20.0,
            feed_rate: 100.0,
            plunge_rate: 50.0,
            spindle_speed: 10000.0,
            coolant: false,
        }
    }
}

/// Placement of the board in machine coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PlacementSettings {
    /// Origin handling applied after mirroring
    pub origin: OriginMode,
    /// Extra X translation in mm
    pub offset_x: f64,
    /// Extra Y translation in mm
    pub offset_y: f64,
}

/// Complete milling configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MillingConfig {
    /// Isolation mill diameter in mm
    pub tool_diameter: f64,
    /// Isolation cut depth (negative, mm)
    pub cut_depth: f64,
    /// Number of isolation passes
    pub pass_count: u32,
    /// Extra offset between successive isolation passes in mm
    pub stepover: f64,
    /// Corner treatment of isolation offsets
    pub join_style: JoinKind,
    /// Miter limit as a multiple of the offset distance
    pub miter_limit: f64,
    /// Physical drill diameter overrides keyed by Excellon tool index
    pub drill_tool_table: BTreeMap<u32, f64>,
    /// Mirror axis for bottom-side milling
    pub mirror_axis: MirrorAxis,
    /// Mirror line coordinate; defaults to the board center
    pub mirror_reference: Option<f64>,
    /// Output dialect
    pub dialect: Dialect,
    /// Leave holding tabs on the outline
    pub leave_tabs: bool,
    /// Tab geometry
    pub tabs: TabSettings,
    /// Units assumed for inputs that do not declare any
    pub units_hint: Units,
    /// Outline cutting
    pub outline: OutlineSettings,
    /// Drilling
    pub drilling: DrillSettings,
    /// Machine motion
    pub machine: MachineSettings,
    /// Board placement
    pub placement: PlacementSettings,
}

impl Default for MillingConfig {
    fn default() -> Self {
        Self {
            tool_diameter: 0.1,
            cut_depth: -0.05,
            pass_count: 1,
            stepover: 0.05,
            join_style: JoinKind::Round,
            miter_limit: 2.0,
            drill_tool_table: BTreeMap::new(),
            mirror_axis: MirrorAxis::None,
            mirror_reference: None,
            dialect: Dialect::Grbl,
            leave_tabs: false,
            tabs: TabSettings::default(),
            units_hint: Units::Millimeters,
            outline: OutlineSettings::default(),
            drilling: DrillSettings::default(),
            machine: MachineSettings::default(),
            placement: PlacementSettings::default(),
        }
    }
}

fn require_positive(field: &str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigurationError::invalid(field, "must be > 0"));
    }
    Ok(())
}

fn require_negative(field: &str, value: f64) -> Result<(), ConfigurationError> {
    if !value.is_finite() || value >= 0.0 {
        return Err(ConfigurationError::invalid(field, "must be < 0 (below the surface)"));
    }
    Ok(())
}

impl MillingConfig {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        require_positive("tool_diameter", self.tool_diameter)?;
        require_negative("cut_depth", self.cut_depth)?;

        if self.pass_count == 0 {
            return Err(ConfigurationError::invalid("pass_count", "must be >= 1"));
        }
        if !self.stepover.is_finite() || self.stepover < 0.0 {
            return Err(ConfigurationError::invalid("stepover", "must be >= 0"));
        }
        if self.pass_count > 1 && self.stepover <= 0.0 {
            return Err(ConfigurationError::invalid(
                "stepover",
                "must be > 0 when more than one pass is requested",
            ));
        }
        if !self.miter_limit.is_finite() || self.miter_limit < 1.0 {
            return Err(ConfigurationError::invalid("miter_limit", "must be >= 1"));
        }

        for (tool, diameter) in &self.drill_tool_table {
            require_positive(&format!("drill_tool_table.T{}", tool), *diameter)?;
        }

        if let Some(reference) = self.mirror_reference {
            if !reference.is_finite() {
                return Err(ConfigurationError::invalid(
                    "mirror_reference",
                    "must be a finite coordinate",
                ));
            }
        }

        require_positive("outline.tool_diameter", self.outline.tool_diameter)?;
        require_negative("outline.depth", self.outline.depth)?;
        require_positive("outline.depth_per_pass", self.outline.depth_per_pass)?;

        if self.leave_tabs {
            if self.tabs.positions.is_empty() {
                return Err(ConfigurationError::MissingValue {
                    field: "tabs.positions".to_string(),
                    reason: "leave_tabs is enabled".to_string(),
                });
            }
            require_positive("tabs.width", self.tabs.width)?;
            require_positive("tabs.height", self.tabs.height)?;
            if self.tabs.height >= -self.outline.depth {
                return Err(ConfigurationError::invalid(
                    "tabs.height",
                    "must be smaller than the outline depth",
                ));
            }
        }

        require_negative("drilling.depth", self.drilling.depth)?;
        require_positive("drilling.feed_rate", self.drilling.feed_rate)?;
        if let Some(peck) = self.drilling.peck_depth {
            require_positive("drilling.peck_depth", peck)?;
        }
        if let Some(threshold) = self.drilling.mill_holes_above {
            if !threshold.is_finite() || threshold <= self.tool_diameter {
                return Err(ConfigurationError::invalid(
                    "drilling.mill_holes_above",
                    "must be larger than the isolation tool diameter",
                ));
            }
        }

        require_positive("machine.safe_z", self.machine.safe_z)?;
        if !self.machine.tool_change_z.is_finite()
            || self.machine.tool_change_z < self.machine.safe_z
        {
            return Err(ConfigurationError::invalid(
                "machine.tool_change_z",
                "must be >= machine.safe_z",
            ));
        }
        require_positive("machine.feed_rate", self.machine.feed_rate)?;
        require_positive("machine.plunge_rate", self.machine.plunge_rate)?;
        if !self.machine.spindle_speed.is_finite() || self.machine.spindle_speed < 0.0 {
            return Err(ConfigurationError::invalid(
                "machine.spindle_speed",
                "must be >= 0",
            ));
        }

        if !self.placement.offset_x.is_finite() || !self.placement.offset_y.is_finite() {
            return Err(ConfigurationError::invalid(
                "placement",
                "offsets must be finite",
            ));
        }

        tracing::debug!(
            "Milling configuration valid: tool {:.3}mm, {} pass(es), {}",
            self.tool_diameter,
            self.pass_count,
            self.dialect
        );
        Ok(())
    }

    /// Isolation mill, tool number 1
    pub fn isolation_tool(&self) -> Tool {
        Tool::mill(
            1,
            self.tool_diameter,
            self.machine.feed_rate,
            self.machine.plunge_rate,
        )
        .with_spindle_speed(self.machine.spindle_speed)
    }

    /// Outline mill, tool number 2
    pub fn outline_tool(&self) -> Tool {
        Tool::mill(
            2,
            self.outline.tool_diameter,
            self.machine.feed_rate,
            self.machine.plunge_rate,
        )
        .with_spindle_speed(self.machine.spindle_speed)
    }

    /// Drill bit for one diameter group
    pub fn drill_tool(&self, number: u32, diameter: f64) -> Tool {
        Tool::drill(number, diameter, self.drilling.feed_rate)
            .with_spindle_speed(self.machine.spindle_speed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = MillingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.pass_count, 1);
        assert_eq!(config.dialect, Dialect::Grbl);
    }

    #[test]
    fn test_rejects_non_positive_tool() {
        let mut config = MillingConfig::default();
        config.tool_diameter = 0.0;
        let err = config.validate().unwrap_err();
        assert_eq!(err, ConfigurationError::invalid("tool_diameter", "must be > 0"));
    }

    #[test]
    fn test_rejects_positive_cut_depth() {
        let mut config = MillingConfig::default();
        config.cut_depth = 0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tabs_require_positions() {
        let mut config = MillingConfig::default();
        config.leave_tabs = true;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::MissingValue { .. })
        ));

        config.tabs.positions.push([10.0, 0.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_multi_pass_needs_stepover() {
        let mut config = MillingConfig::default();
        config.pass_count = 3;
        config.stepover = 0.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tool_helpers() {
        let config = MillingConfig::default();
        let iso = config.isolation_tool();
        assert_eq!(iso.number, 1);
        assert_eq!(iso.diameter, 0.1);
        let drill = config.drill_tool(3, 0.8);
        assert_eq!(drill.plunge_rate, config.drilling.feed_rate);
    }
}
