//! Tool definitions
//!
//! Tools are supplied by the caller (usually derived from the milling
//! configuration) and borrowed by the planner. The planner only reads the
//! diameter; feeds and spindle speed flow through to the emitter.

use serde::{Deserialize, Serialize};

/// Tool types for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Flat or V engraving end mill used for routing
    Mill,
    /// Twist drill used for plunge drilling
    Drill,
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Mill => write!(f, "Mill"),
            Self::Drill => write!(f, "Drill"),
        }
    }
}

/// Complete tool definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tool {
    /// Tool number, used for the tool change command
    pub number: u32,
    /// Tool type
    pub kind: ToolKind,
    /// Cutting diameter in mm
    pub diameter: f64,
    /// Horizontal feed rate in mm/min
    pub feed_rate: f64,
    /// Vertical feed rate in mm/min
    pub plunge_rate: f64,
    /// Spindle speed in RPM
    pub spindle_speed: f64,
}

impl Tool {
    /// Create a mill bit with the given diameter and feeds
    pub fn mill(number: u32, diameter: f64, feed_rate: f64, plunge_rate: f64) -> Self {
        Self {
            number,
            kind: ToolKind::Mill,
            diameter,
            feed_rate,
            plunge_rate,
            spindle_speed: 10000.0,
        }
    }

    /// Create a drill bit with the given diameter and plunge feed
    pub fn drill(number: u32, diameter: f64, plunge_rate: f64) -> Self {
        Self {
            number,
            kind: ToolKind::Drill,
            diameter,
            feed_rate: plunge_rate,
            plunge_rate,
            spindle_speed: 10000.0,
        }
    }

    /// Set the spindle speed
    pub fn with_spindle_speed(mut self, rpm: f64) -> Self {
        self.spindle_speed = rpm;
        self
    }

    /// Half the cutting diameter
    pub fn radius(&self) -> f64 {
        self.diameter / 2.0
    }

    /// Short description used in program comments
    pub fn describe(&self) -> String {
        format!("T{} {} {:.3}mm", self.number, self.kind, self.diameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_constructors() {
        let mill = Tool::mill(1, 0.2, 150.0, 50.0).with_spindle_speed(12000.0);
        assert_eq!(mill.kind, ToolKind::Mill);
        assert!((mill.radius() - 0.1).abs() < 1e-12);
        assert_eq!(mill.spindle_speed, 12000.0);

        let drill = Tool::drill(3, 0.8, 60.0);
        assert_eq!(drill.kind, ToolKind::Drill);
        assert_eq!(drill.describe(), "T3 Drill 0.800mm");
    }
}
