//! Controller-specific G-code spelling

use pcbmill_core::{Dialect, Tool};

use crate::geometry::Point;

/// Fixed decimal coordinate, never printing negative zero
pub fn coord(value: f64) -> String {
    let text = format!("{:.4}", value);
    if text.trim_start_matches('-').bytes().all(|b| b == b'0' || b == b'.') {
        return text.trim_start_matches('-').to_string();
    }
    text
}

/// Feed or spindle value
pub fn rate(value: f64) -> String {
    let text = format!("{:.1}", value);
    if text == "-0.0" {
        return "0.0".to_string();
    }
    text
}

/// Formatting rules of one dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DialectRules {
    pub dialect: Dialect,
}

impl DialectRules {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn comment(&self, text: &str) -> String {
        match self.dialect {
            Dialect::Grbl => format!("; {}", text),
            Dialect::UsbCnc => {
                let clean: String = text.chars().filter(|c| *c != '(' && *c != ')').collect();
                format!("({})", clean)
            }
        }
    }

    /// Units, plane, distance and feed modes
    pub fn preamble(&self) -> Vec<&'static str> {
        match self.dialect {
            Dialect::Grbl => vec!["G21", "G90", "G17", "G94"],
            Dialect::UsbCnc => vec!["G21", "G90", "G90.1", "G17", "G94"],
        }
    }

    /// I and J words for an arc starting at `start`
    pub fn arc_center(&self, start: Point, center: Point) -> (f64, f64) {
        match self.dialect {
            Dialect::Grbl => (center.x - start.x, center.y - start.y),
            Dialect::UsbCnc => (center.x, center.y),
        }
    }

    /// Select and load `tool`
    pub fn tool_select(&self, tool: &Tool) -> Vec<String> {
        match self.dialect {
            Dialect::Grbl => vec![self.comment(&format!("Tool {}", tool.describe()))],
            Dialect::UsbCnc => vec![
                self.comment(&format!("Tool {}", tool.describe())),
                format!("T{} M6", tool.number),
            ],
        }
    }

    /// Stop, lift and swap to `tool`; Grbl pauses for a manual change
    pub fn tool_change(&self, tool: &Tool, tool_change_z: f64) -> Vec<String> {
        let mut lines = vec!["M5".to_string(), format!("G0 Z{}", coord(tool_change_z))];
        match self.dialect {
            Dialect::Grbl => {
                lines.push(self.comment(&format!("Change to {}", tool.describe())));
                lines.push("M0".to_string());
            }
            Dialect::UsbCnc => {
                lines.push(self.comment(&format!("Change to {}", tool.describe())));
                lines.push(format!("T{} M6", tool.number));
            }
        }
        lines
    }

    pub fn spindle_on(&self, speed: f64, coolant: bool) -> Vec<String> {
        let mut lines = vec![format!("M3 S{:.0}", speed.max(0.0))];
        if coolant && self.dialect == Dialect::UsbCnc {
            lines.push("M8".to_string());
        }
        lines
    }

    /// Spindle off and program end
    pub fn program_end(&self, coolant: bool) -> Vec<&'static str> {
        match self.dialect {
            Dialect::Grbl => vec!["M5", "M2"],
            Dialect::UsbCnc if coolant => vec!["M5", "M9", "M30"],
            Dialect::UsbCnc => vec!["M5", "M30"],
        }
    }
}
