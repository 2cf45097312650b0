//! G-code emission
//!
//! Spells planned [`Toolpath`]s as text for a controller dialect. Output is
//! a pure function of the toolpaths and options.

pub mod dialect;

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use tracing::debug;

use pcbmill_core::{Dialect, Tool};

use crate::geometry::{ArcDirection, Point};
use crate::toolpath::{Toolpath, ToolpathMove};
pub use dialect::{coord, rate, DialectRules};

/// Emission settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcodeOptions {
    pub dialect: Dialect,
    /// Travel height (mm)
    pub safe_z: f64,
    /// Height the tool is lifted to for a change (mm)
    pub tool_change_z: f64,
    /// Coolant on while cutting; USBCNC only
    pub coolant: bool,
}

impl Default for GcodeOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Grbl,
            safe_z: 2.0,
            tool_change_z: 20.0,
            coolant: false,
        }
    }
}

/// Writes G-code programs
#[derive(Debug, Clone, Default)]
pub struct GcodeEmitter {
    options: GcodeOptions,
}

impl GcodeEmitter {
    pub fn new(options: GcodeOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GcodeOptions {
        &self.options
    }

    /// One program for one toolpath
    pub fn emit(&self, path: &Toolpath) -> String {
        self.emit_program(&format!("{} program", path.kind), &[path])
    }

    /// One program running every toolpath in order; tools change only when
    /// the next section uses a different tool
    pub fn emit_combined(&self, paths: &[&Toolpath]) -> String {
        self.emit_program("combined program", paths)
    }

    fn emit_program(&self, title: &str, paths: &[&Toolpath]) -> String {
        let rules = DialectRules::new(self.options.dialect);
        let mut out = ProgramWriter::default();

        out.line(rules.comment(&format!("pcbmill {}", title)));
        out.line(rules.comment(&format!("dialect {}", self.options.dialect)));
        for word in rules.preamble() {
            out.line(word);
        }
        out.line(format!("G0 Z{}", coord(self.options.safe_z)));

        let mut current_tool: Option<&Tool> = None;
        let mut position = Point::origin();
        for path in paths {
            if path.sections.iter().all(|s| s.moves.is_empty()) {
                continue;
            }
            out.line(rules.comment(&format!("{} toolpath", path.kind)));
            for section in path.sections.iter().filter(|s| !s.moves.is_empty()) {
                match current_tool {
                    None => {
                        out.lines(rules.tool_select(&section.tool));
                        out.lines(rules.spindle_on(section.tool.spindle_speed, self.options.coolant));
                        out.line(format!("G0 Z{}", coord(self.options.safe_z)));
                    }
                    Some(tool) if tool != &section.tool => {
                        out.lines(rules.tool_change(&section.tool, self.options.tool_change_z));
                        out.lines(rules.spindle_on(section.tool.spindle_speed, self.options.coolant));
                        out.line(format!("G0 Z{}", coord(self.options.safe_z)));
                    }
                    Some(_) => {}
                }
                current_tool = Some(&section.tool);

                for m in &section.moves {
                    out.line(self.spell(&rules, m, position));
                    if let Some(p) = m.end_point() {
                        position = p;
                    }
                }
            }
        }

        out.line(format!("G0 Z{}", coord(self.options.safe_z)));
        for word in rules.program_end(self.options.coolant) {
            out.line(word);
        }
        debug!(lines = out.count, dialect = %self.options.dialect, "Emitted G-code program");
        out.text
    }

    fn spell(&self, rules: &DialectRules, m: &ToolpathMove, from: Point) -> String {
        match *m {
            ToolpathMove::Rapid { to } => format!("G0 X{} Y{}", coord(to.x), coord(to.y)),
            ToolpathMove::Plunge { z, feed } => format!("G1 Z{} F{}", coord(z), rate(feed)),
            ToolpathMove::Linear { to, z, feed } => format!(
                "G1 X{} Y{} Z{} F{}",
                coord(to.x),
                coord(to.y),
                coord(z),
                rate(feed)
            ),
            ToolpathMove::Arc {
                to,
                center,
                direction,
                z,
                feed,
            } => {
                let code = match direction {
                    ArcDirection::Clockwise => "G2",
                    ArcDirection::CounterClockwise => "G3",
                };
                let (i, j) = rules.arc_center(from, center);
                format!(
                    "{} X{} Y{} Z{} I{} J{} F{}",
                    code,
                    coord(to.x),
                    coord(to.y),
                    coord(z),
                    coord(i),
                    coord(j),
                    rate(feed)
                )
            }
            ToolpathMove::Retract { z } => format!("G0 Z{}", coord(z)),
        }
    }
}

#[derive(Default)]
struct ProgramWriter {
    text: String,
    count: usize,
}

impl ProgramWriter {
    fn line(&mut self, line: impl AsRef<str>) {
        // writing into a String cannot fail
        let _ = writeln!(self.text, "{}", line.as_ref());
        self.count += 1;
    }

    fn lines<I: IntoIterator<Item = String>>(&mut self, lines: I) {
        for line in lines {
            self.line(line);
        }
    }
}
