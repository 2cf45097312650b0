//! Excellon drill file parser
//!
//! Reads the `M48` header tool table and the drill hits that follow. Each hit
//! resolves the selected tool to a finished diameter and becomes a
//! [`DrillHole`] in millimeters. Routing commands are rejected.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::{debug, info, warn};

use pcbmill_core::{ParseError, Units};

use crate::board::DrillHole;
use crate::geometry::Point;

/// Which zeros an implied-decimal coordinate keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ZeroMode {
    /// `,LZ`: leading zeros present, trailing zeros dropped
    LeadingKept,
    /// `,TZ`: trailing zeros present, leading zeros dropped
    TrailingKept,
}

#[derive(Debug, Clone, Copy)]
struct ToolDefinition {
    diameter: f64,
    plated: bool,
}

fn tool_regex() -> &'static Regex {
    static TOOL_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    TOOL_REGEX.get_or_init(|| {
        Regex::new(r"^T(\d+)((?:[A-Z][+-]?[\d.]*)*)$").expect("invalid regex pattern")
    })
}

fn coordinate_regex() -> &'static Regex {
    static COORD_REGEX: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
    COORD_REGEX.get_or_init(|| {
        Regex::new(r"^(?:G05)?(?:X([+-]?[\d.]+))?(?:Y([+-]?[\d.]+))?$")
            .expect("invalid regex pattern")
    })
}

/// Parser state for one drill file
struct ParserState {
    units: Units,
    zeros: ZeroMode,
    /// Explicit `000.000` style format from the units line
    format: Option<(usize, usize)>,
    incremental: bool,
    in_header: bool,
    plated: bool,
    tools: BTreeMap<u32, ToolDefinition>,
    current_tool: Option<u32>,
    position: Point,
    holes: Vec<DrillHole>,
    line: usize,
}

impl ParserState {
    fn new(units: Units) -> Self {
        Self {
            units,
            zeros: ZeroMode::TrailingKept,
            format: None,
            incremental: false,
            in_header: false,
            plated: true,
            tools: BTreeMap::new(),
            current_tool: None,
            position: Point::origin(),
            holes: Vec::new(),
            line: 0,
        }
    }

    fn unknown(&self, command: &str) -> ParseError {
        ParseError::UnknownCommand {
            line: self.line,
            command: command.to_string(),
        }
    }

    fn invalid_number(&self, value: &str) -> ParseError {
        ParseError::InvalidNumber {
            line: self.line,
            value: value.to_string(),
        }
    }

    /// Handle one line; returns `false` at program end
    fn process(&mut self, text: &str) -> Result<bool, ParseError> {
        if let Some(comment) = text.strip_prefix(';') {
            self.comment(comment);
            return Ok(true);
        }

        match text {
            "M48" => {
                self.in_header = true;
                return Ok(true);
            }
            "%" | "M95" => {
                self.in_header = false;
                return Ok(true);
            }
            "M30" | "M00" => return Ok(false),
            "M71" => {
                self.units = Units::Millimeters;
                return Ok(true);
            }
            "M72" => {
                self.units = Units::Inches;
                return Ok(true);
            }
            "G90" => {
                self.incremental = false;
                return Ok(true);
            }
            "G91" => {
                self.incremental = true;
                return Ok(true);
            }
            "G05" => return Ok(true),
            "G00" | "G01" | "G02" | "G03" | "G85" | "M15" | "M16" | "M17" => {
                return Err(self.unknown(text))
            }
            _ => {}
        }

        if text.starts_with("METRIC") || text.starts_with("INCH") {
            return self.units_line(text).map(|_| true);
        }
        if let Some(state) = text.strip_prefix("ICI") {
            self.incremental = state.trim_start_matches(',') != "OFF";
            return Ok(true);
        }
        if ["FMAT", "VER", "DETECT", "ATC"]
            .iter()
            .any(|p| text.starts_with(p))
        {
            debug!(line = self.line, command = text, "Ignoring header directive");
            return Ok(true);
        }
        if text.starts_with('T') {
            return self.tool(text).map(|_| true);
        }
        if text.starts_with('X') || text.starts_with('Y') || text.starts_with("G05X") {
            return self.hit(text).map(|_| true);
        }
        Err(self.unknown(text))
    }

    fn comment(&mut self, comment: &str) {
        let comment = comment.trim();
        let attribute = comment.strip_prefix("#@!").map(str::trim).unwrap_or(comment);
        if attribute.starts_with("TA.AperFunction") {
            if attribute.contains("NonPlated") {
                self.plated = false;
            } else if attribute.contains("Plated") {
                self.plated = true;
            }
        }
    }

    fn units_line(&mut self, text: &str) -> Result<(), ParseError> {
        let mut parts = text.split(',');
        self.units = match parts.next() {
            Some("METRIC") => Units::Millimeters,
            _ => Units::Inches,
        };
        for part in parts {
            match part {
                "LZ" => self.zeros = ZeroMode::LeadingKept,
                "TZ" => self.zeros = ZeroMode::TrailingKept,
                format if format.contains('.') => {
                    let (int, dec) = format.split_once('.').unwrap_or((format, ""));
                    self.format = Some((int.len(), dec.len()));
                }
                other => return Err(self.unknown(&format!("{} ({})", text, other))),
            }
        }
        debug!(line = self.line, units = %self.units, zeros = ?self.zeros, "Drill units");
        Ok(())
    }

    fn tool(&mut self, text: &str) -> Result<(), ParseError> {
        let caps = tool_regex()
            .captures(text)
            .ok_or_else(|| self.unknown(text))?;
        let number = caps
            .get(1)
            .and_then(|m| m.as_str().parse::<u32>().ok())
            .ok_or_else(|| self.invalid_number(text))?;
        let modifiers = caps.get(2).map(|m| m.as_str()).unwrap_or_default();

        if let Some(diameter) = modifier(modifiers, 'C') {
            let diameter = diameter
                .parse::<f64>()
                .map_err(|_| self.invalid_number(diameter))?;
            if !diameter.is_finite() || diameter <= 0.0 {
                return Err(ParseError::InvalidParameter {
                    line: self.line,
                    reason: format!("tool T{} has non-positive diameter {}", number, diameter),
                });
            }
            let definition = ToolDefinition {
                diameter: self.units.to_mm(diameter),
                plated: self.plated,
            };
            if self.tools.insert(number, definition).is_some() {
                warn!(line = self.line, tool = number, "Tool redefined; last definition wins");
            }
            debug!(line = self.line, tool = number, diameter = definition.diameter, "Tool defined");
            if !self.in_header {
                self.current_tool = Some(number);
            }
            return Ok(());
        }

        if number == 0 {
            self.current_tool = None;
            return Ok(());
        }
        if !self.tools.contains_key(&number) {
            return Err(ParseError::UndefinedTool {
                line: self.line,
                tool: number,
            });
        }
        self.current_tool = Some(number);
        Ok(())
    }

    fn decode(&self, text: &str) -> Result<f64, ParseError> {
        let value = if text.contains('.') {
            text.parse::<f64>()
                .map_err(|_| self.invalid_number(text))?
        } else {
            let (negative, digits) = match text.as_bytes().first() {
                Some(b'-') => (true, &text[1..]),
                Some(b'+') => (false, &text[1..]),
                _ => (false, text),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(self.invalid_number(text));
            }
            let (integer, decimal) = self.format.unwrap_or(match self.units {
                Units::Millimeters => (3, 3),
                Units::Inches => (2, 4),
            });
            let padded = match self.zeros {
                ZeroMode::LeadingKept => format!("{:0<width$}", digits, width = integer + decimal),
                ZeroMode::TrailingKept => digits.to_string(),
            };
            let raw = padded
                .parse::<f64>()
                .map_err(|_| self.invalid_number(text))?;
            let magnitude = raw / 10f64.powi(decimal as i32);
            if negative {
                -magnitude
            } else {
                magnitude
            }
        };
        Ok(self.units.to_mm(value))
    }

    fn hit(&mut self, text: &str) -> Result<(), ParseError> {
        let caps = coordinate_regex()
            .captures(text)
            .ok_or_else(|| self.unknown(text))?;
        let x = caps.get(1).map(|m| self.decode(m.as_str())).transpose()?;
        let y = caps.get(2).map(|m| self.decode(m.as_str())).transpose()?;

        self.position = if self.incremental {
            Point::new(
                self.position.x + x.unwrap_or(0.0),
                self.position.y + y.unwrap_or(0.0),
            )
        } else {
            Point::new(x.unwrap_or(self.position.x), y.unwrap_or(self.position.y))
        };

        let number = self.current_tool.ok_or(ParseError::UndefinedTool {
            line: self.line,
            tool: 0,
        })?;
        let tool = self.tools.get(&number).ok_or(ParseError::UndefinedTool {
            line: self.line,
            tool: number,
        })?;
        self.holes.push(DrillHole {
            position: self.position,
            diameter: tool.diameter,
            plated: tool.plated,
            tool: number,
        });
        Ok(())
    }
}

/// Value following `letter` in a run of modifier words like `F200S65C0.8`
fn modifier(words: &str, letter: char) -> Option<&str> {
    let start = words.find(letter)? + letter.len_utf8();
    let rest = &words[start..];
    let end = rest
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Excellon parser
///
/// # Examples
///
/// ```
/// use pcbmill_camtools::ExcellonParser;
///
/// let text = "M48\nMETRIC\nT1C0.8\n%\nT1\nX0Y0\nX50.0Y0\nM30\n";
/// let holes = ExcellonParser::new().parse(text).unwrap();
/// assert_eq!(holes.len(), 2);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ExcellonParser {
    units_hint: Units,
}

impl ExcellonParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Units assumed until the file declares `METRIC` or `INCH`
    pub fn with_units_hint(mut self, units: Units) -> Self {
        self.units_hint = units;
        self
    }

    /// Parse a complete drill buffer; holes keep file order and duplicates
    pub fn parse(&self, text: &str) -> Result<Vec<DrillHole>, ParseError> {
        let mut state = ParserState::new(self.units_hint);
        for (index, raw) in text.lines().enumerate() {
            state.line = index + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if !state.process(line)? {
                break;
            }
        }
        info!(
            holes = state.holes.len(),
            tools = state.tools.len(),
            "Parsed Excellon drill file"
        );
        Ok(state.holes)
    }
}
