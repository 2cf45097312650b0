//! Error handling for PcbMill
//!
//! Provides error types for every stage of the conversion:
//! - Parse errors (Gerber and Excellon input, always with a line number)
//! - Geometry errors (degenerate or oversized polygon work)
//! - Planning errors (valid geometry that yields no usable toolpath)
//! - Configuration errors (tool and machining parameters)
//!
//! All error types use `thiserror` for ergonomic error handling.

use std::fmt;
use thiserror::Error;

/// Parse error type
///
/// Raised by the Gerber and Excellon parsers. Parsing is fail-fast: the
/// first malformed block aborts the whole input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// Command code the parser does not understand
    #[error("Unknown command at line {line}: {command}")]
    UnknownCommand {
        /// The line where the command starts.
        line: usize,
        /// The offending command text.
        command: String,
    },

    /// Arc whose center cannot be determined
    #[error("Ambiguous arc at line {line}: {reason}")]
    AmbiguousArc {
        /// The line of the arc move.
        line: usize,
        /// Why no unique center was found.
        reason: String,
    },

    /// Drill tool selected or used without a definition
    #[error("Undefined tool T{tool} at line {line}")]
    UndefinedTool {
        /// The line of the selection or drill hit.
        line: usize,
        /// The tool index.
        tool: u32,
    },

    /// Aperture selected without a definition
    #[error("Undefined aperture D{code} at line {line}")]
    UndefinedAperture {
        /// The line of the selection.
        line: usize,
        /// The aperture number.
        code: u32,
    },

    /// Coordinates used before the format was declared
    #[error("Coordinate data at line {line} before a format specification")]
    MissingFormat {
        /// The line of the first coordinate.
        line: usize,
    },

    /// Numeric field that cannot be decoded
    #[error("Invalid number '{value}' at line {line}")]
    InvalidNumber {
        /// The line of the value.
        line: usize,
        /// The raw text.
        value: String,
    },

    /// Well-formed command with an unusable parameter
    #[error("Invalid parameter at line {line}: {reason}")]
    InvalidParameter {
        /// The line of the command.
        line: usize,
        /// The reason the parameter was rejected.
        reason: String,
    },

    /// Extended command block without its closing delimiter
    #[error("Unterminated block starting at line {line}")]
    UnterminatedBlock {
        /// The line where the block opened.
        line: usize,
    },

    /// Board outline drawing that does not form closed contours
    #[error("Open outline contour starting at ({x:.4}, {y:.4})")]
    OpenOutline {
        /// X of the dangling endpoint (mm).
        x: f64,
        /// Y of the dangling endpoint (mm).
        y: f64,
    },

    /// Geometry failure while building a primitive
    #[error("Invalid geometry at line {line}: {source}")]
    InvalidGeometry {
        /// The line of the primitive.
        line: usize,
        /// The underlying geometry error.
        #[source]
        source: GeometryError,
    },
}

impl ParseError {
    /// Line number the error refers to, when it has one
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::UnknownCommand { line, .. }
            | Self::AmbiguousArc { line, .. }
            | Self::UndefinedTool { line, .. }
            | Self::UndefinedAperture { line, .. }
            | Self::MissingFormat { line }
            | Self::InvalidNumber { line, .. }
            | Self::InvalidParameter { line, .. }
            | Self::UnterminatedBlock { line }
            | Self::InvalidGeometry { line, .. } => Some(*line),
            Self::OpenOutline { .. } => None,
        }
    }
}

/// Geometry error type
///
/// Boolean and offset operations never fail for valid input; these cover
/// degenerate rings and inputs too large to process.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Ring with fewer than three distinct vertices
    #[error("Degenerate ring: {vertices} distinct vertices, at least 3 required")]
    Degenerate {
        /// Number of distinct vertices left after cleanup.
        vertices: usize,
    },

    /// Operation input exceeds the vertex budget
    #[error("Geometry too complex: {vertices} vertices exceeds limit of {limit}")]
    TooComplex {
        /// Vertex count of the operation input.
        vertices: usize,
        /// The configured budget.
        limit: usize,
    },

    /// Non-finite or otherwise unusable numeric argument
    #[error("Invalid geometry parameter '{name}': {reason}")]
    InvalidParameter {
        /// The parameter name.
        name: String,
        /// The reason it was rejected.
        reason: String,
    },
}

/// Planning error type
///
/// The input geometry is valid but no meaningful toolpath can be produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanningError {
    /// Copper present but the offset and merge produced nothing to cut
    #[error("Isolation offset of layer '{layer}' produced no path")]
    EmptyIsolationPath {
        /// The copper layer name.
        layer: String,
    },

    /// Outline cutting requested without an outline layer
    #[error("No board outline available")]
    MissingOutline,

    /// Outline offset vanished because the tool is too large
    #[error("Outline too small for a {tool_diameter:.3}mm tool")]
    OutlineTooSmall {
        /// Diameter of the outline tool.
        tool_diameter: f64,
    },

    /// Geometry failure while planning
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Configuration error type
///
/// Detected by validation before any planning takes place.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    /// Parameter outside its legal range
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// The configuration field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// Parameter required by another setting is absent
    #[error("Missing value for {field}: {reason}")]
    MissingValue {
        /// The configuration field.
        field: String,
        /// What requires it.
        reason: String,
    },
}

impl ConfigurationError {
    /// Shorthand for an [`ConfigurationError::InvalidValue`]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Which input buffer an error came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputKind {
    /// Copper layer Gerber
    Copper,
    /// Board outline Gerber
    Outline,
    /// Excellon drill file
    Drill,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Copper => write!(f, "copper"),
            Self::Outline => write!(f, "outline"),
            Self::Drill => write!(f, "drill"),
        }
    }
}

/// Main error type for PcbMill
///
/// A unified error type that can represent any error from all stages.
/// This is the primary error type used in public APIs.
#[derive(Error, Debug)]
pub enum Error {
    /// Parse error
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Parse error tagged with the input it came from
    #[error("Failed to parse {input} input: {source}")]
    Input {
        /// The input buffer.
        input: InputKind,
        /// The underlying parse error.
        #[source]
        source: ParseError,
    },

    /// Geometry error
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// Planning error
    #[error(transparent)]
    Planning(#[from] PlanningError),

    /// Configuration error
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an error from a string message
    pub fn other(msg: impl Into<String>) -> Self {
        Error::Other(msg.into())
    }

    /// Attach the input kind to a parse error
    pub fn input(input: InputKind, source: ParseError) -> Self {
        Error::Input { input, source }
    }

    /// Check if this is a parse error
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Parse(_) | Error::Input { .. })
    }

    /// Check if this is a geometry error
    pub fn is_geometry_error(&self) -> bool {
        matches!(
            self,
            Error::Geometry(_) | Error::Planning(PlanningError::Geometry(_))
        )
    }

    /// Check if this is a planning error
    pub fn is_planning_error(&self) -> bool {
        matches!(self, Error::Planning(_))
    }

    /// Check if this is a configuration error
    pub fn is_configuration_error(&self) -> bool {
        matches!(self, Error::Configuration(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display_has_line() {
        let err = ParseError::UnknownCommand {
            line: 12,
            command: "G99".to_string(),
        };
        assert_eq!(err.to_string(), "Unknown command at line 12: G99");
        assert_eq!(err.line(), Some(12));
    }

    #[test]
    fn test_input_error_names_the_file() {
        let err = Error::input(
            InputKind::Drill,
            ParseError::UndefinedTool { line: 7, tool: 3 },
        );
        assert_eq!(
            err.to_string(),
            "Failed to parse drill input: Undefined tool T3 at line 7"
        );
        assert!(err.is_parse_error());
        assert!(!err.is_planning_error());
    }

    #[test]
    fn test_geometry_conversion() {
        let err: Error = PlanningError::from(GeometryError::TooComplex {
            vertices: 10,
            limit: 5,
        })
        .into();
        assert!(err.is_geometry_error());
        assert!(err.is_planning_error());
    }

    #[test]
    fn test_configuration_shorthand() {
        let err = ConfigurationError::invalid("tool_diameter", "must be > 0");
        assert_eq!(
            err.to_string(),
            "Invalid value for tool_diameter: must be > 0"
        );
    }
}
