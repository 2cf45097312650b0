//! Data models shared between the planner and the emitter
//!
//! This module provides:
//! - Tool descriptions (mill bits and drill bits)
//! - G-code dialect selection
//! - Mirror axis selection for double-sided boards

pub mod tools;

pub use tools::{Tool, ToolKind};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Target controller flavour of the generated G-code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// Grbl: start-relative arc centers, `;` comments
    #[default]
    Grbl,
    /// USBCNC: absolute arc centers, parenthesised comments
    UsbCnc,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grbl => write!(f, "Grbl"),
            Self::UsbCnc => write!(f, "USBCNC"),
        }
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "grbl" => Ok(Self::Grbl),
            "usbcnc" | "usb-cnc" | "edingcnc" => Ok(Self::UsbCnc),
            _ => Err(format!("Unknown dialect: {}", s)),
        }
    }
}

/// Axis a board is mirrored across
///
/// `X` flips Y coordinates about a horizontal line, `Y` flips X coordinates
/// about a vertical line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MirrorAxis {
    /// No mirroring
    #[default]
    None,
    /// Mirror across the X axis (y' = 2r - y)
    X,
    /// Mirror across the Y axis (x' = 2r - x)
    Y,
}

impl fmt::Display for MirrorAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::X => write!(f, "x"),
            Self::Y => write!(f, "y"),
        }
    }
}

impl FromStr for MirrorAxis {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" | "" => Ok(Self::None),
            "x" => Ok(Self::X),
            "y" => Ok(Self::Y),
            _ => Err(format!("Unknown mirror axis: {}", s)),
        }
    }
}
