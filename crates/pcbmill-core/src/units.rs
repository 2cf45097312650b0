//! Unit conversion utilities
//!
//! All internal geometry is in millimeters. Input files may declare inches,
//! which are converted once at parse time.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Millimeters per inch
pub const MM_PER_INCH: f64 = 25.4;

/// Tolerance (mm) for every equality and containment test
pub const EPSILON: f64 = 1e-6;

/// Length unit of an input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    /// Millimeters
    #[default]
    Millimeters,
    /// Inches
    Inches,
}

impl Units {
    /// Multiplier converting a value in these units to millimeters
    pub fn to_mm_factor(self) -> f64 {
        match self {
            Self::Millimeters => 1.0,
            Self::Inches => MM_PER_INCH,
        }
    }

    /// Convert a value in these units to millimeters
    pub fn to_mm(self, value: f64) -> f64 {
        value * self.to_mm_factor()
    }
}

impl fmt::Display for Units {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millimeters => write!(f, "mm"),
            Self::Inches => write!(f, "inch"),
        }
    }
}

impl FromStr for Units {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mm" | "millimeters" | "metric" => Ok(Self::Millimeters),
            "in" | "inch" | "inches" | "imperial" => Ok(Self::Inches),
            _ => Err(format!("Unknown units: {}", s)),
        }
    }
}

/// True when two lengths are equal within [`EPSILON`]
pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inch_conversion() {
        assert!((Units::Inches.to_mm(1.0) - 25.4).abs() < 1e-12);
        assert_eq!(Units::Millimeters.to_mm(3.5), 3.5);
    }

    #[test]
    fn test_from_str() {
        assert_eq!("MM".parse::<Units>().unwrap(), Units::Millimeters);
        assert_eq!("inch".parse::<Units>().unwrap(), Units::Inches);
        assert!("furlong".parse::<Units>().is_err());
    }

    #[test]
    fn test_approx_eq() {
        assert!(approx_eq(1.0, 1.0 + 5e-7));
        assert!(!approx_eq(1.0, 1.00001));
    }
}
