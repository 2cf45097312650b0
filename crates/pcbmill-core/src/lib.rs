//! # PcbMill Core
//!
//! Core types and utilities shared by the PcbMill crates.
//! Provides the error taxonomy, unit handling, and the tool and
//! machine dialect descriptions consumed by the toolpath planner.

pub mod data;
pub mod error;
pub mod units;

pub use data::{Dialect, MirrorAxis, Tool, ToolKind};

pub use error::{
    ConfigurationError, Error, GeometryError, InputKind, ParseError, PlanningError, Result,
};

pub use units::{Units, EPSILON, MM_PER_INCH};
