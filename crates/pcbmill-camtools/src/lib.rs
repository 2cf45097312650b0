//! # PcbMill CAM Tools
//!
//! This crate turns printed-circuit board fabrication data into machining
//! programs for a CNC mill.
//!
//! ## Stages
//!
//! - **Geometry**: points, arcs, polygons with holes, boolean operations and offsetting
//! - **Gerber**: RS-274X parser producing copper or outline layers
//! - **Excellon**: drill file parser producing hole records
//! - **Transform**: mirroring and translation of a board model
//! - **Toolpath**: isolation routing, outline cutting and drilling plans
//! - **G-code**: Grbl and USBCNC program emission
//!
//! ## Supporting Infrastructure
//!
//! - **Arc Expander**: tolerance-driven flattening of arcs and circles
//! - **Stats**: travel and cut distance accounting for planned paths

pub mod arc_expander;
pub mod board;
pub mod excellon;
pub mod gcode;
pub mod geometry;
pub mod gerber;
pub mod toolpath;
pub mod transform;

pub use arc_expander::{ArcExpander, ArcExpanderConfig};
pub use board::{BoardModel, DrillHole, Layer, LayerKind};
pub use excellon::ExcellonParser;
pub use gcode::{GcodeEmitter, GcodeOptions};
pub use geometry::{
    BoundingBox, Containment, FillRule, JoinStyle, Point, Polygon, Polyline, Ring, Winding,
};
pub use gerber::{GerberParser, ShapeResolver};
pub use toolpath::{
    DrillParameters, IsolationParameters, NearestNeighbor, OutlineParameters, PathKind,
    PathOrdering, Toolpath, ToolpathMove, ToolpathPlanner, ToolpathSection, ToolpathStats,
    TravelComparison,
};
pub use transform::{Mirror, Transform};
