//! # PcbMill
//!
//! Converts printed-circuit board fabrication data into CNC milling programs:
//! - RS-274X Gerber copper and board-outline layers
//! - Excellon drill files
//! - Isolation routing, outline cutting with tabs, and drilling
//! - Grbl and USBCNC G-code output
//!
//! ## Architecture
//!
//! PcbMill is organized as a workspace with multiple crates:
//!
//! 1. **pcbmill-core** - Error taxonomy, units, tool and dialect descriptions
//! 2. **pcbmill-settings** - Milling configuration and validation
//! 3. **pcbmill-camtools** - Geometry, parsers, transforms, planner, emitter
//! 4. **pcbmill** - The [`Pipeline`] facade tying the stages together
//!
//! ## Example
//!
//! ```
//! use pcbmill::{BoardInputs, MillingConfig, Pipeline};
//!
//! let drill = "M48\nMETRIC\nT1C0.8\n%\nT1\nX10.0Y5.0\nM30\n";
//! let pipeline = Pipeline::new(MillingConfig::default()).unwrap();
//! let programs = pipeline.run(&BoardInputs::new().with_drill(drill)).unwrap();
//! assert!(programs.drill.is_some());
//! assert!(programs.combined.contains("G0 X10.0000 Y5.0000"));
//! ```

pub mod pipeline;

pub use pipeline::{BoardInputs, GeneratedPrograms, Pipeline};

pub use pcbmill_core::{
    ConfigurationError, Dialect, Error, GeometryError, InputKind, MirrorAxis, ParseError,
    PlanningError, Result, Tool, ToolKind, Units,
};

pub use pcbmill_settings::{
    DrillSettings, JoinKind, MachineSettings, MillingConfig, OriginMode, OutlineSettings,
    OutlineSide, PlacementSettings, TabSettings,
};

pub use pcbmill_camtools::{
    BoardModel, DrillHole, ExcellonParser, GcodeEmitter, GcodeOptions, GerberParser, Layer,
    LayerKind, Mirror, PathKind, Point, Polygon, Toolpath, ToolpathMove, ToolpathPlanner,
    ToolpathStats, Transform,
};

/// Version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for the embedding application
///
/// Honors `RUST_LOG`; falls back to `info`. Fails if a global subscriber is
/// already installed.
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into());

    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    tracing::info!(version = VERSION, "PcbMill logging initialized");
    Ok(())
}
