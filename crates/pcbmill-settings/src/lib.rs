//! PcbMill Settings Crate
//!
//! Holds the milling configuration handed to the pipeline by the embedding
//! application, and validates it before any planning takes place.

pub mod config;

pub use config::{
    DrillSettings, JoinKind, MachineSettings, MillingConfig, OriginMode, OutlineSettings,
    OutlineSide, PlacementSettings, TabSettings,
};
