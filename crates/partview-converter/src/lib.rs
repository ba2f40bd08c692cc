//! # partview-converter
//!
//! Turns an uploaded CAD or mesh file into a GLB viewer container and a raw
//! part list by driving external tools.
//!
//! Two strategies exist. Mesh formats (STL, OBJ, PLY) go through a single
//! converter that prints part metadata on stdout. Solid formats (STEP,
//! IGES) run a CAD kernel that writes `parts.json`, then an assembler that
//! writes the container and a `node_map.json` side-file.
//!
//! Everything here is stateless apart from [`metrics::ConversionMetrics`];
//! persisting the results is the caller's job.

pub mod error;
pub mod filesystem;
pub mod format;
pub mod metadata;
pub mod metrics;
pub mod runner;
pub mod scripting;
pub mod stage;
pub mod strategy;

pub use error::ConversionError;
pub use format::ConversionFamily;
pub use metrics::{ConversionMetrics, MetricsSnapshot};
pub use runner::{ProcessCommand, ProcessOutput, ProcessRunner};
pub use strategy::{ConversionJob, ConversionOutput, ConversionStrategy, StrategyRegistry};
