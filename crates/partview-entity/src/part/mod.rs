//! Decomposed parts of a file record.

pub mod geometry;
pub mod model;

pub use geometry::Vec3;
pub use model::{NewPart, PartRecord};
