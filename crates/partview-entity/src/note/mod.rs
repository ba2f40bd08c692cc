//! Free-text notes attached to parts.

pub mod model;

pub use model::PartNote;
