//! HTTP handlers, grouped by resource.

pub mod cad;
pub mod health;
pub mod part;
