//! Small geometric value objects.

use serde::{Deserialize, Serialize};

/// A three-component vector used for part placement and extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    /// Construct a vector from its components.
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Take the first three components of `values`.
    ///
    /// Returns `None` when fewer than three are present; extra components
    /// are ignored.
    pub fn from_slice(values: &[f64]) -> Option<Self> {
        match values {
            [x, y, z, ..] => Some(Self::new(*x, *y, *z)),
            _ => None,
        }
    }
}
