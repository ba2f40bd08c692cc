//! Upload classification by file extension.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConversionError;

/// Extensions converted by the single-stage mesh path.
pub const MESH_EXTENSIONS: &[&str] = &["stl", "obj", "ply"];

/// Extensions converted by the two-stage solid path.
pub const SOLID_EXTENSIONS: &[&str] = &["step", "stp", "igs", "iges"];

/// Every accepted extension, mesh first.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["stl", "obj", "ply", "step", "stp", "igs", "iges"];

/// Which conversion strategy an upload needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionFamily {
    /// Triangle meshes.
    Mesh,
    /// B-rep solids that must be decomposed by a CAD kernel.
    Solid,
}

impl ConversionFamily {
    /// Classify a lowercase or mixed-case extension without the dot.
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_ascii_lowercase();
        if MESH_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Mesh)
        } else if SOLID_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Solid)
        } else {
            None
        }
    }

    /// Classify an uploaded file name.
    pub fn from_filename(filename: &str) -> Result<Self, ConversionError> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| ConversionError::UnsupportedFormat {
                filename: filename.to_string(),
            })
    }

    /// Return the family as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mesh => "mesh",
            Self::Solid => "solid",
        }
    }
}

impl fmt::Display for ConversionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
