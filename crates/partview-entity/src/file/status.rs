//! Ingestion status enumeration and the combined state written to stores.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Visible ingestion status of a file record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "file_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// Record created, conversion not yet started.
    Uploading,
    /// Conversion in progress.
    Processing,
    /// A viewer container was produced.
    Completed,
    /// Conversion failed. Terminal.
    Failed,
}

impl FileStatus {
    /// Check if the status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploading => "uploading",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status and container path as a single value.
///
/// Stores accept only this type when changing status, so a container path
/// exists exactly when the status is completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    /// Record created, conversion not yet started.
    Uploading,
    /// Conversion in progress.
    Processing,
    /// Conversion produced a container at `container_path`.
    Completed {
        /// Absolute path of the viewer container.
        container_path: String,
    },
    /// Conversion failed.
    Failed,
}

impl FileState {
    /// The status column value.
    pub fn status(&self) -> FileStatus {
        match self {
            Self::Uploading => FileStatus::Uploading,
            Self::Processing => FileStatus::Processing,
            Self::Completed { .. } => FileStatus::Completed,
            Self::Failed => FileStatus::Failed,
        }
    }

    /// The container path column value.
    pub fn container_path(&self) -> Option<&str> {
        match self {
            Self::Completed { container_path } => Some(container_path),
            _ => None,
        }
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status())
    }
}
