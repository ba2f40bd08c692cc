//! File record entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use partview_core::types::FileId;

use super::status::{FileState, FileStatus};

/// An uploaded CAD or mesh file and the outcome of its conversion.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FileRecord {
    /// Unique file identifier.
    pub id: FileId,
    /// Name supplied by the uploader (including extension).
    pub original_filename: String,
    /// Where the raw upload was written.
    pub stored_path: String,
    /// Upload size in bytes.
    pub size_bytes: i64,
    /// Absolute path of the viewer container; set only when completed.
    pub container_path: Option<String>,
    /// Current ingestion status.
    pub status: FileStatus,
    /// When the upload was accepted.
    pub uploaded_at: DateTime<Utc>,
}

impl FileRecord {
    /// Apply a state transition to this in-memory copy.
    pub fn apply_state(&mut self, state: &FileState) {
        self.status = state.status();
        self.container_path = state.container_path().map(str::to_owned);
    }
}

/// Data required to create a new file record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFileRecord {
    /// Name supplied by the uploader.
    pub original_filename: String,
    /// Where the raw upload was written.
    pub stored_path: String,
    /// Upload size in bytes.
    pub size_bytes: i64,
}
