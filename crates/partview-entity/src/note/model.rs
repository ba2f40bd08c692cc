//! Part note entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use partview_core::types::{NoteId, PartId};

/// A note on a part. At most one exists per part.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PartNote {
    /// Unique note identifier.
    pub id: NoteId,
    /// The annotated part.
    pub part_id: PartId,
    /// Note text.
    pub note: String,
    /// When the note was first saved.
    pub created_at: DateTime<Utc>,
    /// When the note was last changed.
    pub updated_at: DateTime<Utc>,
}
