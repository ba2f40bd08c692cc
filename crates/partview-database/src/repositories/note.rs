//! Part note repository.

use chrono::Utc;
use sqlx::PgPool;

use partview_core::error::{AppError, ErrorKind};
use partview_core::result::AppResult;
use partview_core::types::{NoteId, PartId};
use partview_entity::note::PartNote;

/// Repository for the `part_notes` table.
#[derive(Debug, Clone)]
pub struct NoteRepository {
    pool: PgPool,
}

impl NoteRepository {
    /// Create a new note repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert or replace the note of a part.
    pub async fn upsert(&self, part_id: PartId, note: &str) -> AppResult<PartNote> {
        let now = Utc::now();
        sqlx::query_as::<_, PartNote>(
            "INSERT INTO part_notes (id, part_id, note, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $4) \
             ON CONFLICT (part_id) DO UPDATE SET note = EXCLUDED.note, updated_at = EXCLUDED.updated_at \
             RETURNING *",
        )
        .bind(NoteId::new())
        .bind(part_id)
        .bind(note)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to save note", e))
    }

    /// Find the note of a part.
    pub async fn find_by_part(&self, part_id: PartId) -> AppResult<Option<PartNote>> {
        sqlx::query_as::<_, PartNote>("SELECT * FROM part_notes WHERE part_id = $1")
            .bind(part_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find note", e))
    }

    /// Delete the note of a part.
    pub async fn delete_by_part(&self, part_id: PartId) -> AppResult<bool> {
        sqlx::query("DELETE FROM part_notes WHERE part_id = $1")
            .bind(part_id)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected() > 0)
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete note", e))
    }
}
