//! Part renaming and notes.

use std::sync::Arc;

use tracing::info;

use partview_core::error::AppError;
use partview_core::result::AppResult;
use partview_core::types::{FileId, PartId};
use partview_database::{NoteStore, RecordStore};
use partview_entity::note::PartNote;
use partview_entity::part::PartRecord;

/// User edits on parts: display names and notes.
#[derive(Debug, Clone)]
pub struct PartService {
    /// Part persistence.
    records: Arc<dyn RecordStore>,
    /// Note persistence.
    notes: Arc<dyn NoteStore>,
}

impl PartService {
    /// Creates a new part service.
    pub fn new(records: Arc<dyn RecordStore>, notes: Arc<dyn NoteStore>) -> Self {
        Self { records, notes }
    }

    /// Set the display name override of a part; blank resets it.
    pub async fn rename(&self, part_id: PartId, display_name: &str) -> AppResult<PartRecord> {
        let part = self
            .records
            .update_display_name(part_id, normalize(display_name))
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {part_id} not found")))?;
        info!(part_id = %part_id, display_name = ?part.display_name, "Part renamed");
        Ok(part)
    }

    /// Same as [`rename`](Self::rename), addressing the part by its key.
    pub async fn rename_by_key(
        &self,
        file_id: FileId,
        part_key: &str,
        display_name: &str,
    ) -> AppResult<PartRecord> {
        let part = self
            .records
            .update_display_name_by_key(file_id, part_key, normalize(display_name))
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("Part '{part_key}' not found in file {file_id}"))
            })?;
        info!(file_id = %file_id, part_key, display_name = ?part.display_name, "Part renamed");
        Ok(part)
    }

    /// Insert or replace the note of a part.
    pub async fn save_note(&self, part_id: PartId, note: &str) -> AppResult<PartNote> {
        self.require_part(part_id).await?;
        self.notes.upsert_note(part_id, note).await
    }

    /// Remove the note of a part. Deleting an absent note succeeds.
    pub async fn delete_note(&self, part_id: PartId) -> AppResult<()> {
        self.require_part(part_id).await?;
        let existed = self.notes.delete_note(part_id).await?;
        if existed {
            info!(part_id = %part_id, "Part note deleted");
        }
        Ok(())
    }

    async fn require_part(&self, part_id: PartId) -> AppResult<PartRecord> {
        self.records
            .find_part(part_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {part_id} not found")))
    }
}

fn normalize(display_name: &str) -> Option<&str> {
    let trimmed = display_name.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
