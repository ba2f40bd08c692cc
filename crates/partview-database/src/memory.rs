//! Process-local record store.
//!
//! Backs development runs (`provider = "memory"`) and every service-level
//! test. Parts of one file live in a single map entry, so replacing them is
//! one swap under the entry's shard lock.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use partview_core::error::AppError;
use partview_core::result::AppResult;
use partview_core::types::{FileId, NoteId, PartId};
use partview_entity::file::{CreateFileRecord, FileRecord, FileState, FileStatus};
use partview_entity::note::PartNote;
use partview_entity::part::{NewPart, PartRecord};

use crate::store::{NoteStore, RecordStore};

/// In-memory implementation of [`RecordStore`] and [`NoteStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    files: DashMap<FileId, FileRecord>,
    parts: DashMap<FileId, Vec<PartRecord>>,
    notes: DashMap<PartId, PartNote>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn rename_where<F>(
        &self,
        file_id: Option<FileId>,
        matches: F,
        display_name: Option<&str>,
    ) -> Option<PartRecord>
    where
        F: Fn(&PartRecord) -> bool,
    {
        for mut entry in self.parts.iter_mut() {
            if file_id.is_some_and(|id| id != *entry.key()) {
                continue;
            }
            if let Some(part) = entry.value_mut().iter_mut().find(|p| matches(p)) {
                part.display_name = display_name.map(str::to_owned);
                return Some(part.clone());
            }
        }
        None
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create_file(&self, data: &CreateFileRecord) -> AppResult<FileRecord> {
        let record = FileRecord {
            id: FileId::new(),
            original_filename: data.original_filename.clone(),
            stored_path: data.stored_path.clone(),
            size_bytes: data.size_bytes,
            container_path: None,
            status: FileStatus::Uploading,
            uploaded_at: Utc::now(),
        };
        self.files.insert(record.id, record.clone());
        Ok(record)
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        Ok(self.files.get(&id).map(|r| r.value().clone()))
    }

    async fn list_files(&self) -> AppResult<Vec<FileRecord>> {
        let mut files: Vec<FileRecord> = self.files.iter().map(|r| r.value().clone()).collect();
        files.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at).then(b.id.cmp(&a.id)));
        Ok(files)
    }

    async fn update_state(&self, id: FileId, state: &FileState) -> AppResult<FileRecord> {
        let mut record = self
            .files
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))?;
        record.apply_state(state);
        Ok(record.clone())
    }

    async fn replace_parts(
        &self,
        file_id: FileId,
        parts: &[NewPart],
    ) -> AppResult<Vec<PartRecord>> {
        if !self.files.contains_key(&file_id) {
            return Err(AppError::not_found(format!("File {file_id} not found")));
        }

        let mut seen = std::collections::HashSet::new();
        for part in parts {
            if part.part_key.trim().is_empty() {
                return Err(AppError::database("part_key must not be empty"));
            }
            if !seen.insert(part.part_key.as_str()) {
                return Err(AppError::database(format!(
                    "duplicate part_key '{}' for file {file_id}",
                    part.part_key
                )));
            }
        }

        let rows: Vec<PartRecord> = parts
            .iter()
            .enumerate()
            .map(|(ordinal, part)| PartRecord::from_new(file_id, ordinal as i32, part))
            .collect();

        let previous = self.parts.insert(file_id, rows.clone());
        for old in previous.unwrap_or_default() {
            self.notes.remove(&old.id);
        }
        Ok(rows)
    }

    async fn find_parts(&self, file_id: FileId) -> AppResult<Vec<PartRecord>> {
        Ok(self
            .parts
            .get(&file_id)
            .map(|r| r.value().clone())
            .unwrap_or_default())
    }

    async fn find_part(&self, id: PartId) -> AppResult<Option<PartRecord>> {
        Ok(self
            .parts
            .iter()
            .find_map(|entry| entry.value().iter().find(|p| p.id == id).cloned()))
    }

    async fn update_node_index(
        &self,
        file_id: FileId,
        part_key: &str,
        node_index: i32,
    ) -> AppResult<u64> {
        let Some(mut parts) = self.parts.get_mut(&file_id) else {
            return Ok(0);
        };
        let mut updated = 0;
        for part in parts.iter_mut().filter(|p| p.part_key == part_key) {
            part.node_index = Some(node_index);
            updated += 1;
        }
        Ok(updated)
    }

    async fn update_display_name(
        &self,
        id: PartId,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>> {
        Ok(self.rename_where(None, |p| p.id == id, display_name))
    }

    async fn update_display_name_by_key(
        &self,
        file_id: FileId,
        part_key: &str,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>> {
        Ok(self.rename_where(Some(file_id), |p| p.part_key == part_key, display_name))
    }
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn upsert_note(&self, part_id: PartId, note: &str) -> AppResult<PartNote> {
        if self.find_part(part_id).await?.is_none() {
            return Err(AppError::not_found(format!("Part {part_id} not found")));
        }
        let now = Utc::now();
        let mut entry = self.notes.entry(part_id).or_insert_with(|| PartNote {
            id: NoteId::new(),
            part_id,
            note: String::new(),
            created_at: now,
            updated_at: now,
        });
        entry.note = note.to_string();
        entry.updated_at = now;
        Ok(entry.clone())
    }

    async fn find_note(&self, part_id: PartId) -> AppResult<Option<PartNote>> {
        Ok(self.notes.get(&part_id).map(|r| r.value().clone()))
    }

    async fn delete_note(&self, part_id: PartId) -> AppResult<bool> {
        Ok(self.notes.remove(&part_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_data(name: &str) -> CreateFileRecord {
        CreateFileRecord {
            original_filename: name.to_string(),
            stored_path: format!("/tmp/{name}"),
            size_bytes: 10,
        }
    }

    fn part(key: &str) -> NewPart {
        NewPart {
            name: key.to_uppercase(),
            display_name: None,
            part_key: key.to_string(),
            node_index: None,
            node_path: None,
            parent_key: None,
            position: None,
            size: None,
        }
    }

    #[tokio::test]
    async fn test_create_starts_uploading() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.stl")).await.unwrap();
        assert_eq!(file.status, FileStatus::Uploading);
        assert!(file.container_path.is_none());
    }

    #[tokio::test]
    async fn test_replace_parts_drops_previous_set_and_notes() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.step")).await.unwrap();

        let first = store.replace_parts(file.id, &[part("a"), part("b")]).await.unwrap();
        store.upsert_note(first[0].id, "check torque").await.unwrap();

        let second = store.replace_parts(file.id, &[part("c")]).await.unwrap();
        assert_eq!(second.len(), 1);

        let stored = store.find_parts(file.id).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].part_key, "c");
        assert!(store.find_note(first[0].id).await.unwrap().is_none());

        store.replace_parts(file.id, &[]).await.unwrap();
        assert!(store.find_parts(file.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_parts_rejects_duplicate_keys() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.step")).await.unwrap();
        store.replace_parts(file.id, &[part("a")]).await.unwrap();

        assert!(store.replace_parts(file.id, &[part("x"), part("x")]).await.is_err());
        let stored = store.find_parts(file.id).await.unwrap();
        assert_eq!(stored[0].part_key, "a");
    }

    #[tokio::test]
    async fn test_update_node_index_reports_rows() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.step")).await.unwrap();
        store.replace_parts(file.id, &[part("a"), part("b")]).await.unwrap();

        assert_eq!(store.update_node_index(file.id, "b", 7).await.unwrap(), 1);
        assert_eq!(store.update_node_index(file.id, "zzz", 1).await.unwrap(), 0);

        let parts = store.find_parts(file.id).await.unwrap();
        assert_eq!(parts[1].node_index, Some(7));
        assert_eq!(parts[0].node_index, None);
    }

    #[tokio::test]
    async fn test_update_state_writes_container_with_status() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.stl")).await.unwrap();
        let done = store
            .update_state(
                file.id,
                &FileState::Completed {
                    container_path: "/out/a.glb".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(done.status, FileStatus::Completed);
        assert_eq!(done.container_path.as_deref(), Some("/out/a.glb"));

        let missing = store.update_state(FileId::new(), &FileState::Failed).await;
        assert!(missing.is_err());
    }

    #[tokio::test]
    async fn test_rename_by_key_and_id() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.step")).await.unwrap();
        let parts = store.replace_parts(file.id, &[part("a")]).await.unwrap();

        let renamed = store
            .update_display_name_by_key(file.id, "a", Some("Housing"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.display_name.as_deref(), Some("Housing"));

        let cleared = store.update_display_name(parts[0].id, None).await.unwrap().unwrap();
        assert!(cleared.display_name.is_none());
        assert!(
            store
                .update_display_name_by_key(FileId::new(), "a", Some("x"))
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_note_upsert_and_delete() {
        let store = MemoryStore::new();
        let file = store.create_file(&create_data("a.step")).await.unwrap();
        let parts = store.replace_parts(file.id, &[part("a")]).await.unwrap();

        let first = store.upsert_note(parts[0].id, "one").await.unwrap();
        let second = store.upsert_note(parts[0].id, "two").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.note, "two");

        assert!(store.delete_note(parts[0].id).await.unwrap());
        assert!(!store.delete_note(parts[0].id).await.unwrap());
        assert!(store.upsert_note(PartId::new(), "x").await.is_err());
    }
}
