//! Read-side use cases over file records, parts, and notes.

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use partview_core::error::AppError;
use partview_core::result::AppResult;
use partview_core::types::{FileId, PartId};
use partview_database::{NoteStore, RecordStore};
use partview_entity::file::{FileRecord, FileStatus};
use partview_entity::note::PartNote;
use partview_entity::part::PartRecord;

/// A part with its note, if any.
#[derive(Debug, Clone, Serialize)]
pub struct PartDetails {
    /// The part row.
    pub part: PartRecord,
    /// The attached note.
    pub note: Option<PartNote>,
}

/// A file record with its current parts.
#[derive(Debug, Clone, Serialize)]
pub struct FileDetails {
    /// The file record.
    pub file: FileRecord,
    /// Parts in insertion order.
    pub parts: Vec<PartDetails>,
}

/// Lookups for files, parts, and containers.
#[derive(Debug, Clone)]
pub struct FileQueryService {
    records: Arc<dyn RecordStore>,
    notes: Arc<dyn NoteStore>,
}

impl FileQueryService {
    /// Creates a new query service.
    pub fn new(records: Arc<dyn RecordStore>, notes: Arc<dyn NoteStore>) -> Self {
        Self { records, notes }
    }

    /// All file records, newest first.
    pub async fn list_files(&self) -> AppResult<Vec<FileRecord>> {
        self.records.list_files().await
    }

    /// One file with its parts and their notes.
    pub async fn get_file(&self, id: FileId) -> AppResult<FileDetails> {
        let file = self.find_file(id).await?;
        let parts = self.records.find_parts(id).await?;
        let parts = self.attach_notes(parts).await?;
        Ok(FileDetails { file, parts })
    }

    /// Parts of a file in insertion order.
    pub async fn list_parts(&self, file_id: FileId) -> AppResult<Vec<PartDetails>> {
        self.find_file(file_id).await?;
        let parts = self.records.find_parts(file_id).await?;
        self.attach_notes(parts).await
    }

    /// One part with its note.
    pub async fn get_part(&self, id: PartId) -> AppResult<PartDetails> {
        let part = self
            .records
            .find_part(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Part {id} not found")))?;
        let note = self.notes.find_note(id).await?;
        Ok(PartDetails { part, note })
    }

    /// Location of the viewer container of a completed file.
    ///
    /// `NotFound` unless the file completed and the container is on disk.
    pub async fn container_file(&self, id: FileId) -> AppResult<PathBuf> {
        let file = self.find_file(id).await?;
        let path = match (file.status, file.container_path) {
            (FileStatus::Completed, Some(path)) => PathBuf::from(path),
            (status, _) => {
                return Err(AppError::not_found(format!(
                    "No container for file {id} (status {status})"
                )));
            }
        };

        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(AppError::not_found(format!(
                "Container for file {id} is missing on disk"
            )));
        }
        Ok(path)
    }

    async fn find_file(&self, id: FileId) -> AppResult<FileRecord> {
        self.records
            .find_file(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }

    async fn attach_notes(&self, parts: Vec<PartRecord>) -> AppResult<Vec<PartDetails>> {
        let mut details = Vec::with_capacity(parts.len());
        for part in parts {
            let note = self.notes.find_note(part.id).await?;
            details.push(PartDetails { part, note });
        }
        Ok(details)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use partview_core::error::ErrorKind;
    use partview_database::MemoryStore;
    use partview_entity::file::{CreateFileRecord, FileState};
    use partview_entity::part::NewPart;

    fn part(key: &str) -> NewPart {
        NewPart {
            name: key.to_string(),
            display_name: None,
            part_key: key.to_string(),
            node_index: None,
            node_path: None,
            parent_key: None,
            position: None,
            size: None,
        }
    }

    async fn seeded() -> (Arc<MemoryStore>, FileQueryService, FileRecord) {
        let store = Arc::new(MemoryStore::new());
        let file = store
            .create_file(&CreateFileRecord {
                original_filename: "gear.step".to_string(),
                stored_path: "/tmp/gear.step".to_string(),
                size_bytes: 10,
            })
            .await
            .unwrap();
        let query = FileQueryService::new(store.clone(), store.clone());
        (store, query, file)
    }

    #[tokio::test]
    async fn test_get_file_includes_parts_and_notes() {
        let (store, query, file) = seeded().await;
        let parts = store
            .replace_parts(file.id, &[part("hub"), part("tooth")])
            .await
            .unwrap();
        store.upsert_note(parts[1].id, "check fillet").await.unwrap();

        let details = query.get_file(file.id).await.unwrap();
        assert_eq!(details.parts.len(), 2);
        assert_eq!(details.parts[0].part.part_key, "hub");
        assert!(details.parts[0].note.is_none());
        assert_eq!(details.parts[1].note.as_ref().unwrap().note, "check fillet");
    }

    #[tokio::test]
    async fn test_unknown_ids_are_not_found() {
        let (_store, query, _file) = seeded().await;
        assert_eq!(query.get_file(FileId::new()).await.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(query.get_part(PartId::new()).await.unwrap_err().kind, ErrorKind::NotFound);
        assert_eq!(query.list_parts(FileId::new()).await.unwrap_err().kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_container_requires_completed_and_existing_file() {
        let (store, query, file) = seeded().await;
        let err = query.container_file(file.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let dir = tempfile::tempdir().unwrap();
        let glb = dir.path().join("gear.glb");
        store
            .update_state(
                file.id,
                &FileState::Completed {
                    container_path: glb.to_string_lossy().into_owned(),
                },
            )
            .await
            .unwrap();
        assert_eq!(query.container_file(file.id).await.unwrap_err().kind, ErrorKind::NotFound);

        std::fs::write(&glb, b"glTF").unwrap();
        assert_eq!(query.container_file(file.id).await.unwrap(), glb);
    }
}
