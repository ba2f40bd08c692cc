//! PostgreSQL repositories and the store built from them.

pub mod file;
pub mod note;
pub mod part;

use async_trait::async_trait;
use sqlx::PgPool;

use partview_core::result::AppResult;
use partview_core::types::{FileId, PartId};
use partview_entity::file::{CreateFileRecord, FileRecord, FileState};
use partview_entity::note::PartNote;
use partview_entity::part::{NewPart, PartRecord};

use crate::store::{NoteStore, RecordStore};

pub use file::FileRepository;
pub use note::NoteRepository;
pub use part::PartRepository;

/// PostgreSQL-backed record store.
#[derive(Debug, Clone)]
pub struct PgStore {
    files: FileRepository,
    parts: PartRepository,
    notes: NoteRepository,
}

impl PgStore {
    /// Create a store over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self {
            files: FileRepository::new(pool.clone()),
            parts: PartRepository::new(pool.clone()),
            notes: NoteRepository::new(pool),
        }
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn create_file(&self, data: &CreateFileRecord) -> AppResult<FileRecord> {
        self.files.create(data).await
    }

    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        self.files.find_by_id(id).await
    }

    async fn list_files(&self) -> AppResult<Vec<FileRecord>> {
        self.files.list_newest_first().await
    }

    async fn update_state(&self, id: FileId, state: &FileState) -> AppResult<FileRecord> {
        self.files.update_state(id, state).await
    }

    async fn replace_parts(
        &self,
        file_id: FileId,
        parts: &[NewPart],
    ) -> AppResult<Vec<PartRecord>> {
        self.parts.replace_for_file(file_id, parts).await
    }

    async fn find_parts(&self, file_id: FileId) -> AppResult<Vec<PartRecord>> {
        self.parts.find_by_file(file_id).await
    }

    async fn find_part(&self, id: PartId) -> AppResult<Option<PartRecord>> {
        self.parts.find_by_id(id).await
    }

    async fn update_node_index(
        &self,
        file_id: FileId,
        part_key: &str,
        node_index: i32,
    ) -> AppResult<u64> {
        self.parts.update_node_index(file_id, part_key, node_index).await
    }

    async fn update_display_name(
        &self,
        id: PartId,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>> {
        self.parts.update_display_name(id, display_name).await
    }

    async fn update_display_name_by_key(
        &self,
        file_id: FileId,
        part_key: &str,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>> {
        self.parts
            .update_display_name_by_key(file_id, part_key, display_name)
            .await
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn upsert_note(&self, part_id: PartId, note: &str) -> AppResult<PartNote> {
        self.notes.upsert(part_id, note).await
    }

    async fn find_note(&self, part_id: PartId) -> AppResult<Option<PartNote>> {
        self.notes.find_by_part(part_id).await
    }

    async fn delete_note(&self, part_id: PartId) -> AppResult<bool> {
        self.notes.delete_by_part(part_id).await
    }
}
