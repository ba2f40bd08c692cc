//! Record store traits.
//!
//! The ingestion pipeline, query services, and HTTP handlers only see these
//! traits, so the backing store can be PostgreSQL or the in-memory map.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use partview_core::config::database::{DatabaseConfig, StoreProvider};
use partview_core::result::AppResult;
use partview_core::types::{FileId, PartId};
use partview_entity::file::{CreateFileRecord, FileRecord, FileState};
use partview_entity::note::PartNote;
use partview_entity::part::{NewPart, PartRecord};

/// Persistence for file records and their parts.
#[async_trait]
pub trait RecordStore: Send + Sync + std::fmt::Debug + 'static {
    /// Create a record with status `uploading` and no container.
    async fn create_file(&self, data: &CreateFileRecord) -> AppResult<FileRecord>;

    /// Find a record by ID.
    async fn find_file(&self, id: FileId) -> AppResult<Option<FileRecord>>;

    /// List all records, newest first.
    async fn list_files(&self) -> AppResult<Vec<FileRecord>>;

    /// Write status and container path together.
    async fn update_state(&self, id: FileId, state: &FileState) -> AppResult<FileRecord>;

    /// Delete every part of `file_id`, then insert `parts` in order.
    ///
    /// Both steps form one atomic unit. Runs even when `parts` is empty.
    async fn replace_parts(&self, file_id: FileId, parts: &[NewPart])
    -> AppResult<Vec<PartRecord>>;

    /// Parts of a file in insertion order.
    async fn find_parts(&self, file_id: FileId) -> AppResult<Vec<PartRecord>>;

    /// Find a part by ID.
    async fn find_part(&self, id: PartId) -> AppResult<Option<PartRecord>>;

    /// Set the node index of the part matching `(file_id, part_key)`.
    ///
    /// Returns the number of rows changed; zero when no part matches.
    async fn update_node_index(
        &self,
        file_id: FileId,
        part_key: &str,
        node_index: i32,
    ) -> AppResult<u64>;

    /// Set or clear the display name override of a part.
    async fn update_display_name(
        &self,
        id: PartId,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>>;

    /// Set or clear the display name override of the part matching `(file_id, part_key)`.
    async fn update_display_name_by_key(
        &self,
        file_id: FileId,
        part_key: &str,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>>;
}

/// Persistence for part notes.
#[async_trait]
pub trait NoteStore: Send + Sync + std::fmt::Debug + 'static {
    /// Insert or replace the note of a part.
    async fn upsert_note(&self, part_id: PartId, note: &str) -> AppResult<PartNote>;

    /// Find the note of a part.
    async fn find_note(&self, part_id: PartId) -> AppResult<Option<PartNote>>;

    /// Delete the note of a part. Returns whether one existed.
    async fn delete_note(&self, part_id: PartId) -> AppResult<bool>;
}

/// The configured store, viewed through both traits.
#[derive(Debug, Clone)]
pub struct Stores {
    /// File and part persistence.
    pub records: Arc<dyn RecordStore>,
    /// Note persistence.
    pub notes: Arc<dyn NoteStore>,
}

impl Stores {
    /// Open the store selected by `[database].provider`.
    ///
    /// For PostgreSQL this connects the pool and runs pending migrations.
    pub async fn open(config: &DatabaseConfig) -> AppResult<Self> {
        match config.provider {
            StoreProvider::Postgres => {
                let pool = crate::connection::DatabasePool::connect(config).await?;
                crate::migration::run_migrations(pool.pool()).await?;
                let store = Arc::new(crate::repositories::PgStore::new(pool.pool().clone()));
                info!("Using PostgreSQL record store");
                Ok(Self::from_shared(store))
            }
            StoreProvider::Memory => {
                info!("Using in-memory record store");
                Ok(Self::memory())
            }
        }
    }

    /// A fresh in-memory store.
    pub fn memory() -> Self {
        Self::from_shared(Arc::new(crate::memory::MemoryStore::new()))
    }

    /// Wrap one object implementing both traits.
    pub fn from_shared<S: RecordStore + NoteStore>(store: Arc<S>) -> Self {
        Self {
            records: store.clone(),
            notes: store,
        }
    }
}
