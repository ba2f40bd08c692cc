//! File record repository.

use chrono::Utc;
use sqlx::PgPool;

use partview_core::error::{AppError, ErrorKind};
use partview_core::result::AppResult;
use partview_core::types::FileId;
use partview_entity::file::{CreateFileRecord, FileRecord, FileState, FileStatus};

/// Repository for the `cad_files` table.
#[derive(Debug, Clone)]
pub struct FileRepository {
    pool: PgPool,
}

impl FileRepository {
    /// Create a new file repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a new record in the `uploading` state.
    pub async fn create(&self, data: &CreateFileRecord) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "INSERT INTO cad_files (id, original_filename, stored_path, size_bytes, \
             container_path, status, uploaded_at) \
             VALUES ($1, $2, $3, $4, NULL, $5, $6) RETURNING *",
        )
        .bind(FileId::new())
        .bind(&data.original_filename)
        .bind(&data.stored_path)
        .bind(data.size_bytes)
        .bind(FileStatus::Uploading)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to create file record", e))
    }

    /// Find a record by ID.
    pub async fn find_by_id(&self, id: FileId) -> AppResult<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM cad_files WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find file record", e))
    }

    /// List all records, newest first.
    pub async fn list_newest_first(&self) -> AppResult<Vec<FileRecord>> {
        sqlx::query_as::<_, FileRecord>("SELECT * FROM cad_files ORDER BY uploaded_at DESC, id DESC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list file records", e))
    }

    /// Write status and container path in one statement.
    pub async fn update_state(&self, id: FileId, state: &FileState) -> AppResult<FileRecord> {
        sqlx::query_as::<_, FileRecord>(
            "UPDATE cad_files SET status = $2, container_path = $3 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(state.status())
        .bind(state.container_path())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update file state", e))?
        .ok_or_else(|| AppError::not_found(format!("File {id} not found")))
    }
}
