//! Part repository.

use sqlx::PgPool;

use partview_core::error::{AppError, ErrorKind};
use partview_core::result::AppResult;
use partview_core::types::{FileId, PartId};
use partview_entity::part::{NewPart, PartRecord};

/// Repository for the `parts` table.
#[derive(Debug, Clone)]
pub struct PartRepository {
    pool: PgPool,
}

impl PartRepository {
    /// Create a new part repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace every part of a file inside one transaction.
    pub async fn replace_for_file(
        &self,
        file_id: FileId,
        parts: &[NewPart],
    ) -> AppResult<Vec<PartRecord>> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        sqlx::query("DELETE FROM parts WHERE file_id = $1")
            .bind(file_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to delete parts", e))?;

        let mut inserted = Vec::with_capacity(parts.len());
        for (ordinal, part) in parts.iter().enumerate() {
            let row = PartRecord::from_new(file_id, ordinal as i32, part);
            let stored = sqlx::query_as::<_, PartRecord>(
                "INSERT INTO parts (id, file_id, name, display_name, part_key, node_index, \
                 node_path, parent_key, position_x, position_y, position_z, size_x, size_y, \
                 size_z, parent_part_id, ordinal, created_at) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
                 RETURNING *",
            )
            .bind(row.id)
            .bind(row.file_id)
            .bind(&row.name)
            .bind(&row.display_name)
            .bind(&row.part_key)
            .bind(row.node_index)
            .bind(&row.node_path)
            .bind(&row.parent_key)
            .bind(row.position_x)
            .bind(row.position_y)
            .bind(row.position_z)
            .bind(row.size_x)
            .bind(row.size_y)
            .bind(row.size_z)
            .bind(row.parent_part_id)
            .bind(row.ordinal)
            .bind(row.created_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::Database,
                    format!("Failed to insert part '{}'", row.part_key),
                    e,
                )
            })?;
            inserted.push(stored);
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit part replacement", e)
        })?;

        Ok(inserted)
    }

    /// Parts of a file in insertion order.
    pub async fn find_by_file(&self, file_id: FileId) -> AppResult<Vec<PartRecord>> {
        sqlx::query_as::<_, PartRecord>(
            "SELECT * FROM parts WHERE file_id = $1 ORDER BY ordinal ASC",
        )
        .bind(file_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list parts", e))
    }

    /// Find a part by ID.
    pub async fn find_by_id(&self, id: PartId) -> AppResult<Option<PartRecord>> {
        sqlx::query_as::<_, PartRecord>("SELECT * FROM parts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find part", e))
    }

    /// Set the node index of the part matching a key.
    pub async fn update_node_index(
        &self,
        file_id: FileId,
        part_key: &str,
        node_index: i32,
    ) -> AppResult<u64> {
        sqlx::query("UPDATE parts SET node_index = $3 WHERE file_id = $1 AND part_key = $2")
            .bind(file_id)
            .bind(part_key)
            .bind(node_index)
            .execute(&self.pool)
            .await
            .map(|result| result.rows_affected())
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to update node index", e)
            })
    }

    /// Set or clear the display name by part ID.
    pub async fn update_display_name(
        &self,
        id: PartId,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>> {
        sqlx::query_as::<_, PartRecord>(
            "UPDATE parts SET display_name = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rename part", e))
    }

    /// Set or clear the display name by file and part key.
    pub async fn update_display_name_by_key(
        &self,
        file_id: FileId,
        part_key: &str,
        display_name: Option<&str>,
    ) -> AppResult<Option<PartRecord>> {
        sqlx::query_as::<_, PartRecord>(
            "UPDATE parts SET display_name = $3 WHERE file_id = $1 AND part_key = $2 RETURNING *",
        )
        .bind(file_id)
        .bind(part_key)
        .bind(display_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to rename part", e))
    }
}
