//! Upload intake: validate, persist bytes, create the record, dispatch.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tracing::{error, info};

use partview_converter::filesystem::FsUtils;
use partview_converter::{ConversionFamily, ConversionJob};
use partview_core::config::storage::StorageConfig;
use partview_core::error::{AppError, ErrorKind};
use partview_core::result::AppResult;
use partview_database::RecordStore;
use partview_entity::file::{CreateFileRecord, FileRecord, FileState};

use crate::ingest::IngestionDispatcher;

/// Accepts uploaded files and hands them to the ingestion dispatcher.
#[derive(Debug, Clone)]
pub struct UploadService {
    /// File record persistence.
    records: Arc<dyn RecordStore>,
    /// Background ingestion.
    dispatcher: Arc<IngestionDispatcher>,
    /// Storage directories and limits.
    storage: StorageConfig,
}

impl UploadService {
    /// Creates a new upload service.
    pub fn new(
        records: Arc<dyn RecordStore>,
        dispatcher: Arc<IngestionDispatcher>,
        storage: StorageConfig,
    ) -> Self {
        Self {
            records,
            dispatcher,
            storage,
        }
    }

    /// Store an upload and start its conversion.
    ///
    /// Returns the record as created, still `uploading`; conversion runs in
    /// the background.
    pub async fn upload(&self, original_filename: &str, data: Bytes) -> AppResult<FileRecord> {
        let original_filename = original_filename.trim();
        if original_filename.is_empty() {
            return Err(AppError::validation("File name is required"));
        }
        if data.is_empty() {
            return Err(AppError::validation("Uploaded file is empty"));
        }
        if data.len() as u64 > self.storage.max_upload_size_bytes {
            return Err(AppError::validation(format!(
                "File exceeds the maximum upload size of {} bytes",
                self.storage.max_upload_size_bytes
            )));
        }

        let family = ConversionFamily::from_filename(original_filename)?;

        let stored_path = self.write_upload(original_filename, &data).await?;
        let record = self
            .records
            .create_file(&CreateFileRecord {
                original_filename: original_filename.to_string(),
                stored_path: stored_path.to_string_lossy().into_owned(),
                size_bytes: i64::try_from(data.len()).unwrap_or(i64::MAX),
            })
            .await?;

        info!(
            file_id = %record.id,
            file = %record.original_filename,
            size_bytes = record.size_bytes,
            family = %family,
            "Upload stored"
        );

        let job = ConversionJob::new(
            record.id,
            stored_path,
            record.original_filename.clone(),
            family,
            &self.storage.temp_dir(),
            &self.storage.converted_dir(),
        );

        if let Err(e) = self.dispatcher.submit(job) {
            error!(file_id = %record.id, error = %e, "Failed to dispatch ingestion");
            if let Err(mark) = self.records.update_state(record.id, &FileState::Failed).await {
                error!(file_id = %record.id, error = %mark, "Failed to mark file as failed");
            }
            return Err(e);
        }

        Ok(record)
    }

    /// Write the bytes to `<upload_dir>/<millis>_<sanitized name>`.
    async fn write_upload(&self, original_filename: &str, data: &[u8]) -> AppResult<PathBuf> {
        let dir = self.storage.upload_dir();
        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to create upload directory {}", dir.display()),
                e,
            )
        })?;

        let name = format!(
            "{}_{}",
            Utc::now().timestamp_millis(),
            FsUtils::sanitize_filename(original_filename)
        );
        let path = dir.join(name);
        tokio::fs::write(&path, data).await.map_err(|e| {
            AppError::with_source(
                ErrorKind::Storage,
                format!("Failed to write upload {}", path.display()),
                e,
            )
        })?;
        Ok(path)
    }
}
