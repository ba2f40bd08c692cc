//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use partview_core::config::AppConfig;
use partview_database::Stores;
use partview_service::{FileQueryService, IngestionDispatcher, PartService, UploadService};

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
/// All fields are `Arc`-wrapped for cheap cloning across tasks.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Background ingestion
    pub dispatcher: Arc<IngestionDispatcher>,
    /// Upload intake
    pub upload_service: Arc<UploadService>,
    /// File, part, and container lookups
    pub query_service: Arc<FileQueryService>,
    /// Part renaming and notes
    pub part_service: Arc<PartService>,
    /// Process start, for the health endpoint
    pub started_at: Instant,
}

impl AppState {
    /// Build the services over `stores` and `dispatcher`.
    pub fn new(config: AppConfig, stores: Stores, dispatcher: Arc<IngestionDispatcher>) -> Self {
        let upload_service = Arc::new(UploadService::new(
            Arc::clone(&stores.records),
            Arc::clone(&dispatcher),
            config.storage.clone(),
        ));
        let query_service = Arc::new(FileQueryService::new(
            Arc::clone(&stores.records),
            Arc::clone(&stores.notes),
        ));
        let part_service = Arc::new(PartService::new(stores.records, stores.notes));

        Self {
            config: Arc::new(config),
            dispatcher,
            upload_service,
            query_service,
            part_service,
            started_at: Instant::now(),
        }
    }
}
