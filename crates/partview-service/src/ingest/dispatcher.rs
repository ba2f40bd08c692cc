//! Fire-and-forget submission of ingestion jobs.
//!
//! Each submission becomes its own task. A semaphore bounds how many
//! pipelines run at once, an in-flight registry keeps a file from being
//! ingested twice concurrently, and the pipeline runs in an inner task so
//! a panic inside it still ends in a `failed` write.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use partview_converter::ConversionJob;
use partview_core::error::AppError;
use partview_core::result::AppResult;
use partview_core::types::FileId;
use partview_entity::file::FileStatus;

use super::pipeline::IngestionPipeline;

/// Removes a file id from the in-flight registry when dropped.
struct InFlightGuard {
    registry: Arc<DashMap<FileId, ()>>,
    file_id: FileId,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry.remove(&self.file_id);
    }
}

/// Runs ingestion pipelines in the background.
#[derive(Debug)]
pub struct IngestionDispatcher {
    pipeline: Arc<IngestionPipeline>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    in_flight: Arc<DashMap<FileId, ()>>,
    accepting: AtomicBool,
}

impl IngestionDispatcher {
    /// Create a dispatcher running at most `max_concurrent` pipelines.
    pub fn new(pipeline: Arc<IngestionPipeline>, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            pipeline,
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            in_flight: Arc::new(DashMap::new()),
            accepting: AtomicBool::new(true),
        }
    }

    /// The pipeline jobs run through.
    pub fn pipeline(&self) -> &Arc<IngestionPipeline> {
        &self.pipeline
    }

    /// Number of submitted jobs not yet finished, queued ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Whether `file_id` has a job that has not finished.
    pub fn is_in_flight(&self, file_id: FileId) -> bool {
        self.in_flight.contains_key(&file_id)
    }

    /// Start ingesting `job` in the background.
    ///
    /// Returns immediately. Fails with `Conflict` if the file is already
    /// being ingested and `ServiceUnavailable` after shutdown began. The
    /// handle resolves to the final status; dropping it does not cancel
    /// the job.
    pub fn submit(&self, job: ConversionJob) -> AppResult<JoinHandle<FileStatus>> {
        if !self.accepting.load(Ordering::SeqCst) {
            return Err(AppError::service_unavailable(
                "Ingestion is shutting down; no new conversions are accepted",
            ));
        }

        let file_id = job.file_id;
        match self.in_flight.entry(file_id) {
            Entry::Occupied(_) => {
                return Err(AppError::conflict(format!(
                    "File {file_id} is already being ingested"
                )));
            }
            Entry::Vacant(slot) => {
                slot.insert(());
            }
        }
        let guard = InFlightGuard {
            registry: Arc::clone(&self.in_flight),
            file_id,
        };

        let pipeline = Arc::clone(&self.pipeline);
        let permits = Arc::clone(&self.permits);
        info!(file_id = %file_id, family = %job.family, "Ingestion queued");

        Ok(tokio::spawn(async move {
            let _guard = guard;
            let _permit = match permits.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    warn!(file_id = %file_id, "Dispatcher closed before job started");
                    pipeline.mark_failed(&job).await;
                    return FileStatus::Failed;
                }
            };

            let inner = tokio::spawn({
                let pipeline = Arc::clone(&pipeline);
                let job = job.clone();
                async move { pipeline.run(&job).await }
            });

            match inner.await {
                Ok(status) => status,
                Err(e) => {
                    if e.is_panic() {
                        error!(file_id = %file_id, "Ingestion task panicked");
                        pipeline.metrics().record_panic();
                    } else {
                        error!(file_id = %file_id, error = %e, "Ingestion task was cancelled");
                    }
                    pipeline.mark_failed(&job).await;
                    FileStatus::Failed
                }
            }
        }))
    }

    /// Stop accepting jobs and wait up to `grace` for running ones.
    ///
    /// Queued jobs that have not started by then are marked failed when
    /// the semaphore closes.
    pub async fn shutdown(&self, grace: Duration) {
        self.accepting.store(false, Ordering::SeqCst);
        info!(in_flight = self.in_flight(), "Waiting for running ingestions");

        let all = u32::try_from(self.max_concurrent).unwrap_or(u32::MAX);
        match tokio::time::timeout(grace, self.permits.acquire_many(all)).await {
            Ok(Ok(_permits)) => info!("All ingestions finished"),
            Ok(Err(_)) => {}
            Err(_) => warn!(
                in_flight = self.in_flight(),
                "Shutdown grace period elapsed with ingestions still running"
            ),
        }
        self.permits.close();
    }
}
