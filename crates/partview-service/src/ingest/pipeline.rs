//! The ingestion state machine for one file.
//!
//! `uploading -> processing -> completed | failed`. Every path out of
//! [`IngestionPipeline::run`] ends with a status write; nothing is
//! returned as an error because no caller is waiting on the outcome.

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, instrument, warn};

use partview_converter::filesystem::FsUtils;
use partview_converter::{ConversionError, ConversionJob, ConversionMetrics, StrategyRegistry};
use partview_core::result::AppResult;
use partview_database::RecordStore;
use partview_entity::file::{FileState, FileStatus};

use super::reconciler::Reconciler;

/// Drives one file from `processing` to a terminal status.
#[derive(Debug)]
pub struct IngestionPipeline {
    records: Arc<dyn RecordStore>,
    strategies: StrategyRegistry,
    reconciler: Reconciler,
    metrics: Arc<ConversionMetrics>,
    keep_intermediates: bool,
}

impl IngestionPipeline {
    /// Create a pipeline.
    pub fn new(
        records: Arc<dyn RecordStore>,
        strategies: StrategyRegistry,
        metrics: Arc<ConversionMetrics>,
        keep_intermediates: bool,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(records.clone()),
            records,
            strategies,
            metrics,
            keep_intermediates,
        }
    }

    /// Shared metrics collector.
    pub fn metrics(&self) -> &Arc<ConversionMetrics> {
        &self.metrics
    }

    /// Convert `job` and record the outcome. Returns the final status.
    #[instrument(skip(self, job), fields(file_id = %job.file_id, family = %job.family))]
    pub async fn run(&self, job: &ConversionJob) -> FileStatus {
        let start = Instant::now();
        self.metrics.record_started();

        let status = match self.records.update_state(job.file_id, &FileState::Processing).await {
            Ok(_) => {
                info!(file = %job.original_filename, "Ingestion started");
                let target = self.convert_and_reconcile(job).await;
                self.write_final(job, target).await
            }
            Err(e) => {
                error!(error = %e, "Failed to mark file as processing");
                self.mark_failed(job).await;
                FileStatus::Failed
            }
        };

        if !self.keep_intermediates {
            FsUtils::remove_dir_best_effort(&job.work_dir).await;
        }

        let elapsed = start.elapsed();
        match status {
            FileStatus::Completed => self.metrics.record_completed(elapsed),
            _ => self.metrics.record_failed(elapsed),
        }
        info!(
            status = %status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Ingestion finished"
        );
        status
    }

    /// Run the strategy and reconcile; return the state to write.
    async fn convert_and_reconcile(&self, job: &ConversionJob) -> FileState {
        if !tokio::fs::try_exists(&job.input_path).await.unwrap_or(false) {
            let err = ConversionError::InputMissing {
                path: job.input_path.clone(),
            };
            warn!(error = %err, "Input vanished before conversion");
            return self.fail_without_parts(job).await;
        }

        let strategy = match self.strategies.get(job.family) {
            Ok(strategy) => strategy,
            Err(e) => {
                error!(error = %e, "No strategy for file");
                return self.fail_without_parts(job).await;
            }
        };

        let output = match strategy.convert(job).await {
            Ok(output) => output,
            Err(e) => {
                if e.is_timeout() {
                    self.metrics.record_timeout();
                }
                warn!(strategy = strategy.name(), error = %e, "Conversion failed");
                return self.fail_without_parts(job).await;
            }
        };

        match self
            .reconciler
            .reconcile(job.file_id, &output.parts_payload, output.node_map_path.as_deref())
            .await
        {
            Ok(report) => {
                self.metrics
                    .record_parts(report.parts_written as u64, report.patched_rows());
            }
            Err(e) => {
                error!(error = %e, "Part reconciliation failed");
                return FileState::Failed;
            }
        }

        match (output.container_path, output.container_error) {
            (Some(path), _) => FileState::Completed {
                container_path: path.to_string_lossy().into_owned(),
            },
            (None, error) => {
                if let Some(e) = error {
                    if e.is_timeout() {
                        self.metrics.record_timeout();
                    }
                    warn!(error = %e, "No container produced");
                }
                FileState::Failed
            }
        }
    }

    /// Clear parts after a hard failure and return `Failed`.
    async fn fail_without_parts(&self, job: &ConversionJob) -> FileState {
        if let Err(e) = self.reconciler.clear(job.file_id).await {
            error!(error = %e, "Failed to clear parts of failed file");
        }
        FileState::Failed
    }

    /// Write the terminal state, falling back to `Failed` if that write fails.
    async fn write_final(&self, job: &ConversionJob, target: FileState) -> FileStatus {
        match self.records.update_state(job.file_id, &target).await {
            Ok(record) => record.status,
            Err(e) => {
                error!(state = %target, error = %e, "Failed to write final state");
                if target.status() != FileStatus::Failed {
                    self.mark_failed(job).await;
                }
                FileStatus::Failed
            }
        }
    }

    /// Best-effort `Failed` write.
    pub async fn mark_failed(&self, job: &ConversionJob) {
        if let Err(e) = self.try_mark_failed(job).await {
            error!(file_id = %job.file_id, error = %e, "Failed to mark file as failed");
        }
    }

    async fn try_mark_failed(&self, job: &ConversionJob) -> AppResult<()> {
        self.records.update_state(job.file_id, &FileState::Failed).await?;
        Ok(())
    }
}
