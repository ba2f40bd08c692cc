//! Conversion strategies and their registry.
//!
//! A strategy owns the whole external-tool sequence for one
//! [`ConversionFamily`]. Adding a family means writing a strategy and
//! registering it; the ingestion pipeline only talks to this module.

pub mod mesh;
pub mod solid;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use partview_core::config::converter::ConverterConfig;
use partview_core::types::FileId;

use crate::error::ConversionError;
use crate::format::ConversionFamily;
use crate::runner::ProcessRunner;
use crate::stage::StageRunner;

pub use mesh::MeshConversionStrategy;
pub use solid::SolidConversionStrategy;

/// Everything a strategy needs to convert one upload.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    /// The record being ingested.
    pub file_id: FileId,
    /// Absolute path of the stored upload.
    pub input_path: PathBuf,
    /// Name supplied by the uploader.
    pub original_filename: String,
    /// Family chosen at upload time.
    pub family: ConversionFamily,
    /// Scratch directory for intermediate artifacts: `<temp>/parts/<file_id>`.
    pub work_dir: PathBuf,
    /// Directory for the container and node map: `<converted>/<file_id>`.
    pub output_dir: PathBuf,
}

impl ConversionJob {
    /// Build a job with per-file work and output directories.
    pub fn new(
        file_id: FileId,
        input_path: PathBuf,
        original_filename: String,
        family: ConversionFamily,
        temp_dir: &Path,
        converted_dir: &Path,
    ) -> Self {
        let id = file_id.to_string();
        Self {
            file_id,
            input_path,
            original_filename,
            family,
            work_dir: temp_dir.join("parts").join(&id),
            output_dir: converted_dir.join(&id),
        }
    }

    /// Create the work and output directories.
    pub async fn prepare_dirs(&self) -> Result<(), ConversionError> {
        tokio::fs::create_dir_all(&self.work_dir).await?;
        tokio::fs::create_dir_all(&self.output_dir).await?;
        Ok(())
    }
}

/// What a strategy produced.
///
/// `container_path` is `None` when the last stage failed softly; the part
/// payload is still reconciled in that case, but the attempt cannot
/// complete.
#[derive(Debug, Default)]
pub struct ConversionOutput {
    /// Raw part list text, parsed by the reconciler.
    pub parts_payload: String,
    /// The viewer container, when one was written.
    pub container_path: Option<PathBuf>,
    /// The assembler's node map, when one was written.
    pub node_map_path: Option<PathBuf>,
    /// Why no container exists, when it does not.
    pub container_error: Option<ConversionError>,
}

/// Converts one family of uploads.
#[async_trait]
pub trait ConversionStrategy: Send + Sync + std::fmt::Debug {
    /// The family handled by this strategy.
    fn family(&self) -> ConversionFamily;

    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Run the external tools for `job`.
    ///
    /// `Err` is a hard failure: there is no usable part payload.
    async fn convert(&self, job: &ConversionJob) -> Result<ConversionOutput, ConversionError>;
}

/// Maps each family to its strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    strategies: HashMap<ConversionFamily, Arc<dyn ConversionStrategy>>,
}

impl StrategyRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The mesh and solid strategies wired from `[converter]`.
    pub fn from_config(config: &ConverterConfig) -> Self {
        let runner = ProcessRunner::new(Duration::from_secs(config.process_timeout_seconds));
        let stages = StageRunner::new(runner);

        let mut registry = Self::new();
        registry.register(Arc::new(MeshConversionStrategy::new(
            config.mesh_converter.clone(),
            stages.clone(),
        )));
        registry.register(Arc::new(SolidConversionStrategy::from_config(config, stages)));
        registry
    }

    /// Add or replace the strategy for its family.
    pub fn register(&mut self, strategy: Arc<dyn ConversionStrategy>) {
        self.strategies.insert(strategy.family(), strategy);
    }

    /// The strategy for `family`.
    pub fn get(
        &self,
        family: ConversionFamily,
    ) -> Result<Arc<dyn ConversionStrategy>, ConversionError> {
        self.strategies
            .get(&family)
            .cloned()
            .ok_or_else(|| ConversionError::NoStrategy {
                family: family.to_string(),
            })
    }
}
