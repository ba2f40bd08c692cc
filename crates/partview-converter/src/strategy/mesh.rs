//! Single-stage conversion for triangle meshes.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use partview_core::config::converter::ToolConfig;

use crate::error::ConversionError;
use crate::filesystem::FsUtils;
use crate::format::ConversionFamily;
use crate::runner::ProcessCommand;
use crate::stage::{ConversionStage, StageRunner};
use crate::strategy::{ConversionJob, ConversionOutput, ConversionStrategy};

/// `<tool> <input> <output.glb>`; part metadata arrives on stdout.
#[derive(Debug, Clone)]
pub struct MeshConvertStage {
    tool: ToolConfig,
}

impl MeshConvertStage {
    /// Container location for `job`: `<output_dir>/<sanitized stem>.glb`.
    pub fn container_path(job: &ConversionJob) -> PathBuf {
        job.output_dir
            .join(format!("{}.glb", FsUtils::sanitize_stem(&job.original_filename)))
    }
}

impl ConversionStage for MeshConvertStage {
    fn name(&self) -> &'static str {
        "mesh-convert"
    }

    fn command(&self, job: &ConversionJob) -> Result<ProcessCommand, ConversionError> {
        let container = Self::container_path(job);
        Ok(ProcessCommand::new(&self.tool.program, self.tool.args.clone())
            .arg(FsUtils::path_str(&job.input_path)?)
            .arg(FsUtils::path_str(&container)?))
    }
}

/// Strategy for STL, OBJ, and PLY uploads.
#[derive(Debug, Clone)]
pub struct MeshConversionStrategy {
    stage: MeshConvertStage,
    stages: StageRunner,
}

impl MeshConversionStrategy {
    /// Create the strategy around the configured mesh converter.
    pub fn new(tool: ToolConfig, stages: StageRunner) -> Self {
        Self {
            stage: MeshConvertStage { tool },
            stages,
        }
    }
}

#[async_trait]
impl ConversionStrategy for MeshConversionStrategy {
    fn family(&self) -> ConversionFamily {
        ConversionFamily::Mesh
    }

    fn name(&self) -> &'static str {
        "mesh"
    }

    async fn convert(&self, job: &ConversionJob) -> Result<ConversionOutput, ConversionError> {
        job.prepare_dirs().await?;
        let output = self.stages.run_stage(&self.stage, job).await?;

        let container = MeshConvertStage::container_path(job);
        let mut result = ConversionOutput {
            parts_payload: output.output.trim().to_string(),
            ..Default::default()
        };

        if tokio::fs::try_exists(&container).await.unwrap_or(false) {
            info!(file_id = %job.file_id, container = %container.display(), "Mesh container written");
            result.container_path = Some(container);
        } else {
            warn!(
                file_id = %job.file_id,
                expected = %container.display(),
                "Mesh converter exited cleanly without writing a container"
            );
            result.container_error = Some(ConversionError::ArtifactMissing {
                stage: self.stage.name().to_string(),
                path: container,
            });
        }

        Ok(result)
    }
}
