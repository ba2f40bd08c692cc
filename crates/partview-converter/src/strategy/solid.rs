//! Two-stage conversion for B-rep solids.
//!
//! Stage one runs the CAD kernel with an inline driver that decomposes the
//! model into per-part meshes and `parts.json`. Stage two assembles those
//! meshes into one container plus `node_map.json`. A failure in stage two
//! still leaves a usable part list, so it is reported in the output rather
//! than as an error.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use partview_core::config::converter::{ConverterConfig, ToolConfig};

use crate::error::ConversionError;
use crate::filesystem::FsUtils;
use crate::format::ConversionFamily;
use crate::runner::ProcessCommand;
use crate::scripting::{DecomposeRequest, ScriptingEngine};
use crate::stage::{ConversionStage, StageRunner};
use crate::strategy::{ConversionJob, ConversionOutput, ConversionStrategy};

const PARTS_JSON: &str = "parts.json";
const CONTAINER_NAME: &str = "assembly.glb";
const NODE_MAP_NAME: &str = "node_map.json";

/// Stage one: CAD kernel running the decomposition script.
#[derive(Debug, Clone)]
pub struct DecomposeStage {
    kernel: ToolConfig,
    script: PathBuf,
    mesh_format: String,
    linear_deflection: f64,
}

impl DecomposeStage {
    /// Where the decomposition writes its part list.
    pub fn parts_json(job: &ConversionJob) -> PathBuf {
        job.work_dir.join(PARTS_JSON)
    }
}

impl ConversionStage for DecomposeStage {
    fn name(&self) -> &'static str {
        "decompose"
    }

    fn command(&self, job: &ConversionJob) -> Result<ProcessCommand, ConversionError> {
        let json_out = Self::parts_json(job);
        let driver = ScriptingEngine::decompose_driver(&DecomposeRequest {
            script: &self.script,
            input: &job.input_path,
            out_dir: &job.work_dir,
            mesh_format: &self.mesh_format,
            linear_deflection: self.linear_deflection,
            json_out: &json_out,
        })?;
        Ok(ProcessCommand::new(&self.kernel.program, self.kernel.args.clone()).arg(driver))
    }

    fn required_artifacts(&self, job: &ConversionJob) -> Vec<PathBuf> {
        vec![Self::parts_json(job)]
    }
}

/// Stage two: assembler building the container and node map.
#[derive(Debug, Clone)]
pub struct AssembleStage {
    assembler: ToolConfig,
}

impl AssembleStage {
    /// Container location for `job`.
    pub fn container_path(job: &ConversionJob) -> PathBuf {
        job.output_dir.join(CONTAINER_NAME)
    }

    /// Node map location for `job`.
    pub fn node_map_path(job: &ConversionJob) -> PathBuf {
        job.output_dir.join(NODE_MAP_NAME)
    }
}

impl ConversionStage for AssembleStage {
    fn name(&self) -> &'static str {
        "assemble"
    }

    fn command(&self, job: &ConversionJob) -> Result<ProcessCommand, ConversionError> {
        let parts_json = DecomposeStage::parts_json(job);
        let container = Self::container_path(job);
        let node_map = Self::node_map_path(job);
        Ok(
            ProcessCommand::new(&self.assembler.program, self.assembler.args.clone())
                .arg("--parts-json")
                .arg(FsUtils::path_str(&parts_json)?)
                .arg("--out-glb")
                .arg(FsUtils::path_str(&container)?)
                .arg("--out-map")
                .arg(FsUtils::path_str(&node_map)?)
                .arg("--node-name")
                .arg("partKey")
                .arg("--write-node-index"),
        )
    }

    fn required_artifacts(&self, job: &ConversionJob) -> Vec<PathBuf> {
        vec![Self::container_path(job)]
    }
}

/// Strategy for STEP and IGES uploads.
#[derive(Debug, Clone)]
pub struct SolidConversionStrategy {
    decompose: DecomposeStage,
    assemble: AssembleStage,
    stages: StageRunner,
}

impl SolidConversionStrategy {
    /// Create the strategy from explicit stages.
    pub fn new(decompose: DecomposeStage, assemble: AssembleStage, stages: StageRunner) -> Self {
        Self {
            decompose,
            assemble,
            stages,
        }
    }

    /// Create the strategy from `[converter]`.
    ///
    /// The decomposition script path is made absolute because it is handed
    /// to a tool that may resolve paths differently.
    pub fn from_config(config: &ConverterConfig, stages: StageRunner) -> Self {
        Self::new(
            DecomposeStage {
                kernel: config.cad_kernel.clone(),
                script: FsUtils::absolute(&config.decompose_script),
                mesh_format: config.mesh_format.clone(),
                linear_deflection: config.linear_deflection,
            },
            AssembleStage {
                assembler: config.assembler.clone(),
            },
            stages,
        )
    }
}

#[async_trait]
impl ConversionStrategy for SolidConversionStrategy {
    fn family(&self) -> ConversionFamily {
        ConversionFamily::Solid
    }

    fn name(&self) -> &'static str {
        "solid"
    }

    async fn convert(&self, job: &ConversionJob) -> Result<ConversionOutput, ConversionError> {
        job.prepare_dirs().await?;

        self.stages.run_stage(&self.decompose, job).await?;
        let parts_payload = tokio::fs::read_to_string(DecomposeStage::parts_json(job)).await?;

        let mut output = ConversionOutput {
            parts_payload,
            ..Default::default()
        };

        match self.stages.run_stage(&self.assemble, job).await {
            Ok(_) => {
                let container = AssembleStage::container_path(job);
                info!(file_id = %job.file_id, container = %container.display(), "Assembly written");
                output.container_path = Some(container);

                let node_map = AssembleStage::node_map_path(job);
                if tokio::fs::try_exists(&node_map).await.unwrap_or(false) {
                    output.node_map_path = Some(node_map);
                } else {
                    warn!(
                        file_id = %job.file_id,
                        expected = %node_map.display(),
                        "Assembler wrote no node map; node indices stay unset"
                    );
                }
            }
            Err(e) => {
                warn!(
                    file_id = %job.file_id,
                    error = %e,
                    "Assembly failed; keeping decomposed parts without a container"
                );
                output.container_error = Some(e);
            }
        }

        Ok(output)
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::runner::ProcessRunner;
    use crate::strategy::testing::sh_tool;
    use partview_core::types::FileId;

    /// Fake kernel: pulls the json-out path from the driver and writes parts.json.
    const KERNEL_OK: &str = r#"json=$(printf '%s' "$1" | sed -n "s/.*'--json-out', '\([^']*\)'.*/\1/p")
printf '{"parts":[{"partKey":"P1","name":"Housing"},{"name":"Bolt"}]}' > "$json"
"#;

    const KERNEL_NO_JSON: &str = "exit 0\n";

    /// Fake assembler: writes the container and, unless told otherwise, the node map.
    fn assembler_script(write_map: bool, exit_code: i32) -> String {
        let map = if write_map {
            "printf '[{\"partKey\":\"P1\",\"nodeIndex\":0}]' > \"$map\"\n"
        } else {
            ""
        };
        format!(
            "while [ $# -gt 0 ]; do\n  case \"$1\" in\n    --out-glb) glb=\"$2\"; shift 2;;\n    --out-map) map=\"$2\"; shift 2;;\n    *) shift;;\n  esac\ndone\nprintf 'glb' > \"$glb\"\n{map}exit {exit_code}\n"
        )
    }

    fn job(root: &Path) -> ConversionJob {
        let input = root.join("gear.step");
        std::fs::write(&input, b"ISO-10303-21;").expect("write input");
        ConversionJob::new(
            FileId::new(),
            input,
            "gear.step".to_string(),
            ConversionFamily::Solid,
            &root.join("temp"),
            &root.join("converted"),
        )
    }

    fn strategy(root: &Path, kernel: &str, assembler: &str) -> SolidConversionStrategy {
        let config = ConverterConfig {
            cad_kernel: sh_tool(root, "kernel.sh", kernel),
            assembler: sh_tool(root, "assemble.sh", assembler),
            decompose_script: root.join("step_to_parts.py"),
            ..Default::default()
        };
        SolidConversionStrategy::from_config(
            &config,
            StageRunner::new(ProcessRunner::new(Duration::from_secs(10))),
        )
    }

    #[tokio::test]
    async fn test_both_stages_succeed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let job = job(dir.path());
        let out = strategy(dir.path(), KERNEL_OK, &assembler_script(true, 0))
            .convert(&job)
            .await
            .expect("convert");

        assert!(out.parts_payload.contains("\"P1\""));
        assert_eq!(out.container_path, Some(job.output_dir.join("assembly.glb")));
        assert_eq!(out.node_map_path, Some(job.output_dir.join("node_map.json")));
        assert!(out.container_error.is_none());
    }

    #[tokio::test]
    async fn test_missing_node_map_is_tolerated() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = strategy(dir.path(), KERNEL_OK, &assembler_script(false, 0))
            .convert(&job(dir.path()))
            .await
            .expect("convert");
        assert!(out.container_path.is_some());
        assert!(out.node_map_path.is_none());
    }

    #[tokio::test]
    async fn test_missing_parts_json_is_hard_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = strategy(dir.path(), KERNEL_NO_JSON, &assembler_script(true, 0))
            .convert(&job(dir.path()))
            .await;
        match result {
            Err(ConversionError::ArtifactMissing { stage, path }) => {
                assert_eq!(stage, "decompose");
                assert!(path.ends_with("parts.json"));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_assembly_failure_keeps_stage_one_payload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let out = strategy(dir.path(), KERNEL_OK, &assembler_script(true, 4))
            .convert(&job(dir.path()))
            .await
            .expect("convert");
        assert!(out.container_path.is_none());
        assert!(out.node_map_path.is_none());
        assert!(matches!(
            out.container_error,
            Some(ConversionError::ProcessExit { code: 4, .. })
        ));
        assert!(out.parts_payload.contains("Housing"));
    }
}
