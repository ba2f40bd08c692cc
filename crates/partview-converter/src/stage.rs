//! One external tool invocation inside a strategy.

use std::path::PathBuf;

use tracing::{info, warn};

use crate::error::ConversionError;
use crate::runner::{ProcessCommand, ProcessOutput, ProcessRunner};
use crate::strategy::ConversionJob;

/// A single external step of a conversion strategy.
pub trait ConversionStage: Send + Sync + std::fmt::Debug {
    /// Short name used in errors and logs.
    fn name(&self) -> &'static str;

    /// Build the command line for `job`.
    fn command(&self, job: &ConversionJob) -> Result<ProcessCommand, ConversionError>;

    /// Files that must exist after a zero exit.
    fn required_artifacts(&self, _job: &ConversionJob) -> Vec<PathBuf> {
        Vec::new()
    }
}

/// Runs stages and turns their outcome into the stage contract.
#[derive(Debug, Clone)]
pub struct StageRunner {
    runner: ProcessRunner,
}

impl StageRunner {
    /// Create a stage runner over a process runner.
    pub fn new(runner: ProcessRunner) -> Self {
        Self { runner }
    }

    /// Run `stage` for `job`.
    ///
    /// A non-zero exit becomes [`ConversionError::ProcessExit`]; a missing
    /// required file after a zero exit becomes
    /// [`ConversionError::ArtifactMissing`].
    pub async fn run_stage(
        &self,
        stage: &dyn ConversionStage,
        job: &ConversionJob,
    ) -> Result<ProcessOutput, ConversionError> {
        let command = stage.command(job)?;
        let output = self.runner.run(&command).await?;

        info!(
            file_id = %job.file_id,
            stage = stage.name(),
            exit_code = output.exit_code,
            elapsed_ms = output.duration.as_millis() as u64,
            "Stage finished"
        );

        if !output.success() {
            warn!(
                file_id = %job.file_id,
                stage = stage.name(),
                output = %tail(&output.output, 2000),
                "Stage exited with failure"
            );
            return Err(ConversionError::ProcessExit {
                stage: stage.name().to_string(),
                code: output.exit_code,
                output: output.output,
            });
        }

        for path in stage.required_artifacts(job) {
            if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
                return Err(ConversionError::ArtifactMissing {
                    stage: stage.name().to_string(),
                    path,
                });
            }
        }

        Ok(output)
    }
}

/// Last `max_chars` characters of `text`, for log lines.
fn tail(text: &str, max_chars: usize) -> &str {
    let count = text.chars().count();
    if count <= max_chars {
        return text;
    }
    let skip = count - max_chars;
    text.char_indices()
        .nth(skip)
        .map(|(idx, _)| &text[idx..])
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tail_keeps_end() {
        assert_eq!(tail("abcdef", 10), "abcdef");
        assert_eq!(tail("abcdef", 2), "ef");
        assert_eq!(tail("ääää", 1), "ä");
    }

    #[cfg(unix)]
    mod process {
        use std::time::Duration;

        use super::*;
        use crate::format::ConversionFamily;
        use partview_core::types::FileId;

        #[derive(Debug)]
        struct ShStage {
            script: String,
            artifact: Option<PathBuf>,
        }

        impl ConversionStage for ShStage {
            fn name(&self) -> &'static str {
                "sample"
            }

            fn command(&self, _job: &ConversionJob) -> Result<ProcessCommand, ConversionError> {
                Ok(ProcessCommand::new("sh", vec!["-c".to_string(), self.script.clone()]))
            }

            fn required_artifacts(&self, _job: &ConversionJob) -> Vec<PathBuf> {
                self.artifact.iter().cloned().collect()
            }
        }

        fn job(root: &std::path::Path) -> ConversionJob {
            ConversionJob::new(
                FileId::new(),
                root.join("in.step"),
                "in.step".to_string(),
                ConversionFamily::Solid,
                root,
                root,
            )
        }

        fn stages() -> StageRunner {
            StageRunner::new(ProcessRunner::new(Duration::from_secs(10)))
        }

        #[tokio::test]
        async fn test_non_zero_exit_becomes_process_exit() {
            let dir = tempfile::tempdir().expect("tempdir");
            let stage = ShStage {
                script: "echo kernel crashed; exit 2".to_string(),
                artifact: None,
            };
            match stages().run_stage(&stage, &job(dir.path())).await {
                Err(ConversionError::ProcessExit { stage, code, output }) => {
                    assert_eq!(stage, "sample");
                    assert_eq!(code, 2);
                    assert!(output.contains("kernel crashed"));
                }
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_missing_artifact_after_clean_exit() {
            let dir = tempfile::tempdir().expect("tempdir");
            let expected = dir.path().join("parts.json");
            let stage = ShStage {
                script: "exit 0".to_string(),
                artifact: Some(expected.clone()),
            };
            match stages().run_stage(&stage, &job(dir.path())).await {
                Err(ConversionError::ArtifactMissing { path, .. }) => assert_eq!(path, expected),
                other => panic!("unexpected: {other:?}"),
            }
        }

        #[tokio::test]
        async fn test_present_artifact_passes() {
            let dir = tempfile::tempdir().expect("tempdir");
            let expected = dir.path().join("parts.json");
            let stage = ShStage {
                script: format!("echo '{{}}' > '{}'", expected.display()),
                artifact: Some(expected),
            };
            let output = stages().run_stage(&stage, &job(dir.path())).await.expect("stage");
            assert!(output.success());
        }
    }
}
