//! External converter tool configuration.
//!
//! Every tool is described by a program plus leading arguments. The stage
//! that invokes the tool appends its own contract arguments after them, so
//! `python` + `["worker/cad_converter.py"]` becomes
//! `python worker/cad_converter.py <input> <output>`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// How to launch one external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Executable name or path.
    pub program: String,
    /// Arguments placed before the stage's own arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl ToolConfig {
    /// Create a tool description.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

/// Configuration for the conversion strategies.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Single-stage mesh converter: `<tool> <input> <output.glb>`, JSON on stdout.
    #[serde(default = "default_mesh_converter")]
    pub mesh_converter: ToolConfig,

    /// CAD kernel used for solid decomposition; receives the inline driver last.
    #[serde(default = "default_cad_kernel")]
    pub cad_kernel: ToolConfig,

    /// Decomposition script executed by the inline driver inside the kernel.
    #[serde(default = "default_decompose_script")]
    pub decompose_script: PathBuf,

    /// Container assembler: `<tool> --parts-json ... --out-glb ... --out-map ...`.
    #[serde(default = "default_assembler")]
    pub assembler: ToolConfig,

    /// Per-part mesh format requested from the decomposition stage.
    #[serde(default = "default_mesh_format")]
    pub mesh_format: String,

    /// Linear deflection tolerance passed to the decomposition stage.
    #[serde(default = "default_linear_deflection")]
    #[validate(range(exclusive_min = 0.0))]
    pub linear_deflection: f64,

    /// Deadline for any single external process.
    #[serde(default = "default_process_timeout")]
    #[validate(range(min = 1, max = 7200))]
    pub process_timeout_seconds: u64,

    /// Keep the per-file work directory after the pipeline finishes.
    #[serde(default)]
    pub keep_intermediates: bool,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            mesh_converter: default_mesh_converter(),
            cad_kernel: default_cad_kernel(),
            decompose_script: default_decompose_script(),
            assembler: default_assembler(),
            mesh_format: default_mesh_format(),
            linear_deflection: default_linear_deflection(),
            process_timeout_seconds: default_process_timeout(),
            keep_intermediates: false,
        }
    }
}

fn default_mesh_converter() -> ToolConfig {
    ToolConfig::new("python3", vec!["worker/cad_converter.py".to_string()])
}

fn default_cad_kernel() -> ToolConfig {
    ToolConfig::new("FreeCADCmd", vec!["-c".to_string()])
}

fn default_decompose_script() -> PathBuf {
    PathBuf::from("worker/step_to_parts.py")
}

fn default_assembler() -> ToolConfig {
    ToolConfig::new("python3", vec!["worker/parts_to_glb.py".to_string()])
}

fn default_mesh_format() -> String {
    "stl".to_string()
}

fn default_linear_deflection() -> f64 {
    10.0
}

fn default_process_timeout() -> u64 {
    600
}
