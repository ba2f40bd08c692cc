//! Inline Python driver for the CAD kernel.
//!
//! The kernel only accepts a script body on its command line, so the
//! decomposition script is launched through a one-line driver that fakes
//! `sys.argv` and runs the script as `__main__`.

use std::path::Path;

use crate::error::ConversionError;
use crate::filesystem::FsUtils;

/// Parameters of one decomposition run.
#[derive(Debug, Clone)]
pub struct DecomposeRequest<'a> {
    /// Decomposition script executed by the driver.
    pub script: &'a Path,
    /// Solid model to decompose.
    pub input: &'a Path,
    /// Directory receiving per-part meshes.
    pub out_dir: &'a Path,
    /// Per-part mesh format.
    pub mesh_format: &'a str,
    /// Linear deflection tolerance.
    pub linear_deflection: f64,
    /// Where the script writes `parts.json`.
    pub json_out: &'a Path,
}

/// Builds kernel driver scripts.
pub struct ScriptingEngine;

impl ScriptingEngine {
    /// Render the one-line driver for `request`.
    pub fn decompose_driver(request: &DecomposeRequest<'_>) -> Result<String, ConversionError> {
        let script = FsUtils::forward_slashes(request.script)?;
        let argv = [
            "step_to_parts.py".to_string(),
            FsUtils::forward_slashes(request.input)?,
            FsUtils::forward_slashes(request.out_dir)?,
            "--format".to_string(),
            request.mesh_format.to_string(),
            "--linear".to_string(),
            format!("{:?}", request.linear_deflection),
            "--json-out".to_string(),
            FsUtils::forward_slashes(request.json_out)?,
            "--skip-degenerate".to_string(),
        ];

        let argv_list = argv
            .iter()
            .map(|arg| py_literal(arg))
            .collect::<Vec<_>>()
            .join(", ");

        Ok(format!(
            "import runpy, sys; sys.argv = [{argv_list}]; runpy.run_path({}, run_name='__main__')",
            py_literal(&script)
        ))
    }
}

/// Quote `text` as a single-quoted Python string literal.
fn py_literal(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('\'');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '\'' => quoted.push_str("\\'"),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            _ => quoted.push(c),
        }
    }
    quoted.push('\'');
    quoted
}
