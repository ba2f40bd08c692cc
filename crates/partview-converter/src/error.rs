//! Error type for conversion operations.
//!
//! Only hard failures live here. Metadata that does not parse and node maps
//! that cannot be applied are reported as data by the reconciler instead.

use std::path::PathBuf;

use partview_core::error::AppError;
use thiserror::Error;

use crate::format::SUPPORTED_EXTENSIONS;

/// Unified error type for all conversion operations.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The file extension maps to no conversion family.
    #[error("Unsupported file format: '{filename}' (supported: {})", SUPPORTED_EXTENSIONS.join(", "))]
    UnsupportedFormat {
        /// The rejected file name.
        filename: String,
    },

    /// The uploaded file disappeared before conversion started.
    #[error("Input file not found: {path}")]
    InputMissing {
        /// Expected input location.
        path: PathBuf,
    },

    /// No strategy is registered for the family.
    #[error("No conversion strategy registered for family '{family}'")]
    NoStrategy {
        /// The family without a strategy.
        family: String,
    },

    /// The external executable could not be started.
    #[error("Failed to launch '{program}': {source}")]
    ProcessLaunch {
        /// Program that failed to start.
        program: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// A stage exited with a non-zero status.
    #[error("Stage '{stage}' exited with code {code}")]
    ProcessExit {
        /// Stage name.
        stage: String,
        /// Exit code (-1 when terminated by a signal).
        code: i32,
        /// Merged stdout/stderr of the process.
        output: String,
    },

    /// A process exceeded its deadline and was killed.
    #[error("'{program}' timed out after {timeout_seconds}s")]
    ProcessTimeout {
        /// Program that was killed.
        program: String,
        /// The deadline that was exceeded.
        timeout_seconds: u64,
    },

    /// A stage exited cleanly but did not write a required file.
    #[error("Stage '{stage}' did not produce {path}")]
    ArtifactMissing {
        /// Stage name.
        stage: String,
        /// The missing file.
        path: PathBuf,
    },

    /// A path handed to an external tool is not valid UTF-8.
    #[error("Path is not valid UTF-8: {path}")]
    InvalidUtf8Path {
        /// The offending path.
        path: PathBuf,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConversionError {
    /// Whether the error came from a killed, overdue process.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::ProcessTimeout { .. })
    }
}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match &err {
            ConversionError::UnsupportedFormat { .. } => AppError::validation(err.to_string()),
            ConversionError::InputMissing { .. } => AppError::not_found(err.to_string()),
            ConversionError::ProcessLaunch { .. }
            | ConversionError::ProcessExit { .. }
            | ConversionError::ProcessTimeout { .. }
            | ConversionError::ArtifactMissing { .. } => AppError::external(err.to_string()),
            _ => AppError::internal(err.to_string()),
        }
    }
}
