//! Filesystem helpers shared by the strategies and the upload path.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ConversionError;

/// Filesystem utility functions.
pub struct FsUtils;

impl FsUtils {
    /// Longest sanitized stem kept.
    const MAX_STEM_CHARS: usize = 200;

    /// Sanitize a filename stem for use in generated file names.
    pub fn sanitize_stem(filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        let sanitized = Self::sanitize_chars(stem);
        if sanitized.is_empty() {
            "unnamed_file".to_string()
        } else {
            sanitized
        }
    }

    /// Sanitize a whole file name, keeping its lowercased extension.
    pub fn sanitize_filename(filename: &str) -> String {
        let stem = Self::sanitize_stem(filename);
        match Path::new(filename).extension().and_then(|e| e.to_str()) {
            Some(ext) => {
                let ext = Self::sanitize_chars(ext).to_lowercase();
                if ext.is_empty() {
                    stem
                } else {
                    format!("{stem}.{ext}")
                }
            }
            None => stem,
        }
    }

    fn sanitize_chars(text: &str) -> String {
        text.chars()
            .filter_map(|c| {
                if c.is_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    Some(c)
                } else if c.is_whitespace() {
                    Some('_')
                } else {
                    None
                }
            })
            .take(Self::MAX_STEM_CHARS)
            .collect()
    }

    /// Borrow a path as UTF-8 for use on a command line.
    pub fn path_str(path: &Path) -> Result<&str, ConversionError> {
        path.to_str().ok_or_else(|| ConversionError::InvalidUtf8Path {
            path: path.to_path_buf(),
        })
    }

    /// UTF-8 path with every backslash turned into a forward slash.
    pub fn forward_slashes(path: &Path) -> Result<String, ConversionError> {
        Ok(Self::path_str(path)?.replace('\\', "/"))
    }

    /// Anchor a relative path at the current working directory.
    pub fn absolute(path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        }
    }

    /// Remove a directory tree, logging instead of failing.
    pub async fn remove_dir_best_effort(dir: &Path) {
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => debug!(dir = %dir.display(), "Removed work directory"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %dir.display(), error = %e, "Failed to remove work directory"),
        }
    }
}
