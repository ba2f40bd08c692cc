//! Local file storage configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where uploads, intermediate artifacts, and containers live on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for all runtime data.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Maximum upload size in bytes (default 512 MB).
    #[serde(default = "default_max_upload")]
    pub max_upload_size_bytes: u64,
    /// Override for the upload directory (default `<data_root>/uploads`).
    #[serde(default)]
    pub upload_dir: Option<String>,
    /// Override for the intermediate artifact directory (default `<data_root>/temp`).
    #[serde(default)]
    pub temp_dir: Option<String>,
    /// Override for the converted container directory (default `<data_root>/converted`).
    #[serde(default)]
    pub converted_dir: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            max_upload_size_bytes: default_max_upload(),
            upload_dir: None,
            temp_dir: None,
            converted_dir: None,
        }
    }
}

impl StorageConfig {
    /// Directory receiving raw uploaded files.
    pub fn upload_dir(&self) -> PathBuf {
        self.resolve(self.upload_dir.as_deref(), "uploads")
    }

    /// Directory holding per-file intermediate artifacts.
    pub fn temp_dir(&self) -> PathBuf {
        self.resolve(self.temp_dir.as_deref(), "temp")
    }

    /// Directory holding per-file viewer containers and node maps.
    pub fn converted_dir(&self) -> PathBuf {
        self.resolve(self.converted_dir.as_deref(), "converted")
    }

    /// Relative paths are anchored to the current working directory so that
    /// paths handed to external tools are always absolute.
    fn resolve(&self, explicit: Option<&str>, leaf: &str) -> PathBuf {
        let path = match explicit {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.data_root).join(leaf),
        };
        if path.is_absolute() {
            path
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(&path))
                .unwrap_or(path)
        }
    }
}

fn default_data_root() -> String {
    "./data".to_string()
}

fn default_max_upload() -> u64 {
    512 * 1024 * 1024
}
