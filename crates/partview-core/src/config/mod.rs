//! Application configuration schemas.
//!
//! All configuration structs are deserialized from TOML files via the
//! `config` crate. Each sub-module represents a logical configuration
//! section, and every field carries a serde default so an empty file is a
//! valid configuration.

pub mod app;
pub mod converter;
pub mod database;
pub mod logging;
pub mod storage;
pub mod worker;

use std::path::Path;

use serde::{Deserialize, Serialize};
use validator::Validate;

use self::app::ServerConfig;
use self::converter::ConverterConfig;
use self::database::DatabaseConfig;
use self::logging::LoggingConfig;
use self::storage::StorageConfig;
use self::worker::WorkerConfig;

use crate::error::AppError;

/// Root application configuration.
///
/// Top-level deserialization target for the merged TOML configuration
/// files (default.toml + environment overlay) and `PARTVIEW__*` variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Record store settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// File storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// External converter tools.
    #[serde(default)]
    pub converter: ConverterConfig,
    /// Ingestion worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from `config/` relative to the working directory.
    pub fn load(env: &str) -> Result<Self, AppError> {
        Self::load_from(Path::new("config"), env)
    }

    /// Load configuration from the given directory.
    ///
    /// Merges `<dir>/default.toml` with `<dir>/<env>.toml` and environment
    /// variables prefixed with `PARTVIEW__`, then validates the result.
    pub fn load_from(dir: &Path, env: &str) -> Result<Self, AppError> {
        let config = config::Config::builder()
            .add_source(config::File::from(dir.join("default")).required(false))
            .add_source(config::File::from(dir.join(env)).required(false))
            .add_source(
                config::Environment::with_prefix("PARTVIEW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build config: {e}")))?;

        let app: AppConfig = config
            .try_deserialize()
            .map_err(|e| AppError::configuration(format!("Failed to deserialize config: {e}")))?;

        app.validate()?;
        Ok(app)
    }

    /// Run range checks on the sections that declare them.
    pub fn validate(&self) -> Result<(), AppError> {
        self.converter
            .validate()
            .map_err(|e| AppError::configuration(format!("Invalid [converter] section: {e}")))?;
        self.worker
            .validate()
            .map_err(|e| AppError::configuration(format!("Invalid [worker] section: {e}")))?;
        if self.storage.max_upload_size_bytes == 0 {
            return Err(AppError::configuration(
                "storage.max_upload_size_bytes must be greater than zero",
            ));
        }
        Ok(())
    }
}
