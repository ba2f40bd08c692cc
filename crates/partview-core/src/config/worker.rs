//! Ingestion worker configuration.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Background ingestion worker configuration.
#[derive(Debug, Clone, Validate, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Upper bound on conversions running at the same time.
    #[serde(default = "default_max_concurrent")]
    #[validate(range(min = 1, max = 64))]
    pub max_concurrent_conversions: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_conversions: default_max_concurrent(),
        }
    }
}

fn default_max_concurrent() -> usize {
    2
}
