//! Storage configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Process-wide storage settings shared by every engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory under which local engines keep their files.
    #[serde(default = "default_upload_dir")]
    pub upload_dir: String,
    /// Directory for generated thumbnails (always local).
    #[serde(default = "default_thumbnail_dir")]
    pub thumbnail_dir: String,
    /// Upper bound for a single backend call, in seconds.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_seconds: u64,
}

impl StorageConfig {
    /// The per-call backend timeout.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.operation_timeout_seconds)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            upload_dir: default_upload_dir(),
            thumbnail_dir: default_thumbnail_dir(),
            operation_timeout_seconds: default_operation_timeout(),
        }
    }
}

fn default_upload_dir() -> String {
    "./data/uploads".to_string()
}

fn default_thumbnail_dir() -> String {
    "./data/thumbnails".to_string()
}

fn default_operation_timeout() -> u64 {
    30
}
