//! Image entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;

/// An uploaded image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Image {
    /// Unique image identifier.
    pub id: i64,
    /// MD5 of the content, lowercase hex.
    pub md5: String,
    /// SHA-256 of the content, lowercase hex.
    pub sha256: String,
    /// File name as supplied by the client.
    pub original_filename: String,
    /// Object key within the storage engine.
    pub storage_filename: String,
    /// Engine holding the object.
    pub storage_engine_id: i64,
    /// Size in bytes.
    pub file_size: i64,
    /// MIME type.
    pub file_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    /// Address the upload came from.
    pub upload_ip: Option<String>,
    /// Free-form metadata.
    pub extra_metadata: Json<serde_json::Value>,
    /// Public URL of the stored object.
    pub original_url: String,
    /// Public URL of the local thumbnail, if one was rendered.
    pub thumbnail_url: Option<String>,
    /// Soft-delete flag.
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Image {
    /// Get the file extension of the stored object (lowercase), if any.
    pub fn extension(&self) -> Option<String> {
        let name = self.storage_filename.rsplit('/').next()?;
        name.rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .filter(|ext| !ext.is_empty())
    }
}

/// Data required to record a newly stored image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImage {
    pub md5: String,
    pub sha256: String,
    pub original_filename: String,
    pub storage_filename: String,
    pub storage_engine_id: i64,
    pub file_size: i64,
    pub file_type: String,
    pub width: Option<i64>,
    pub height: Option<i64>,
    pub upload_ip: Option<String>,
    pub extra_metadata: serde_json::Value,
    pub original_url: String,
    pub thumbnail_url: Option<String>,
}
