//! Storage backend trait for pluggable image storage.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::result::AppResult;

/// Space consumed by a storage backend, as reported by the backend itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StorageUsage {
    /// Total bytes stored under the backend's root or prefix.
    pub used_capacity: u64,
    /// Number of objects, when the backend can count them.
    pub file_count: Option<u64>,
    /// Whether the figures were actually obtained from the backend.
    pub available: bool,
}

impl StorageUsage {
    /// Usage report for a backend that could not be reached.
    pub fn unavailable() -> Self {
        Self {
            used_capacity: 0,
            file_count: None,
            available: false,
        }
    }
}

/// Trait for image storage backends.
///
/// Implementations exist for the local filesystem, S3-compatible object
/// stores and Aliyun OSS. Keys are always relative to the backend's own
/// root directory or key prefix.
#[async_trait]
pub trait StorageBackend: Send + Sync + std::fmt::Debug + 'static {
    /// Return the backend type tag (e.g., "local", "s3").
    fn backend_type(&self) -> &str;

    /// Store bytes under `key`, creating intermediate directories as needed.
    ///
    /// Returns the public URL of the stored object.
    async fn upload(&self, data: Bytes, key: &str) -> AppResult<String>;

    /// Read the object stored under `key`.
    async fn download(&self, key: &str) -> AppResult<Bytes>;

    /// Remove the object stored under `key`.
    ///
    /// Deleting a missing key is not an error. The flag reports whether the
    /// object existed before the call.
    async fn delete(&self, key: &str) -> AppResult<bool>;

    /// Check whether an object exists under `key`.
    async fn exists(&self, key: &str) -> AppResult<bool>;

    /// Compute the public URL for `key` without touching the backend.
    fn get_url(&self, key: &str) -> String;

    /// Probe the backend. Never fails; unreachable backends report `false`.
    async fn test_connection(&self) -> bool;

    /// Scan the backend for usage figures. Never fails.
    async fn get_usage(&self) -> StorageUsage;
}
