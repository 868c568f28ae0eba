//! In-memory copy of the `system_configs` table.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{info, warn};

use imghost_core::result::AppResult;
use imghost_database::repositories::SystemConfigRepository;
use imghost_entity::image::DedupPolicy;
use imghost_entity::setting::SystemConfig;

/// Well-known setting keys.
pub mod keys {
    pub const MAX_UPLOAD_SIZE: &str = "max_upload_size";
    pub const ALLOWED_IMAGE_TYPES: &str = "allowed_image_types";
    pub const THUMBNAIL_WIDTH: &str = "thumbnail_width";
    pub const THUMBNAIL_HEIGHT: &str = "thumbnail_height";
    pub const SYSTEM_DOMAIN: &str = "system_domain";
    pub const DEDUP_POLICY: &str = "dedup_policy";
}

/// Settings seeded on first start: `(key, value, description)`.
pub const DEFAULT_SETTINGS: &[(&str, &str, &str)] = &[
    (keys::MAX_UPLOAD_SIZE, "10485760", "Maximum upload size in bytes"),
    (
        keys::ALLOWED_IMAGE_TYPES,
        "image/jpeg,image/png,image/gif,image/webp",
        "Comma-separated list of accepted content types",
    ),
    (keys::THUMBNAIL_WIDTH, "300", "Thumbnail bounding box width"),
    (keys::THUMBNAIL_HEIGHT, "300", "Thumbnail bounding box height"),
    (keys::SYSTEM_DOMAIN, "http://localhost:8000", "Public base URL of this server"),
    (
        keys::DEDUP_POLICY,
        "any",
        "Duplicate detection: 'any' matches MD5 or SHA-256, 'both' requires both",
    ),
];

const DEFAULT_MAX_UPLOAD_SIZE: u64 = 10 * 1024 * 1024;
const DEFAULT_THUMBNAIL_SIZE: u32 = 300;
const DEFAULT_SYSTEM_DOMAIN: &str = "http://localhost:8000";

/// Shared, cloneable view of the runtime settings.
#[derive(Debug, Clone, Default)]
pub struct SettingsCache {
    values: Arc<RwLock<HashMap<String, String>>>,
}

impl SettingsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with `entries`.
    pub async fn initialize(&self, entries: Vec<SystemConfig>) {
        let mut values = self.values.write().await;
        *values = entries.into_iter().map(|c| (c.key, c.value)).collect();
        info!(count = values.len(), "Settings cache initialized");
    }

    /// Reload every setting from the database.
    pub async fn reload(&self, repo: &SystemConfigRepository) -> AppResult<usize> {
        let entries = repo.find_all().await?;
        let count = entries.len();
        self.initialize(entries).await;
        Ok(count)
    }

    pub async fn get(&self, key: &str) -> Option<String> {
        self.values.read().await.get(key).cloned()
    }

    pub async fn get_int(&self, key: &str) -> Option<i64> {
        let value = self.get(key).await?;
        match value.trim().parse() {
            Ok(n) => Some(n),
            Err(_) => {
                warn!(key, value = %value, "Setting is not an integer");
                None
            }
        }
    }

    pub async fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).await.map(|v| {
            matches!(
                v.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        })
    }

    pub async fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().await.insert(key.into(), value.into());
    }

    /// Merge several values at once.
    pub async fn update(&self, entries: HashMap<String, String>) {
        self.values.write().await.extend(entries);
    }

    pub async fn remove(&self, key: &str) -> bool {
        self.values.write().await.remove(key).is_some()
    }

    pub async fn all(&self) -> HashMap<String, String> {
        self.values.read().await.clone()
    }

    // ── Typed accessors ──────────────────────────────────────────────

    pub async fn max_upload_size(&self) -> u64 {
        self.get_int(keys::MAX_UPLOAD_SIZE)
            .await
            .and_then(|n| u64::try_from(n).ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_MAX_UPLOAD_SIZE)
    }

    /// Accepted content types, lowercased.
    pub async fn allowed_image_types(&self) -> Vec<String> {
        let raw = self
            .get(keys::ALLOWED_IMAGE_TYPES)
            .await
            .unwrap_or_else(|| DEFAULT_SETTINGS[1].1.to_string());
        raw.split(',')
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Thumbnail bounding box as `(width, height)`.
    pub async fn thumbnail_size(&self) -> (u32, u32) {
        let dimension = |n: Option<i64>| {
            n.and_then(|n| u32::try_from(n).ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_THUMBNAIL_SIZE)
        };
        (
            dimension(self.get_int(keys::THUMBNAIL_WIDTH).await),
            dimension(self.get_int(keys::THUMBNAIL_HEIGHT).await),
        )
    }

    /// Public base URL, without trailing slash.
    pub async fn system_domain(&self) -> String {
        self.get(keys::SYSTEM_DOMAIN)
            .await
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_DOMAIN.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string()
    }

    pub async fn dedup_policy(&self) -> DedupPolicy {
        match self.get(keys::DEDUP_POLICY).await {
            Some(raw) => raw.parse().unwrap_or_else(|e| {
                warn!(value = %raw, error = %e, "Falling back to default dedup policy");
                DedupPolicy::default()
            }),
            None => DedupPolicy::default(),
        }
    }
}
