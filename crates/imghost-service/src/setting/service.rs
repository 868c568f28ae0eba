//! Persisted runtime settings.

use std::collections::HashMap;

use tracing::info;

use imghost_core::error::{AppError, ErrorCode};
use imghost_core::result::AppResult;
use imghost_database::repositories::SystemConfigRepository;
use imghost_entity::image::DedupPolicy;
use imghost_entity::setting::SystemConfig;

use super::cache::{DEFAULT_SETTINGS, SettingsCache, keys};

/// Reads and writes `system_configs`, keeping the [`SettingsCache`] in step.
#[derive(Debug, Clone)]
pub struct SettingsService {
    repo: SystemConfigRepository,
    cache: SettingsCache,
}

impl SettingsService {
    pub fn new(repo: SystemConfigRepository, cache: SettingsCache) -> Self {
        Self { repo, cache }
    }

    pub fn cache(&self) -> &SettingsCache {
        &self.cache
    }

    /// Seed missing default settings and load the cache.
    ///
    /// Returns how many defaults were inserted.
    pub async fn initialize_defaults(&self) -> AppResult<usize> {
        let mut inserted = 0;
        for (key, value, description) in DEFAULT_SETTINGS {
            if self.repo.insert_if_absent(key, value, description).await? {
                inserted += 1;
            }
        }
        let loaded = self.cache.reload(&self.repo).await?;
        info!(inserted, loaded, "Default settings initialized");
        Ok(inserted)
    }

    /// All settings as stored in the database.
    pub async fn list(&self) -> AppResult<Vec<SystemConfig>> {
        self.repo.find_all().await
    }

    pub async fn get(&self, key: &str) -> AppResult<SystemConfig> {
        self.repo.find_by_key(key).await?.ok_or_else(|| {
            AppError::not_found(format!("Config '{key}' not found")).with_code(ErrorCode::ConfigNotFound)
        })
    }

    /// Create or overwrite a setting.
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> AppResult<SystemConfig> {
        let key = key.trim();
        if key.is_empty() || key.len() > 100 {
            return Err(AppError::validation("Config key must be 1-100 characters"));
        }
        validate_value(key, value)?;

        let saved = self.repo.upsert(key, value, description).await?;
        self.cache.set(saved.key.clone(), saved.value.clone()).await;
        info!(key, "Config updated");
        Ok(saved)
    }

    /// Write several settings. Every value is validated before anything is stored.
    pub async fn set_many(&self, entries: HashMap<String, String>) -> AppResult<Vec<SystemConfig>> {
        for (key, value) in &entries {
            validate_value(key, value)?;
        }
        let mut saved = Vec::with_capacity(entries.len());
        for (key, value) in &entries {
            saved.push(self.set(key, value, None).await?);
        }
        Ok(saved)
    }

    pub async fn delete(&self, key: &str) -> AppResult<()> {
        if !self.repo.delete(key).await? {
            return Err(AppError::not_found(format!("Config '{key}' not found"))
                .with_code(ErrorCode::ConfigNotFound));
        }
        self.cache.remove(key).await;
        info!(key, "Config deleted");
        Ok(())
    }

    /// Discard the cache and reload it from the database.
    pub async fn reload(&self) -> AppResult<usize> {
        self.cache.reload(&self.repo).await
    }
}

/// Reject values the typed accessors could not use.
fn validate_value(key: &str, value: &str) -> AppResult<()> {
    if value.len() > 500 {
        return Err(AppError::validation("Config value must be at most 500 characters"));
    }
    let positive = |what: &str| {
        match value.trim().parse::<i64>() {
            Ok(n) if n > 0 => Ok(()),
            _ => Err(AppError::validation(format!("{what} must be a positive integer"))),
        }
    };
    match key {
        keys::MAX_UPLOAD_SIZE => positive("max_upload_size"),
        keys::THUMBNAIL_WIDTH => positive("thumbnail_width"),
        keys::THUMBNAIL_HEIGHT => positive("thumbnail_height"),
        keys::DEDUP_POLICY => value.parse::<DedupPolicy>().map(|_| ()),
        keys::SYSTEM_DOMAIN
            if !(value.starts_with("http://") || value.starts_with("https://")) =>
        {
            Err(AppError::validation("system_domain must start with http:// or https://"))
        }
        _ => Ok(()),
    }
}
