//! Storage engine administration.
//!
//! Every mutation writes the database inside a transaction, applies the
//! matching cache mutation, and only then commits. A cache failure drops
//! the transaction, so the database never records an engine the cache
//! could not load. If the commit itself fails the cache is rebuilt from
//! the database.

use std::str::FromStr;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{error, info, warn};

use imghost_core::error::{AppError, ErrorCode};
use imghost_core::result::AppResult;
use imghost_core::traits::storage::StorageUsage;
use imghost_database::connection::{begin, commit};
use imghost_database::repositories::engine::NewEngineRow;
use imghost_database::repositories::{EngineRepository, ImageRepository};
use imghost_entity::engine::{
    CreateEngine, DEFAULT_PATH_RULE, EngineConfig, EngineKind, EngineQuota, StorageEngine,
    UpdateEngine,
};
use imghost_storage::path::validate_path_rule;
use imghost_storage::{CacheInfo, EngineCache, ThumbnailGenerator};

use crate::image::cleanup::{release_object, release_thumbnail};

const MAX_NAME_LEN: usize = 100;

/// Outcome of probing an engine's backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTestResult {
    pub success: bool,
    pub message: String,
    pub latency_ms: u64,
}

/// Capacity figures for an engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineUsage {
    pub engine_id: i64,
    /// Bytes reported by the backend, or the database figure when unavailable.
    pub used_capacity: i64,
    pub max_capacity: Option<i64>,
    pub usage_percent: Option<f64>,
    pub file_count: Option<u64>,
    /// Live images recorded against the engine.
    pub image_count: i64,
    /// Whether the figures came from the backend itself.
    pub available: bool,
}

/// Manages storage engine records and keeps the [`EngineCache`] in step.
#[derive(Debug, Clone)]
pub struct EngineService {
    pool: SqlitePool,
    engines: EngineRepository,
    images: ImageRepository,
    cache: EngineCache,
    thumbnails: ThumbnailGenerator,
}

impl EngineService {
    pub fn new(pool: SqlitePool, cache: EngineCache, thumbnails: ThumbnailGenerator) -> Self {
        Self {
            engines: EngineRepository::new(pool.clone()),
            images: ImageRepository::new(pool.clone()),
            pool,
            cache,
            thumbnails,
        }
    }

    pub fn cache(&self) -> &EngineCache {
        &self.cache
    }

    pub async fn list(&self, is_active: Option<bool>) -> AppResult<Vec<StorageEngine>> {
        self.engines.find_all(is_active).await
    }

    pub async fn get(&self, id: i64) -> AppResult<StorageEngine> {
        self.engines.find_by_id(id).await?.ok_or_else(|| engine_not_found(id))
    }

    /// Create an engine. The first engine ever created becomes the default.
    pub async fn create(&self, input: CreateEngine) -> AppResult<StorageEngine> {
        let name = validate_name(&input.name)?;
        let engine_type = input.engine_type.trim().to_string();
        self.validate_config(&engine_type, &input.config)?;
        let path_rule = input
            .path_rule
            .as_deref()
            .map(str::trim)
            .filter(|rule| !rule.is_empty())
            .unwrap_or(DEFAULT_PATH_RULE)
            .to_string();
        validate_path_rule(&path_rule)?;
        if let Some(max) = input.max_capacity {
            if max < 0 {
                return Err(invalid_capacity("max_capacity must not be negative"));
            }
        }

        let mut tx = begin(&self.pool).await?;
        let first = EngineRepository::count_in(&mut *tx).await? == 0;
        let make_default = input.is_active && (input.is_default || first);
        if make_default {
            EngineRepository::clear_default(&mut *tx, None).await?;
        }

        let engine = EngineRepository::create(
            &mut *tx,
            &NewEngineRow {
                name: &name,
                engine_type: &engine_type,
                config: &input.config,
                path_rule: &path_rule,
                is_active: input.is_active,
                is_default: make_default,
                max_capacity: input.max_capacity,
            },
        )
        .await?;

        if engine.is_active {
            self.cache
                .add(engine.clone())
                .await
                .map_err(|e| instance_create_failed(&engine, e))?;
            if engine.is_default {
                self.cache.set_default(engine.id).await;
            }
        } else {
            self.cache
                .factory()
                .create(&engine.engine_type, &engine.config)
                .map_err(|e| instance_create_failed(&engine, e))?;
        }

        self.commit_or_resync(tx).await?;
        info!(
            engine_id = engine.id,
            name = %engine.name,
            engine_type = %engine.engine_type,
            is_default = engine.is_default,
            "Storage engine created"
        );
        Ok(engine)
    }

    /// Apply a partial update.
    pub async fn update(&self, id: i64, input: UpdateEngine) -> AppResult<StorageEngine> {
        let mut tx = begin(&self.pool).await?;
        let previous = EngineRepository::find_by_id_in(&mut *tx, id)
            .await?
            .ok_or_else(|| engine_not_found(id))?;
        let mut engine = previous.clone();

        if let Some(name) = &input.name {
            engine.name = validate_name(name)?;
        }
        if let Some(config) = input.config {
            self.validate_config(&engine.engine_type, &config)?;
            engine.config = Json(config);
        }
        if let Some(rule) = &input.path_rule {
            let rule = rule.trim();
            validate_path_rule(rule)?;
            engine.path_rule = rule.to_string();
        }
        if let Some(max_capacity) = input.max_capacity {
            if let Some(max) = max_capacity {
                if max < engine.used_capacity {
                    return Err(invalid_capacity(format!(
                        "max_capacity {max} is below the {} bytes already used",
                        engine.used_capacity
                    )));
                }
            }
            engine.max_capacity = max_capacity;
        }
        if let Some(active) = input.is_active {
            engine.is_active = active;
        }
        if !engine.is_active {
            engine.is_default = false;
        }
        if input.is_default == Some(true) {
            if !engine.is_active {
                return Err(engine_disabled(&engine));
            }
            EngineRepository::clear_default(&mut *tx, Some(id)).await?;
            engine.is_default = true;
        }

        let saved = EngineRepository::save(&mut *tx, &engine).await?;

        if let Err(e) = self.cache.update(saved.clone()).await {
            if previous.is_active {
                if let Err(restore) = self.cache.add(previous.clone()).await {
                    warn!(engine_id = id, error = %restore, "Failed to restore cached engine");
                }
            }
            return Err(instance_create_failed(&saved, e));
        }
        if saved.is_default {
            self.cache.set_default(id).await;
        }

        self.commit_or_resync(tx).await?;
        info!(engine_id = id, is_active = saved.is_active, "Storage engine updated");
        Ok(saved)
    }

    /// Delete an engine that no live image references.
    ///
    /// Soft-deleted images on the engine are purged with it; their objects
    /// and thumbnails are removed best effort once the delete has committed.
    pub async fn delete(&self, id: i64) -> AppResult<()> {
        let mut tx = begin(&self.pool).await?;
        let engine = EngineRepository::find_by_id_in(&mut *tx, id)
            .await?
            .ok_or_else(|| engine_not_found(id))?;

        let live = ImageRepository::count_live_by_engine_in(&mut *tx, id).await?;
        if live > 0 {
            return Err(AppError::conflict(format!(
                "Storage engine '{}' still holds {live} image(s)",
                engine.name
            ))
            .with_code(ErrorCode::StorageInUse));
        }

        let purged = ImageRepository::purge_deleted_by_engine(&mut *tx, id).await?;
        EngineRepository::delete(&mut *tx, id).await?;
        let backend = match self.cache.get(id).await {
            Some(backend) => Some(backend),
            None if !purged.is_empty() => self
                .cache
                .factory()
                .create(&engine.engine_type, &engine.config)
                .inspect_err(|e| warn!(engine_id = id, error = %e, "Cannot build backend to purge objects"))
                .ok(),
            None => None,
        };
        self.cache.delete(id).await;

        self.commit_or_resync(tx).await?;

        for image in &purged {
            if let Some(backend) = &backend {
                release_object(&self.images, backend, id, &image.storage_filename).await;
            }
            if let Some(url) = &image.thumbnail_url {
                release_thumbnail(&self.images, &self.thumbnails, url).await;
            }
        }

        info!(engine_id = id, purged = purged.len(), "Storage engine deleted");
        Ok(())
    }

    /// Make `id` the single default engine.
    pub async fn set_default(&self, id: i64) -> AppResult<StorageEngine> {
        let mut tx = begin(&self.pool).await?;
        let engine = EngineRepository::find_by_id_in(&mut *tx, id)
            .await?
            .ok_or_else(|| engine_not_found(id))?;
        if !engine.is_active {
            return Err(engine_disabled(&engine));
        }
        if !self.cache.exists(id).await {
            return Err(AppError::storage_unavailable(format!(
                "Storage engine '{}' is not loaded",
                engine.name
            ))
            .with_code(ErrorCode::StorageNotLoaded));
        }

        EngineRepository::clear_default(&mut *tx, Some(id)).await?;
        let engine = EngineRepository::set_default(&mut *tx, id).await?;
        self.cache.set_default(id).await;

        self.commit_or_resync(tx).await?;
        info!(engine_id = id, "Default storage engine changed");
        Ok(engine)
    }

    /// Probe an engine with a freshly built backend. Never fails on backend errors.
    pub async fn test_connection(&self, id: i64) -> AppResult<ConnectionTestResult> {
        let engine = self.get(id).await?;
        let started = Instant::now();

        let backend = match self.cache.factory().create(&engine.engine_type, &engine.config) {
            Ok(backend) => backend,
            Err(e) => {
                return Ok(ConnectionTestResult {
                    success: false,
                    message: e.message,
                    latency_ms: elapsed_ms(started),
                });
            }
        };

        let success = backend.test_connection().await;
        let latency_ms = elapsed_ms(started);
        info!(engine_id = id, success, latency_ms, "Storage connection tested");
        Ok(ConnectionTestResult {
            success,
            message: if success {
                "Connection successful".to_string()
            } else {
                "Connection failed".to_string()
            },
            latency_ms,
        })
    }

    /// Usage as reported by the backend, falling back to the database figure.
    pub async fn usage(&self, id: i64) -> AppResult<EngineUsage> {
        let engine = self.get(id).await?;

        let backend = match self.cache.get(id).await {
            Some(backend) => Some(backend),
            None => self
                .cache
                .factory()
                .create(&engine.engine_type, &engine.config)
                .inspect_err(|e| warn!(engine_id = id, error = %e, "Cannot build backend for usage scan"))
                .ok(),
        };
        let report = match backend {
            Some(backend) => backend.get_usage().await,
            None => StorageUsage::unavailable(),
        };

        let used_capacity = if report.available {
            i64::try_from(report.used_capacity).unwrap_or(i64::MAX)
        } else {
            engine.used_capacity
        };
        let quota = EngineQuota::new(engine.max_capacity, used_capacity);
        let image_count = self.images.count_live_by_engine(id).await?;

        Ok(EngineUsage {
            engine_id: id,
            used_capacity,
            max_capacity: engine.max_capacity,
            usage_percent: quota.usage_percent,
            file_count: report.file_count,
            image_count,
            available: report.available,
        })
    }

    /// Rebuild the cache from the active engines in the database.
    pub async fn reload_cache(&self) -> AppResult<CacheInfo> {
        let engines = self.engines.find_all(Some(true)).await?;
        self.cache.initialize(engines).await;
        Ok(self.cache.info().await)
    }

    pub fn supported_types(&self) -> Vec<String> {
        self.cache.factory().supported_types()
    }

    fn validate_config(&self, engine_type: &str, config: &serde_json::Value) -> AppResult<()> {
        if !self.cache.factory().is_supported(engine_type) {
            return Err(AppError::validation(format!("Unsupported storage type: {engine_type}"))
                .with_code(ErrorCode::UnsupportedStorageType));
        }
        if let Ok(kind) = EngineKind::from_str(engine_type) {
            EngineConfig::parse(kind, config)?;
        }
        Ok(())
    }

    async fn commit_or_resync(&self, tx: Transaction<'static, Sqlite>) -> AppResult<()> {
        if let Err(e) = commit(tx).await {
            error!(error = %e, "Commit failed after cache mutation, reloading engine cache");
            if let Err(reload) = self.reload_cache().await {
                error!(error = %reload, "Engine cache reload failed");
            }
            return Err(e);
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> AppResult<String> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::validation(format!(
            "Engine name must be 1-{MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn engine_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Storage engine {id} not found")).with_code(ErrorCode::StorageNotFound)
}

fn engine_disabled(engine: &StorageEngine) -> AppError {
    AppError::storage_unavailable(format!("Storage engine '{}' is disabled", engine.name))
        .with_code(ErrorCode::StorageDisabled)
}

fn invalid_capacity(message: impl Into<String>) -> AppError {
    AppError::conflict(message).with_code(ErrorCode::InvalidCapacity)
}

fn instance_create_failed(engine: &StorageEngine, cause: AppError) -> AppError {
    warn!(
        engine_id = engine.id,
        engine_type = %engine.engine_type,
        error = %cause,
        "Storage backend could not be constructed"
    );
    AppError::validation(format!(
        "Failed to create storage instance for '{}': {}",
        engine.name, cause.message
    ))
    .with_code(ErrorCode::StorageInstanceCreateFailed)
}
