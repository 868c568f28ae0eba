//! Application builder: wires database, caches and services into `AppState`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tracing::info;

use imghost_core::config::AppConfig;
use imghost_core::result::AppResult;
use imghost_database::repositories::{EngineRepository, SystemConfigRepository};
use imghost_database::{DatabasePool, run_migrations};
use imghost_service::{EngineService, ImageService, SettingsCache, SettingsService};
use imghost_storage::{BackendContext, BackendFactory, EngineCache, ThumbnailGenerator};

use crate::router::build_router;
use crate::state::AppState;

/// Builds the complete Axum application with all routes and middleware.
pub fn build_app(state: AppState) -> Router {
    build_router(state)
}

/// Connects to the database and constructs every shared component.
pub async fn build_state(config: AppConfig) -> AppResult<AppState> {
    build_state_with_factory(config, BackendFactory::with_builtin).await
}

/// Like [`build_state`], with control over which backend types are registered.
pub async fn build_state_with_factory(
    config: AppConfig,
    make_factory: impl FnOnce(BackendContext) -> BackendFactory,
) -> AppResult<AppState> {
    // ── Step 1: Create data directories ──────────────────────────
    tokio::fs::create_dir_all(&config.storage.upload_dir).await?;
    tokio::fs::create_dir_all(&config.storage.thumbnail_dir).await?;

    // ── Step 2: Connect and migrate ──────────────────────────────
    let db = DatabasePool::connect(&config.database).await?;
    run_migrations(db.pool()).await?;
    let pool = db.pool().clone();

    // ── Step 3: Runtime settings ─────────────────────────────────
    let settings_cache = SettingsCache::new();
    let settings_service = SettingsService::new(
        SystemConfigRepository::new(pool.clone()),
        settings_cache.clone(),
    );
    settings_service.initialize_defaults().await?;

    // ── Step 4: Storage engines ──────────────────────────────────
    let factory = make_factory(BackendContext {
        upload_dir: PathBuf::from(&config.storage.upload_dir),
        timeout: config.storage.operation_timeout(),
    });
    info!(types = ?factory.supported_types(), "Storage backend types registered");
    let engine_cache = EngineCache::new(Arc::new(factory));
    let engines = EngineRepository::new(pool.clone())
        .find_all(Some(true))
        .await?;
    engine_cache.initialize(engines).await;

    // ── Step 5: Services ─────────────────────────────────────────
    let thumbnails = ThumbnailGenerator::new(&config.storage.thumbnail_dir);
    let engine_service =
        EngineService::new(pool.clone(), engine_cache.clone(), thumbnails.clone());
    let image_service =
        ImageService::new(pool.clone(), engine_cache.clone(), settings_cache, thumbnails);

    Ok(AppState {
        config: Arc::new(config),
        db_pool: pool,
        engine_cache,
        image_service: Arc::new(image_service),
        engine_service: Arc::new(engine_service),
        settings_service: Arc::new(settings_service),
        started_at: Instant::now(),
    })
}
