//! Application state shared across all handlers and middleware.

use std::sync::Arc;
use std::time::Instant;

use sqlx::SqlitePool;

use imghost_core::config::AppConfig;
use imghost_service::{EngineService, ImageService, SettingsService};
use imghost_storage::EngineCache;

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`. Every field is
/// cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    // ── Configuration ────────────────────────────────────────
    pub config: Arc<AppConfig>,

    // ── Infrastructure ───────────────────────────────────────
    pub db_pool: SqlitePool,
    /// Live storage backends keyed by engine id
    pub engine_cache: EngineCache,

    // ── Services ─────────────────────────────────────────────
    pub image_service: Arc<ImageService>,
    pub engine_service: Arc<EngineService>,
    pub settings_service: Arc<SettingsService>,

    /// When the process started serving.
    pub started_at: Instant,
}
