//! Shared fixtures for service integration tests.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde_json::{Value, json};
use sqlx::SqlitePool;
use tempfile::TempDir;

use imghost_core::traits::storage::StorageBackend;
use imghost_core::{AppError, AppResult};
use imghost_core::config::database::DatabaseConfig;
use imghost_database::repositories::SystemConfigRepository;
use imghost_database::{DatabasePool, run_migrations};
use imghost_entity::engine::{CreateEngine, StorageEngine};
use imghost_service::{EngineService, ImageService, SettingsCache, SettingsService, UploadRequest};
use imghost_storage::{BackendContext, BackendFactory, EngineCache, ThumbnailGenerator};

/// Engine type whose backend can never be constructed.
pub const BROKEN: &str = "broken";

pub struct TestEnv {
    pub dir: TempDir,
    pub pool: SqlitePool,
    pub cache: EngineCache,
    pub settings: SettingsService,
    pub engines: EngineService,
    pub images: ImageService,
}

impl TestEnv {
    pub fn upload_dir(&self) -> PathBuf {
        self.dir.path().join("uploads")
    }

    pub fn thumbnail_dir(&self) -> PathBuf {
        self.dir.path().join("thumbnails")
    }

    /// Create an active local engine rooted at `uploads/{base_path}`.
    pub async fn local_engine(&self, name: &str, base_path: &str) -> StorageEngine {
        self.engines
            .create(CreateEngine {
                name: name.to_string(),
                engine_type: "local".to_string(),
                config: json!({"base_path": base_path, "base_url": "http://localhost:8000/uploads"}),
                path_rule: None,
                is_active: true,
                is_default: false,
                max_capacity: None,
            })
            .await
            .unwrap()
    }

    pub async fn engine(&self, id: i64) -> StorageEngine {
        self.engines.get(id).await.unwrap()
    }

    pub async fn default_count(&self) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM storage_engines WHERE is_default = 1")
            .fetch_one(&self.pool)
            .await
            .unwrap()
    }
}

pub async fn setup() -> TestEnv {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        url: format!("sqlite://{}", dir.path().join("test.db").display()),
        ..DatabaseConfig::default()
    };
    let db = DatabasePool::connect(&config).await.unwrap();
    run_migrations(db.pool()).await.unwrap();
    let pool = db.pool().clone();

    let mut factory = BackendFactory::with_builtin(BackendContext {
        upload_dir: dir.path().join("uploads"),
        timeout: Duration::from_secs(5),
    });
    factory.register(
        BROKEN,
        Arc::new(|_: &Value, _: &BackendContext| -> AppResult<Arc<dyn StorageBackend>> {
            Err(AppError::storage_unavailable("backend refuses to start"))
        }),
    );
    let cache = EngineCache::new(Arc::new(factory));

    let settings_cache = SettingsCache::new();
    let settings = SettingsService::new(SystemConfigRepository::new(pool.clone()), settings_cache.clone());
    settings.initialize_defaults().await.unwrap();

    let thumbnails = ThumbnailGenerator::new(dir.path().join("thumbnails"));
    let engines = EngineService::new(pool.clone(), cache.clone(), thumbnails.clone());
    let images = ImageService::new(pool.clone(), cache.clone(), settings_cache, thumbnails);

    TestEnv {
        dir,
        pool,
        cache,
        settings,
        engines,
        images,
    }
}

pub fn upload(filename: &str, content_type: &str, data: impl Into<Bytes>) -> UploadRequest {
    UploadRequest {
        filename: filename.to_string(),
        content_type: content_type.to_string(),
        data: data.into(),
        storage_engine_id: None,
        upload_ip: Some("127.0.0.1".to_string()),
    }
}

/// A small solid-colour PNG.
pub fn png(width: u32, height: u32) -> Bytes {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([30, 144, 255]));
    let mut buf = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .unwrap();
    Bytes::from(buf.into_inner())
}
