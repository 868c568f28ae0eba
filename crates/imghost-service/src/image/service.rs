//! Image records and the objects behind them.

use bytes::Bytes;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::{info, warn};

use imghost_core::error::{AppError, ErrorCode};
use imghost_core::result::AppResult;
use imghost_core::types::PageResponse;
use imghost_database::connection::{begin, commit};
use imghost_database::repositories::{EngineRepository, ImageRepository};
use imghost_entity::image::{Image, ImageQuery};
use imghost_storage::{EngineCache, ThumbnailGenerator};

use super::cleanup;
use crate::setting::SettingsCache;

/// Raw image content fetched from its storage engine.
#[derive(Debug, Clone, Serialize)]
pub struct DownloadedImage {
    #[serde(skip)]
    pub data: Bytes,
    pub content_type: String,
    pub filename: String,
}

/// Image workflows over the database, the engine cache and local thumbnails.
#[derive(Debug, Clone)]
pub struct ImageService {
    pub(crate) pool: SqlitePool,
    pub(crate) images: ImageRepository,
    pub(crate) engines: EngineRepository,
    pub(crate) cache: EngineCache,
    pub(crate) settings: SettingsCache,
    pub(crate) thumbnails: ThumbnailGenerator,
}

impl ImageService {
    pub fn new(
        pool: SqlitePool,
        cache: EngineCache,
        settings: SettingsCache,
        thumbnails: ThumbnailGenerator,
    ) -> Self {
        Self {
            images: ImageRepository::new(pool.clone()),
            engines: EngineRepository::new(pool.clone()),
            pool,
            cache,
            settings,
            thumbnails,
        }
    }

    /// Fetch an image record, deleted or not.
    pub async fn get(&self, id: i64) -> AppResult<Image> {
        self.images
            .find_by_id(id)
            .await?
            .ok_or_else(|| image_not_found(id))
    }

    /// Page through images, newest first.
    pub async fn list(&self, query: &ImageQuery) -> AppResult<PageResponse<Image>> {
        let (items, total) = self.images.list(query).await?;
        Ok(PageResponse::new(items, query.page, total))
    }

    /// Delete an image.
    ///
    /// A soft delete only flags the row. A hard delete removes the row and
    /// releases its bytes from the engine's used capacity, then removes the
    /// stored object and thumbnail unless another row, deleted or not, still
    /// points at them. File removal is best effort.
    pub async fn delete(&self, id: i64, hard: bool) -> AppResult<()> {
        let image = self.get(id).await?;

        if !hard {
            let mut tx = begin(&self.pool).await?;
            let changed = ImageRepository::soft_delete(&mut *tx, id).await?;
            commit(tx).await?;
            info!(image_id = id, changed, "Image soft-deleted");
            return Ok(());
        }

        let mut tx = begin(&self.pool).await?;
        ImageRepository::delete(&mut *tx, id).await?;
        EngineRepository::decrement_used_capacity(&mut *tx, image.storage_engine_id, image.file_size)
            .await?;
        commit(tx).await?;

        match self.cache.get(image.storage_engine_id).await {
            Some(backend) => {
                cleanup::release_object(
                    &self.images,
                    &backend,
                    image.storage_engine_id,
                    &image.storage_filename,
                )
                .await
            }
            None => warn!(
                engine_id = image.storage_engine_id,
                key = %image.storage_filename,
                "Storage engine not loaded, object left in place"
            ),
        }
        if let Some(url) = &image.thumbnail_url {
            cleanup::release_thumbnail(&self.images, &self.thumbnails, url).await;
        }

        info!(
            image_id = id,
            engine_id = image.storage_engine_id,
            bytes = image.file_size,
            "Image hard-deleted"
        );
        Ok(())
    }

    /// Delete several images, returning how many succeeded.
    pub async fn batch_delete(&self, ids: &[i64], hard: bool) -> u64 {
        let mut deleted = 0;
        for &id in ids {
            match self.delete(id, hard).await {
                Ok(()) => deleted += 1,
                Err(e) => warn!(image_id = id, error = %e, "Batch delete item failed"),
            }
        }
        deleted
    }

    /// Read the stored bytes of a live image.
    pub async fn download(&self, id: i64) -> AppResult<DownloadedImage> {
        let image = self.get(id).await?;
        if image.is_deleted {
            return Err(image_not_found(id));
        }

        let backend = self.cache.get(image.storage_engine_id).await.ok_or_else(|| {
            AppError::storage_unavailable(format!(
                "Storage engine {} is not loaded",
                image.storage_engine_id
            ))
            .with_code(ErrorCode::StorageNotLoaded)
        })?;
        let data = backend.download(&image.storage_filename).await?;

        Ok(DownloadedImage {
            data,
            content_type: image.file_type,
            filename: image.original_filename,
        })
    }
}

pub(crate) fn image_not_found(id: i64) -> AppError {
    AppError::not_found(format!("Image {id} not found")).with_code(ErrorCode::ImageNotFound)
}
