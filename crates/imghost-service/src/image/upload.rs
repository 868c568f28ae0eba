//! Upload workflow with content deduplication.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use imghost_core::error::{AppError, ErrorCode, ErrorKind};
use imghost_core::result::AppResult;
use imghost_core::traits::storage::StorageBackend;
use imghost_database::connection::{begin, commit};
use imghost_database::repositories::{EngineRepository, ImageRepository};
use imghost_entity::engine::StorageEngine;
use imghost_entity::image::{DedupPolicy, Image, NewImage};
use imghost_storage::ContentDigest;
use imghost_storage::ThumbnailGenerator;
use imghost_storage::path::{PathVars, extension_for, render_path};
use imghost_storage::thumbnail::image_dimensions;

use super::cleanup;
use super::service::ImageService;

/// One file to upload.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub filename: String,
    pub content_type: String,
    pub data: Bytes,
    /// Target engine; the default engine when absent.
    pub storage_engine_id: Option<i64>,
    pub upload_ip: Option<String>,
}

/// A file from a batch that could not be stored.
#[derive(Debug, Clone, Serialize)]
pub struct BatchUploadFailure {
    pub filename: String,
    pub error: String,
    pub error_code: Option<ErrorCode>,
}

/// Per-file outcome of a batch upload.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchUploadResult {
    pub succeeded: Vec<Image>,
    pub failed: Vec<BatchUploadFailure>,
}

impl ImageService {
    /// Store an image, or return the existing record for identical content.
    pub async fn upload(&self, req: UploadRequest) -> AppResult<Image> {
        let content_type = normalize_content_type(&req.content_type);
        self.validate(&req, &content_type).await?;

        let digest = ContentDigest::compute(&req.data);
        let policy = self.settings.dedup_policy().await;
        if let Some(existing) = self
            .images
            .find_duplicate(&digest.md5, &digest.sha256, policy)
            .await?
        {
            info!(
                image_id = existing.id,
                md5 = %digest.md5,
                policy = policy.as_str(),
                "Duplicate upload, returning existing image"
            );
            return Ok(existing);
        }

        let engine = self.resolve_engine(req.storage_engine_id).await?;
        let backend = self.cache.get(engine.id).await.ok_or_else(|| {
            AppError::storage_unavailable(format!("Storage engine '{}' is not loaded", engine.name))
                .with_code(ErrorCode::StorageNotLoaded)
        })?;

        let size = req.data.len() as i64;
        if engine.quota().would_exceed(size) {
            return Err(AppError::conflict(format!(
                "Storage engine '{}' has no room for {size} more bytes",
                engine.name
            ))
            .with_code(ErrorCode::StorageFull));
        }

        let now = Utc::now();
        let ext = extension_for(&req.filename, &content_type);
        let key = render_path(
            &engine.path_rule,
            &PathVars {
                filename: &digest.md5,
                ext: &ext,
                md5: &digest.md5,
                sha256: &digest.sha256,
                date: now,
            },
        )?;

        let original_url = backend
            .upload(req.data.clone(), &key)
            .await
            .map_err(|e| match e.kind {
                ErrorKind::Timeout => e,
                _ => AppError::with_source(
                    ErrorKind::StorageIo,
                    format!("Failed to upload '{}': {}", req.filename, e.message),
                    e,
                )
                .with_code(ErrorCode::ImageUploadFailed),
            })?;

        let dimensions = image_dimensions(&req.data);
        let thumbnail_url = self
            .make_thumbnail(&req.data, &content_type, &digest.md5, now)
            .await;

        let new_image = NewImage {
            md5: digest.md5.clone(),
            sha256: digest.sha256.clone(),
            original_filename: req.filename.clone(),
            storage_filename: key.clone(),
            storage_engine_id: engine.id,
            file_size: size,
            file_type: content_type.clone(),
            width: dimensions.map(|(w, _)| i64::from(w)),
            height: dimensions.map(|(_, h)| i64::from(h)),
            upload_ip: req.upload_ip.clone(),
            extra_metadata: json!({
                "width": dimensions.map(|(w, _)| w),
                "height": dimensions.map(|(_, h)| h),
                "extension": ext,
            }),
            original_url,
            thumbnail_url,
        };

        match self.record(&new_image).await {
            Ok(image) => {
                info!(
                    image_id = image.id,
                    engine_id = engine.id,
                    key = %key,
                    bytes = size,
                    "Image uploaded"
                );
                Ok(image)
            }
            Err(e) if e.kind == ErrorKind::Conflict => {
                self.resolve_race(&new_image, &backend, e).await
            }
            Err(e) => {
                self.discard(&new_image, &backend).await;
                Err(e)
            }
        }
    }

    /// Upload several files; a failure only affects its own file.
    pub async fn batch_upload(&self, requests: Vec<UploadRequest>) -> BatchUploadResult {
        let mut result = BatchUploadResult::default();
        for req in requests {
            let filename = req.filename.clone();
            match self.upload(req).await {
                Ok(image) => result.succeeded.push(image),
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Batch upload item failed");
                    result.failed.push(BatchUploadFailure {
                        filename,
                        error: e.message,
                        error_code: e.code,
                    });
                }
            }
        }
        info!(
            succeeded = result.succeeded.len(),
            failed = result.failed.len(),
            "Batch upload finished"
        );
        result
    }

    async fn validate(&self, req: &UploadRequest, content_type: &str) -> AppResult<()> {
        if req.data.is_empty() {
            return Err(AppError::validation("Uploaded file is empty")
                .with_code(ErrorCode::InvalidImageFormat));
        }

        let allowed = self.settings.allowed_image_types().await;
        if !allowed.iter().any(|t| t == content_type) {
            return Err(AppError::validation(format!(
                "Unsupported image type '{content_type}'. Allowed: {}",
                allowed.join(", ")
            ))
            .with_code(ErrorCode::InvalidImageFormat));
        }

        let max = self.settings.max_upload_size().await;
        if req.data.len() as u64 > max {
            return Err(AppError::validation(format!(
                "File size {} exceeds the limit of {max} bytes",
                req.data.len()
            ))
            .with_code(ErrorCode::ImageTooLarge));
        }
        Ok(())
    }

    /// The requested engine, or the cached default. Always read fresh from
    /// the database so capacity checks see current figures.
    async fn resolve_engine(&self, requested: Option<i64>) -> AppResult<StorageEngine> {
        match requested {
            Some(id) => {
                let engine = self.engines.find_by_id(id).await?.ok_or_else(|| {
                    AppError::not_found(format!("Storage engine {id} not found"))
                        .with_code(ErrorCode::StorageNotFound)
                })?;
                if !engine.is_active {
                    return Err(AppError::storage_unavailable(format!(
                        "Storage engine '{}' is disabled",
                        engine.name
                    ))
                    .with_code(ErrorCode::StorageDisabled));
                }
                Ok(engine)
            }
            None => {
                let no_default = || {
                    AppError::storage_unavailable("No default storage engine configured")
                        .with_code(ErrorCode::NoDefaultStorage)
                };
                let id = self.cache.default_engine_id().await.ok_or_else(no_default)?;
                self.engines.find_by_id(id).await?.ok_or_else(no_default)
            }
        }
    }

    async fn make_thumbnail(
        &self,
        data: &Bytes,
        content_type: &str,
        md5: &str,
        now: chrono::DateTime<Utc>,
    ) -> Option<String> {
        if !ThumbnailGenerator::is_supported(content_type) {
            return None;
        }
        let (width, height) = self.settings.thumbnail_size().await;
        let domain = self.settings.system_domain().await;
        match self
            .thumbnails
            .generate(data.clone(), md5, width, height, &domain, now)
            .await
        {
            Ok(url) => Some(url),
            Err(e) => {
                warn!(md5, error = %e, "Thumbnail generation failed");
                None
            }
        }
    }

    /// Insert the row and account its bytes in one transaction.
    async fn record(&self, new_image: &NewImage) -> AppResult<Image> {
        let mut tx = begin(&self.pool).await?;
        let image = ImageRepository::create(&mut *tx, new_image).await?;
        EngineRepository::increment_used_capacity(
            &mut *tx,
            new_image.storage_engine_id,
            new_image.file_size,
        )
        .await?;
        commit(tx).await?;
        Ok(image)
    }

    /// A concurrent upload of the same content committed first; hand back its row.
    async fn resolve_race(
        &self,
        ours: &NewImage,
        backend: &Arc<dyn StorageBackend>,
        conflict: AppError,
    ) -> AppResult<Image> {
        let Some(winner) = self
            .images
            .find_duplicate(&ours.md5, &ours.sha256, DedupPolicy::Both)
            .await?
        else {
            return Err(conflict);
        };

        self.discard(ours, backend).await;

        debug!(image_id = winner.id, md5 = %ours.md5, "Concurrent duplicate resolved to existing image");
        Ok(winner)
    }

    /// Remove the object and thumbnail of an upload whose row was never
    /// written, unless an existing row shares them.
    async fn discard(&self, ours: &NewImage, backend: &Arc<dyn StorageBackend>) {
        cleanup::release_object(
            &self.images,
            backend,
            ours.storage_engine_id,
            &ours.storage_filename,
        )
        .await;
        if let Some(url) = &ours.thumbnail_url {
            cleanup::release_thumbnail(&self.images, &self.thumbnails, url).await;
        }
    }
}

/// Lowercase the MIME type and drop parameters such as `; charset=`.
fn normalize_content_type(raw: &str) -> String {
    let essence = raw.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    match essence.as_str() {
        "image/jpg" | "image/pjpeg" => "image/jpeg".to_string(),
        _ => essence,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_content_type() {
        assert_eq!(normalize_content_type("Image/PNG"), "image/png");
        assert_eq!(normalize_content_type("image/jpeg; charset=binary"), "image/jpeg");
        assert_eq!(normalize_content_type("image/jpg"), "image/jpeg");
        assert_eq!(normalize_content_type(""), "");
    }
}
