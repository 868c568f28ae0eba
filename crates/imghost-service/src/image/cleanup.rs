//! Best-effort removal of files that no image row points at any more.
//!
//! Callers run these only after the owning row is gone (committed delete)
//! or was never written (failed insert). A file still referenced by any
//! row, deleted or not, is left in place.

use std::sync::Arc;

use tracing::{debug, warn};

use imghost_core::traits::storage::StorageBackend;
use imghost_database::repositories::ImageRepository;
use imghost_storage::ThumbnailGenerator;

/// Remove `key` from `backend` unless a row on `engine_id` still references it.
pub(crate) async fn release_object(
    images: &ImageRepository,
    backend: &Arc<dyn StorageBackend>,
    engine_id: i64,
    key: &str,
) {
    match images.count_referencing_object(engine_id, key).await {
        Ok(0) => {}
        Ok(refs) => {
            debug!(engine_id, key, refs, "Stored object still referenced, keeping it");
            return;
        }
        Err(e) => {
            warn!(engine_id, key, error = %e, "Cannot check object references, keeping it");
            return;
        }
    }

    match backend.delete(key).await {
        Ok(existed) => debug!(engine_id, key, existed, "Removed stored object"),
        Err(e) => warn!(engine_id, key, error = %e, "Failed to remove stored object"),
    }
}

/// Remove the thumbnail behind `url` unless a row still references it.
pub(crate) async fn release_thumbnail(
    images: &ImageRepository,
    thumbnails: &ThumbnailGenerator,
    url: &str,
) {
    let Some(suffix) = ThumbnailGenerator::url_suffix(url) else {
        return;
    };

    match images.count_referencing_thumbnail(suffix).await {
        Ok(0) => {}
        Ok(refs) => {
            debug!(url, refs, "Thumbnail still referenced, keeping it");
            return;
        }
        Err(e) => {
            warn!(url, error = %e, "Cannot check thumbnail references, keeping it");
            return;
        }
    }

    if let Err(e) = thumbnails.delete(url).await {
        warn!(url, error = %e, "Failed to remove thumbnail");
    }
}
