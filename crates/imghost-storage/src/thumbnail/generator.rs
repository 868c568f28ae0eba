//! Writes thumbnails below the thumbnail directory and removes them again.

use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::fs;

use imghost_core::error::{AppError, ErrorKind};
use imghost_core::result::AppResult;

use super::render::render_thumbnail;

/// URL segment under which thumbnails are served.
const URL_SEGMENT: &str = "/thumbnails/";

/// Generates thumbnails into a local directory served at `/thumbnails`.
#[derive(Debug, Clone)]
pub struct ThumbnailGenerator {
    output_dir: PathBuf,
}

impl ThumbnailGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Check if a content type can be thumbnailed.
    pub fn is_supported(content_type: &str) -> bool {
        matches!(
            content_type,
            "image/jpeg" | "image/jpg" | "image/png" | "image/gif" | "image/webp" | "image/bmp"
        )
    }

    /// Render and store a thumbnail, returning its public URL.
    pub async fn generate(
        &self,
        data: Bytes,
        md5: &str,
        width: u32,
        height: u32,
        system_domain: &str,
        date: DateTime<Utc>,
    ) -> AppResult<String> {
        let thumbnail =
            tokio::task::spawn_blocking(move || render_thumbnail(&data, width, height))
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::Internal, "Thumbnail task panicked", e)
                })??;

        let relative = format!(
            "{}/{md5}.{width}x{height}.{}",
            date.format("%Y%m%d"),
            thumbnail.extension
        );
        let path = self.output_dir.join(&relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&path, &thumbnail.data).await?;

        tracing::debug!(output = %path.display(), bytes = thumbnail.data.len(), "Generated thumbnail");

        Ok(format!(
            "{}{URL_SEGMENT}{relative}",
            system_domain.trim_end_matches('/')
        ))
    }

    /// The `/thumbnails/...` tail of a URL produced by [`Self::generate`].
    ///
    /// Two URLs with the same suffix name the same file even when they were
    /// built with different system domains.
    pub fn url_suffix(url: &str) -> Option<&str> {
        url.find(URL_SEGMENT).map(|start| &url[start..])
    }

    /// Local file behind a thumbnail URL produced by [`Self::generate`].
    pub fn path_for_url(&self, url: &str) -> Option<PathBuf> {
        let relative = Self::url_suffix(url)?.strip_prefix(URL_SEGMENT)?;
        let relative = Path::new(relative);
        if relative.as_os_str().is_empty()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.output_dir.join(relative))
    }

    /// Remove the thumbnail behind `url`. Returns whether a file was removed.
    pub async fn delete(&self, url: &str) -> AppResult<bool> {
        let Some(path) = self.path_for_url(url) else {
            return Ok(false);
        };
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
