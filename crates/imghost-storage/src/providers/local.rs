//! Local filesystem storage backend.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::{debug, warn};

use imghost_core::error::{AppError, ErrorKind};
use imghost_core::result::AppResult;
use imghost_core::traits::storage::{StorageBackend, StorageUsage};
use imghost_entity::engine::LocalConfig;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    /// Root directory for all stored files.
    root: PathBuf,
    /// Public URL prefix, without trailing slash.
    base_url: String,
}

impl LocalBackend {
    /// Create a backend rooted at `upload_dir/base_path`, creating the directory.
    pub fn new(upload_dir: &Path, config: &LocalConfig) -> AppResult<Self> {
        let root = if config.base_path.is_empty() {
            upload_dir.to_path_buf()
        } else {
            upload_dir.join(&config.base_path)
        };
        std::fs::create_dir_all(&root).map_err(|e| {
            AppError::with_source(
                ErrorKind::StorageUnavailable,
                format!("Failed to create storage root: {}", root.display()),
                e,
            )
        })?;
        Ok(Self {
            root,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Root directory of this backend.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a key to a path inside the root, refusing anything that escapes it.
    fn resolve(&self, key: &str) -> AppResult<PathBuf> {
        let mut path = self.root.clone();
        let mut depth = 0usize;
        for component in Path::new(key.trim_start_matches('/')).components() {
            match component {
                Component::Normal(part) => {
                    path.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                _ => {
                    return Err(AppError::validation(format!("Invalid storage key: {key}")));
                }
            }
        }
        if depth == 0 {
            return Err(AppError::validation("Storage key must not be empty"));
        }
        Ok(path)
    }

    /// Ensure the parent directory of a path exists.
    async fn ensure_parent(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageIo,
                    format!("Failed to create parent directory: {}", parent.display()),
                    e,
                )
            })?;
        }
        Ok(())
    }
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn backend_type(&self) -> &str {
        "local"
    }

    async fn upload(&self, data: Bytes, key: &str) -> AppResult<String> {
        let full_path = self.resolve(key)?;
        self.ensure_parent(&full_path).await?;

        fs::write(&full_path, &data).await.map_err(|e| {
            AppError::with_source(ErrorKind::StorageIo, format!("Failed to write file: {key}"), e)
        })?;

        debug!(key, bytes = data.len(), "Wrote file");
        Ok(self.get_url(key))
    }

    async fn download(&self, key: &str) -> AppResult<Bytes> {
        let full_path = self.resolve(key)?;
        let data = fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AppError::not_found(format!("File not found: {key}"))
            } else {
                AppError::with_source(ErrorKind::StorageIo, format!("Failed to read file: {key}"), e)
            }
        })?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        let full_path = self.resolve(key)?;
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                debug!(key, "Deleted file");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::with_source(
                ErrorKind::StorageIo,
                format!("Failed to delete file: {key}"),
                e,
            )),
        }
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        let full_path = self.resolve(key)?;
        fs::try_exists(&full_path).await.map_err(|e| {
            AppError::with_source(ErrorKind::StorageIo, format!("Failed to stat file: {key}"), e)
        })
    }

    fn get_url(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key.trim_start_matches('/'))
    }

    async fn test_connection(&self) -> bool {
        let marker = self.root.join(format!(".write-check-{}", uuid::Uuid::new_v4()));
        let result = async {
            fs::create_dir_all(&self.root).await?;
            fs::write(&marker, b"ok").await?;
            fs::remove_file(&marker).await
        }
        .await;

        if let Err(e) = result {
            warn!(root = %self.root.display(), error = %e, "Local storage is not writable");
            return false;
        }
        true
    }

    async fn get_usage(&self) -> StorageUsage {
        let root = self.root.clone();
        match tokio::task::spawn_blocking(move || walk_usage(&root)).await {
            Ok(Ok((used_capacity, file_count))) => StorageUsage {
                used_capacity,
                file_count: Some(file_count),
                available: true,
            },
            Ok(Err(e)) => {
                warn!(root = %self.root.display(), error = %e, "Failed to scan local storage");
                StorageUsage::unavailable()
            }
            Err(e) => {
                warn!(error = %e, "Usage scan task panicked");
                StorageUsage::unavailable()
            }
        }
    }
}

/// Sum file sizes below `root`, returning `(bytes, files)`.
fn walk_usage(root: &Path) -> std::io::Result<(u64, u64)> {
    let mut bytes = 0u64;
    let mut files = 0u64;
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in std::fs::read_dir(&dir)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            if file_type.is_dir() {
                pending.push(entry.path());
            } else if file_type.is_file() {
                bytes += entry.metadata()?.len();
                files += 1;
            }
        }
    }
    Ok((bytes, files))
}
