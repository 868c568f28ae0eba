//! Builds storage backends from engine type tags and JSON configuration.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use imghost_core::error::{AppError, ErrorCode};
use imghost_core::result::AppResult;
use imghost_core::traits::storage::StorageBackend;
use imghost_entity::engine::{AliyunOssConfig, EngineKind, LocalConfig, S3Config};

use crate::providers::{AliyunOssBackend, LocalBackend, S3Backend};
use crate::timed::TimedBackend;

/// Environment shared by every backend the factory builds.
#[derive(Debug, Clone)]
pub struct BackendContext {
    /// Directory local engines resolve their `base_path` against.
    pub upload_dir: PathBuf,
    /// Upper bound for a single backend call.
    pub timeout: Duration,
}

/// Constructor for one backend type.
pub type Constructor =
    Arc<dyn Fn(&Value, &BackendContext) -> AppResult<Arc<dyn StorageBackend>> + Send + Sync>;

/// Registry of backend constructors keyed by engine type tag.
#[derive(Clone)]
pub struct BackendFactory {
    registry: HashMap<String, Constructor>,
    ctx: BackendContext,
}

impl fmt::Debug for BackendFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendFactory")
            .field("types", &self.supported_types())
            .field("ctx", &self.ctx)
            .finish()
    }
}

impl BackendFactory {
    /// Factory with no registered types.
    pub fn empty(ctx: BackendContext) -> Self {
        Self {
            registry: HashMap::new(),
            ctx,
        }
    }

    /// Factory that knows the local, S3 and Aliyun OSS backends.
    pub fn with_builtin(ctx: BackendContext) -> Self {
        let mut factory = Self::empty(ctx);

        factory.register(
            EngineKind::Local.as_str(),
            Arc::new(|raw: &Value, ctx: &BackendContext| -> AppResult<Arc<dyn StorageBackend>> {
                let config = LocalConfig::from_value(raw)?;
                let backend: Arc<dyn StorageBackend> =
                    Arc::new(LocalBackend::new(&ctx.upload_dir, &config)?);
                Ok(backend)
            }),
        );
        factory.register(
            EngineKind::S3.as_str(),
            Arc::new(|raw: &Value, _ctx: &BackendContext| -> AppResult<Arc<dyn StorageBackend>> {
                let backend: Arc<dyn StorageBackend> =
                    Arc::new(S3Backend::new(S3Config::from_value(raw)?)?);
                Ok(backend)
            }),
        );
        factory.register(
            EngineKind::AliyunOss.as_str(),
            Arc::new(|raw: &Value, _ctx: &BackendContext| -> AppResult<Arc<dyn StorageBackend>> {
                let backend: Arc<dyn StorageBackend> =
                    Arc::new(AliyunOssBackend::new(AliyunOssConfig::from_value(raw)?)?);
                Ok(backend)
            }),
        );

        factory
    }

    /// Register (or replace) the constructor for `type_tag`.
    pub fn register(&mut self, type_tag: impl Into<String>, constructor: Constructor) {
        self.registry.insert(type_tag.into(), constructor);
    }

    pub fn context(&self) -> &BackendContext {
        &self.ctx
    }

    /// Build a backend for `type_tag`, wrapped with the per-call timeout.
    pub fn create(&self, type_tag: &str, config: &Value) -> AppResult<Arc<dyn StorageBackend>> {
        let constructor = self.registry.get(type_tag).ok_or_else(|| {
            AppError::validation(format!("Unsupported storage type: {type_tag}"))
                .with_code(ErrorCode::UnsupportedStorageType)
        })?;

        let backend = constructor(config, &self.ctx)?;
        debug!(backend = type_tag, "Constructed storage backend");
        Ok(Arc::new(TimedBackend::new(backend, self.ctx.timeout)))
    }

    pub fn is_supported(&self, type_tag: &str) -> bool {
        self.registry.contains_key(type_tag)
    }

    /// Registered type tags, sorted.
    pub fn supported_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.registry.keys().cloned().collect();
        types.sort();
        types
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imghost_core::ErrorKind;
    use serde_json::json;

    fn factory(dir: &std::path::Path) -> BackendFactory {
        BackendFactory::with_builtin(BackendContext {
            upload_dir: dir.to_path_buf(),
            timeout: Duration::from_secs(5),
        })
    }

    #[test]
    fn test_supported_types_sorted() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            factory(dir.path()).supported_types(),
            vec!["aliyun_oss", "local", "s3"]
        );
    }

    #[test]
    fn test_unknown_type_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = factory(dir.path()).create("ftp", &json!({})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert!(err.has_code(ErrorCode::UnsupportedStorageType));
    }

    #[test]
    fn test_creates_local_backend() {
        let dir = tempfile::tempdir().unwrap();
        let backend = factory(dir.path())
            .create("local", &json!({"base_path": "e1", "base_url": "http://h/uploads"}))
            .unwrap();
        assert_eq!(backend.backend_type(), "local");
        assert_eq!(backend.get_url("a.png"), "http://h/uploads/a.png");
        assert!(dir.path().join("e1").is_dir());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = factory(dir.path()).create("s3", &json!({})).unwrap_err();
        assert!(err.has_code(ErrorCode::InvalidStorageConfig));
    }

    #[test]
    fn test_register_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let mut factory = factory(dir.path());
        factory.register(
            "broken",
            Arc::new(|_: &Value, _: &BackendContext| -> AppResult<Arc<dyn StorageBackend>> {
                Err(AppError::storage_unavailable("nope"))
            }),
        );
        assert!(factory.is_supported("broken"));
        assert!(factory.create("broken", &json!({})).is_err());
    }
}
