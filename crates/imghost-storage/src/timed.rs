//! Per-call timeout decorator for storage backends.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::warn;

use imghost_core::error::AppError;
use imghost_core::result::AppResult;
use imghost_core::traits::storage::{StorageBackend, StorageUsage};

/// Wraps a backend so no single call can run longer than `limit`.
///
/// Timed-out data operations fail with [`imghost_core::ErrorKind::Timeout`];
/// the connection test and usage calls degrade to `false` and unavailable.
#[derive(Debug, Clone)]
pub struct TimedBackend {
    inner: Arc<dyn StorageBackend>,
    limit: Duration,
}

impl TimedBackend {
    pub fn new(inner: Arc<dyn StorageBackend>, limit: Duration) -> Self {
        Self { inner, limit }
    }

    async fn run<T>(
        &self,
        operation: &str,
        key: &str,
        fut: impl Future<Output = AppResult<T>>,
    ) -> AppResult<T> {
        match tokio::time::timeout(self.limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    backend = self.inner.backend_type(),
                    operation,
                    key,
                    timeout_ms = self.limit.as_millis() as u64,
                    "Storage call timed out"
                );
                Err(AppError::timeout(format!(
                    "Storage {operation} for '{key}' timed out after {}s",
                    self.limit.as_secs_f32()
                )))
            }
        }
    }
}

#[async_trait]
impl StorageBackend for TimedBackend {
    fn backend_type(&self) -> &str {
        self.inner.backend_type()
    }

    async fn upload(&self, data: Bytes, key: &str) -> AppResult<String> {
        self.run("upload", key, self.inner.upload(data, key)).await
    }

    async fn download(&self, key: &str) -> AppResult<Bytes> {
        self.run("download", key, self.inner.download(key)).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.run("delete", key, self.inner.delete(key)).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.run("exists", key, self.inner.exists(key)).await
    }

    fn get_url(&self, key: &str) -> String {
        self.inner.get_url(key)
    }

    async fn test_connection(&self) -> bool {
        match tokio::time::timeout(self.limit, self.inner.test_connection()).await {
            Ok(ok) => ok,
            Err(_) => {
                warn!(backend = self.inner.backend_type(), "Connection test timed out");
                false
            }
        }
    }

    async fn get_usage(&self) -> StorageUsage {
        match tokio::time::timeout(self.limit, self.inner.get_usage()).await {
            Ok(usage) => usage,
            Err(_) => {
                warn!(backend = self.inner.backend_type(), "Usage scan timed out");
                StorageUsage::unavailable()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imghost_core::ErrorKind;

    #[derive(Debug)]
    struct SlowBackend;

    #[async_trait]
    impl StorageBackend for SlowBackend {
        fn backend_type(&self) -> &str {
            "slow"
        }

        async fn upload(&self, _data: Bytes, key: &str) -> AppResult<String> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(key.to_string())
        }

        async fn download(&self, _key: &str) -> AppResult<Bytes> {
            Ok(Bytes::from_static(b"fast"))
        }

        async fn delete(&self, _key: &str) -> AppResult<bool> {
            Ok(true)
        }

        async fn exists(&self, _key: &str) -> AppResult<bool> {
            Ok(true)
        }

        fn get_url(&self, key: &str) -> String {
            format!("slow://{key}")
        }

        async fn test_connection(&self) -> bool {
            tokio::time::sleep(Duration::from_secs(60)).await;
            true
        }

        async fn get_usage(&self) -> StorageUsage {
            tokio::time::sleep(Duration::from_secs(60)).await;
            StorageUsage::default()
        }
    }

    fn timed() -> TimedBackend {
        TimedBackend::new(Arc::new(SlowBackend), Duration::from_secs(5))
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_upload_times_out() {
        let err = timed()
            .upload(Bytes::from_static(b"x"), "k")
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }

    #[tokio::test(start_paused = true)]
    async fn test_connection_and_usage_degrade() {
        let backend = timed();
        assert!(!backend.test_connection().await);
        assert!(!backend.get_usage().await.available);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_calls_pass_through() {
        let backend = timed();
        assert_eq!(backend.download("k").await.unwrap(), Bytes::from_static(b"fast"));
        assert_eq!(backend.get_url("k"), "slow://k");
        assert_eq!(backend.backend_type(), "slow");
    }
}
