//! S3-compatible object storage backend (AWS S3, MinIO, Cloudflare R2).

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use imghost_core::result::AppResult;
use imghost_core::traits::storage::{StorageBackend, StorageUsage};
use imghost_entity::engine::S3Config;

use super::bucket::{BucketSettings, ObjectBucket};

/// S3-compatible storage backend.
#[derive(Debug, Clone)]
pub struct S3Backend {
    bucket: ObjectBucket,
    config: S3Config,
}

impl S3Backend {
    /// Build the backend. The connection is only exercised on first use.
    pub fn new(config: S3Config) -> AppResult<Self> {
        let endpoint = config.endpoint_url.as_deref().map(|endpoint| {
            let endpoint = api_endpoint(endpoint, &config.bucket_name);
            if config.use_ssl {
                endpoint
            } else {
                endpoint.replacen("https://", "http://", 1)
            }
        });

        info!(
            bucket = %config.bucket_name,
            region = %config.region_name,
            endpoint = endpoint.as_deref().unwrap_or("aws"),
            "Initializing S3 storage backend"
        );

        let bucket = ObjectBucket::connect(&BucketSettings {
            access_key_id: &config.access_key_id,
            secret_access_key: &config.secret_access_key,
            region: &config.region_name,
            endpoint: endpoint.as_deref(),
            force_path_style: endpoint.is_some(),
            bucket: &config.bucket_name,
            prefix: &config.base_path,
        });

        Ok(Self { bucket, config })
    }
}

/// Strip a trailing `/{bucket}` segment some providers (R2) include in the endpoint.
fn api_endpoint(endpoint: &str, bucket: &str) -> String {
    let endpoint = endpoint.trim_end_matches('/');
    if endpoint.contains("cloudflarestorage.com") {
        if let Some(pos) = endpoint.find(&format!("/{bucket}")) {
            return endpoint[..pos].to_string();
        }
    }
    endpoint.to_string()
}

#[async_trait]
impl StorageBackend for S3Backend {
    fn backend_type(&self) -> &str {
        "s3"
    }

    async fn upload(&self, data: Bytes, key: &str) -> AppResult<String> {
        self.bucket.put(key, data).await?;
        Ok(self.get_url(key))
    }

    async fn download(&self, key: &str) -> AppResult<Bytes> {
        self.bucket.get(key).await
    }

    async fn delete(&self, key: &str) -> AppResult<bool> {
        self.bucket.remove(key).await
    }

    async fn exists(&self, key: &str) -> AppResult<bool> {
        self.bucket.head(key).await
    }

    fn get_url(&self, key: &str) -> String {
        let full_key = self.bucket.full_key(key);
        let bucket = &self.config.bucket_name;

        if let Some(domain) = &self.config.custom_domain {
            if domain.starts_with("http://") || domain.starts_with("https://") {
                return format!("{domain}/{full_key}");
            }
            let scheme = if self.config.use_ssl { "https" } else { "http" };
            return format!("{scheme}://{domain}/{full_key}");
        }

        if let Some(endpoint) = &self.config.endpoint_url {
            let endpoint = api_endpoint(endpoint, bucket);
            return format!("{endpoint}/{bucket}/{full_key}");
        }

        format!(
            "https://{bucket}.s3.{}.amazonaws.com/{full_key}",
            self.config.region_name
        )
    }

    async fn test_connection(&self) -> bool {
        self.bucket.check_access().await
    }

    async fn get_usage(&self) -> StorageUsage {
        self.bucket.usage().await
    }
}
