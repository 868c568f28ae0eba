//! Aliyun OSS storage backend.
//!
//! OSS exposes an S3-compatible API, so requests go through the same
//! `aws-sdk-s3` client as [`super::s3::S3Backend`] with virtual-hosted
//! addressing against `oss-{region}.aliyuncs.com`.

use async_trait::async_trait;
use bytes::Bytes;
use tracing::info;

use imghost_core::result::AppResult;
use imghost_core::traits::storage::{StorageBackend, StorageUsage};
use imghost_entity::engine::AliyunOssConfig;

use super::bucket::{BucketSettings, ObjectBucket};

/// Aliyun OSS storage backend.
#[derive(Debug, Clone)]
pub struct AliyunOssBackend {
    bucket: ObjectBucket,
    config: AliyunOssConfig,
}

impl AliyunOssBackend {
    /// Build the backend. The connection is only exercised on first use.
    pub fn new(config: AliyunOssConfig) -> AppResult<Self> {
        let scheme = scheme(config.use_ssl);
        let custom = config
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.ends_with("aliyuncs.com"));
        let endpoint = match config.endpoint.as_deref() {
            Some(endpoint) => with_scheme(endpoint, scheme),
            None => format!("{scheme}://oss-{}.aliyuncs.com", config.region),
        };

        info!(
            bucket = %config.bucket_name,
            region = %config.region,
            endpoint = %endpoint,
            "Initializing Aliyun OSS storage backend"
        );

        let bucket = ObjectBucket::connect(&BucketSettings {
            access_key_id: &config.access_key_id,
            secret_access_key: &config.access_key_secret,
            region: &format!("oss-{}", config.region),
            endpoint: Some(&endpoint),
            force_path_style: custom.is_some(),
            bucket: &config.bucket_name,
            prefix: &config.prefix,
        });

        Ok(Self { bucket, config })
    }
}

fn scheme(use_ssl: bool) -> &'static str {
    if use_ssl { "https" } else { "http" }
}

fn with_scheme(endpoint: &str, scheme: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.to_string()
    } else {
        format!("{scheme}://{endpoint}")
    }
}

#[async_trait]
impl StorageBackend for AliyunOssBackend {
    fn backend_type(&self) -> &str {
        "aliyun_oss"
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
        let scheme = scheme(self.config.use_ssl);

        if let Some(endpoint) = self
            .config
            .endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.ends_with("aliyuncs.com"))
        {
            let endpoint = with_scheme(endpoint, scheme);
            return format!("{endpoint}/{}/{full_key}", self.bucket.bucket());
        }

        format!(
            "{scheme}://{}.oss-{}.aliyuncs.com/{full_key}",
            self.bucket.bucket(),
            self.config.region
        )
    }

    async fn test_connection(&self) -> bool {
        self.bucket.check_access().await
    }

    async fn get_usage(&self) -> StorageUsage {
        self.bucket.usage().await
    }
}
