//! Object operations shared by the S3-compatible backends.

use aws_sdk_s3::Client;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::{debug, warn};

use imghost_core::error::{AppError, ErrorKind};
use imghost_core::result::AppResult;
use imghost_core::traits::storage::StorageUsage;

/// Connection settings for an S3-speaking endpoint.
#[derive(Debug, Clone)]
pub(crate) struct BucketSettings<'a> {
    pub access_key_id: &'a str,
    pub secret_access_key: &'a str,
    pub region: &'a str,
    pub endpoint: Option<&'a str>,
    pub force_path_style: bool,
    pub bucket: &'a str,
    pub prefix: &'a str,
}

/// A bucket plus key prefix reached through an `aws-sdk-s3` client.
#[derive(Debug, Clone)]
pub(crate) struct ObjectBucket {
    client: Client,
    bucket: String,
    prefix: String,
}

impl ObjectBucket {
    /// Build the client. No network traffic happens here.
    pub fn connect(settings: &BucketSettings<'_>) -> Self {
        let credentials = Credentials::new(
            settings.access_key_id,
            settings.secret_access_key,
            None,
            None,
            "imghost-engine",
        );
        let mut builder = aws_sdk_s3::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.to_string()))
            .credentials_provider(credentials)
            .force_path_style(settings.force_path_style);
        if let Some(endpoint) = settings.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
            bucket: settings.bucket.to_string(),
            prefix: settings.prefix.trim_matches('/').to_string(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Key inside the bucket for a backend-relative key.
    pub fn full_key(&self, key: &str) -> String {
        let key = key.trim_start_matches('/');
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    pub async fn put(&self, key: &str, data: Bytes) -> AppResult<()> {
        let full_key = self.full_key(key);
        let len = data.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .body(ByteStream::from(data))
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageIo,
                    format!("Failed to upload object {full_key}: {}", DisplayErrorContext(&e)),
                    e,
                )
            })?;
        debug!(bucket = %self.bucket, key = %full_key, bytes = len, "Uploaded object");
        Ok(())
    }

    pub async fn get(&self, key: &str) -> AppResult<Bytes> {
        let full_key = self.full_key(key);
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                if e.as_service_error().is_some_and(|s| s.is_no_such_key()) {
                    AppError::not_found(format!("Object not found: {key}"))
                } else {
                    AppError::with_source(
                        ErrorKind::StorageIo,
                        format!("Failed to download object {full_key}: {}", DisplayErrorContext(&e)),
                        e,
                    )
                }
            })?;

        let body = output.body.collect().await.map_err(|e| {
            AppError::with_source(
                ErrorKind::StorageIo,
                format!("Failed to read object body {full_key}"),
                e,
            )
        })?;
        Ok(body.into_bytes())
    }

    pub async fn head(&self, key: &str) -> AppResult<bool> {
        let full_key = self.full_key(key);
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let missing = e.as_service_error().is_some_and(|s| s.is_not_found())
                    || e.raw_response().is_some_and(|r| r.status().as_u16() == 404);
                if missing {
                    Ok(false)
                } else {
                    Err(AppError::with_source(
                        ErrorKind::StorageIo,
                        format!("Failed to stat object {full_key}: {}", DisplayErrorContext(&e)),
                        e,
                    ))
                }
            }
        }
    }

    /// Delete `key`, reporting whether it existed beforehand.
    pub async fn remove(&self, key: &str) -> AppResult<bool> {
        let existed = self.head(key).await?;
        if !existed {
            return Ok(false);
        }

        let full_key = self.full_key(key);
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(&full_key)
            .send()
            .await
            .map_err(|e| {
                AppError::with_source(
                    ErrorKind::StorageIo,
                    format!("Failed to delete object {full_key}: {}", DisplayErrorContext(&e)),
                    e,
                )
            })?;
        debug!(bucket = %self.bucket, key = %full_key, "Deleted object");
        Ok(true)
    }

    pub async fn check_access(&self) -> bool {
        match self.client.head_bucket().bucket(&self.bucket).send().await {
            Ok(_) => true,
            Err(e) => {
                warn!(bucket = %self.bucket, error = %DisplayErrorContext(&e), "Bucket access check failed");
                false
            }
        }
    }

    /// Sum object sizes under the prefix.
    pub async fn usage(&self) -> StorageUsage {
        let mut request = self.client.list_objects_v2().bucket(&self.bucket);
        if !self.prefix.is_empty() {
            request = request.prefix(format!("{}/", self.prefix));
        }
        let mut pages = request.into_paginator().send();

        let mut used_capacity = 0u64;
        let mut file_count = 0u64;
        while let Some(page) = pages.next().await {
            match page {
                Ok(page) => {
                    for object in page.contents() {
                        used_capacity += object.size().unwrap_or(0).max(0) as u64;
                        file_count += 1;
                    }
                }
                Err(e) => {
                    warn!(bucket = %self.bucket, error = %DisplayErrorContext(&e), "Failed to list objects");
                    return StorageUsage::unavailable();
                }
            }
        }

        StorageUsage {
            used_capacity,
            file_count: Some(file_count),
            available: true,
        }
    }
}
