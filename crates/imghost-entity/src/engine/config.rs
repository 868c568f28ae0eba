//! Typed provider configuration for the built-in engine kinds.
//!
//! Engines store their configuration as a free-form JSON object. Before an
//! engine is created or updated the object is parsed into one of the
//! structs below, so a missing bucket name or secret is reported at
//! creation time rather than on the first upload.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use imghost_core::{AppError, AppResult, ErrorCode};

use super::kind::EngineKind;

/// Local filesystem engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Sub-directory below the global upload directory.
    #[serde(default)]
    pub base_path: String,
    /// Public URL prefix under which the directory is served.
    #[serde(default = "default_local_base_url")]
    pub base_url: String,
}

/// S3-compatible engine settings (AWS, MinIO, Cloudflare R2, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S3Config {
    #[serde(alias = "aws_access_key_id")]
    pub access_key_id: String,
    #[serde(alias = "aws_secret_access_key")]
    pub secret_access_key: String,
    pub bucket_name: String,
    /// Custom endpoint; unset means AWS itself.
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default = "default_s3_region")]
    pub region_name: String,
    /// Key prefix inside the bucket.
    #[serde(default)]
    pub base_path: String,
    /// CDN or custom domain used for public URLs.
    #[serde(default, alias = "cdn_domain")]
    pub custom_domain: Option<String>,
    #[serde(default = "default_true")]
    pub use_ssl: bool,
}

/// Aliyun OSS engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliyunOssConfig {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub bucket_name: String,
    #[serde(default = "default_oss_region")]
    pub region: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Key prefix inside the bucket.
    #[serde(default)]
    pub prefix: String,
    #[serde(default = "default_true")]
    pub use_ssl: bool,
}

/// Parsed configuration of a built-in engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineConfig {
    Local(LocalConfig),
    S3(S3Config),
    AliyunOss(AliyunOssConfig),
}

impl EngineConfig {
    /// Parse and validate the raw JSON configuration of an engine of `kind`.
    pub fn parse(kind: EngineKind, raw: &serde_json::Value) -> AppResult<Self> {
        match kind {
            EngineKind::Local => LocalConfig::from_value(raw).map(Self::Local),
            EngineKind::S3 => S3Config::from_value(raw).map(Self::S3),
            EngineKind::AliyunOss => AliyunOssConfig::from_value(raw).map(Self::AliyunOss),
        }
    }

    /// The engine kind this configuration belongs to.
    pub fn kind(&self) -> EngineKind {
        match self {
            Self::Local(_) => EngineKind::Local,
            Self::S3(_) => EngineKind::S3,
            Self::AliyunOss(_) => EngineKind::AliyunOss,
        }
    }
}

impl LocalConfig {
    /// Parse from raw JSON and normalise the base path.
    pub fn from_value(raw: &serde_json::Value) -> AppResult<Self> {
        let mut config: Self = parse_object(raw, "local")?;
        config.base_path = config.base_path.trim_matches('/').to_string();
        if config.base_path.split('/').any(|segment| segment == "..") {
            return Err(invalid("local", "base_path must not contain '..'"));
        }
        Ok(config)
    }
}

impl S3Config {
    /// Parse from raw JSON, rejecting empty credentials.
    pub fn from_value(raw: &serde_json::Value) -> AppResult<Self> {
        let mut config: Self = parse_object(raw, "s3")?;
        require("s3", "access_key_id", &config.access_key_id)?;
        require("s3", "secret_access_key", &config.secret_access_key)?;
        require("s3", "bucket_name", &config.bucket_name)?;
        config.base_path = config.base_path.trim_matches('/').to_string();
        config.endpoint_url = non_empty(config.endpoint_url);
        config.custom_domain = non_empty(config.custom_domain);
        Ok(config)
    }
}

impl AliyunOssConfig {
    /// Parse from raw JSON, rejecting empty credentials.
    pub fn from_value(raw: &serde_json::Value) -> AppResult<Self> {
        let mut config: Self = parse_object(raw, "aliyun_oss")?;
        require("aliyun_oss", "access_key_id", &config.access_key_id)?;
        require("aliyun_oss", "access_key_secret", &config.access_key_secret)?;
        require("aliyun_oss", "bucket_name", &config.bucket_name)?;
        config.prefix = config.prefix.trim_matches('/').to_string();
        config.endpoint = non_empty(config.endpoint);
        Ok(config)
    }
}

fn parse_object<T: DeserializeOwned>(raw: &serde_json::Value, kind: &str) -> AppResult<T> {
    let value = if raw.is_null() {
        serde_json::Value::Object(Default::default())
    } else {
        raw.clone()
    };
    serde_json::from_value(value).map_err(|e| invalid(kind, &e.to_string()))
}

fn require(kind: &str, field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(invalid(kind, &format!("'{field}' must not be empty")));
    }
    Ok(())
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().trim_end_matches('/').to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(kind: &str, detail: &str) -> AppError {
    AppError::validation(format!("Invalid {kind} storage config: {detail}"))
        .with_code(ErrorCode::InvalidStorageConfig)
}

fn default_local_base_url() -> String {
    "http://localhost:8000/uploads".to_string()
}

fn default_s3_region() -> String {
    "us-east-1".to_string()
}

fn default_oss_region() -> String {
    "cn-hangzhou".to_string()
}

fn default_true() -> bool {
    true
}
