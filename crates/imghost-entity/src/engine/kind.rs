//! Built-in storage engine type tags.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use imghost_core::{AppError, ErrorCode};

/// The type of a built-in storage backend.
///
/// Engines persist their type as a plain string so that backends registered
/// at runtime can be stored too; this enum covers the tags shipped with
/// ImgHost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineKind {
    /// Local filesystem.
    Local,
    /// S3-compatible object storage.
    S3,
    /// Aliyun Object Storage Service.
    AliyunOss,
}

impl EngineKind {
    /// All built-in kinds.
    pub const ALL: [EngineKind; 3] = [Self::Local, Self::S3, Self::AliyunOss];

    /// Return the type tag as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::S3 => "s3",
            Self::AliyunOss => "aliyun_oss",
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EngineKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "s3" => Ok(Self::S3),
            "aliyun_oss" => Ok(Self::AliyunOss),
            _ => Err(AppError::validation(format!(
                "Invalid storage type: '{s}'. Expected one of: local, s3, aliyun_oss"
            ))
            .with_code(ErrorCode::UnsupportedStorageType)),
        }
    }
}
