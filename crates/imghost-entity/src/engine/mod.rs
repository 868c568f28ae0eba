//! Storage engine domain entities.

pub mod config;
pub mod kind;
pub mod model;
pub mod quota;

pub use config::{AliyunOssConfig, EngineConfig, LocalConfig, S3Config};
pub use kind::EngineKind;
pub use model::{CreateEngine, StorageEngine, UpdateEngine, DEFAULT_PATH_RULE};
pub use quota::EngineQuota;
