//! # imghost-storage
//!
//! Storage backend implementations for ImgHost (local filesystem,
//! S3-compatible object stores and Aliyun OSS), the factory that builds
//! them from engine records, and the cache of live backend instances.

pub mod cache;
pub mod digest;
pub mod factory;
pub mod path;
pub mod providers;
pub mod thumbnail;
pub mod timed;

pub use cache::{CacheInfo, EngineCache};
pub use digest::ContentDigest;
pub use factory::{BackendContext, BackendFactory};
pub use thumbnail::ThumbnailGenerator;
pub use timed::TimedBackend;
