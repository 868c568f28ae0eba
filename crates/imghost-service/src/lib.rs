//! # imghost-service
//!
//! Business logic service layer for ImgHost. Services orchestrate the
//! repositories, the storage engine cache and the runtime settings to
//! implement the upload, engine administration and settings use cases.
//!
//! Services follow constructor injection: the pool and the shared caches
//! are handed in at construction time and cloned cheaply.

pub mod engine;
pub mod image;
pub mod setting;

pub use engine::{ConnectionTestResult, EngineService, EngineUsage};
pub use image::{
    BatchUploadFailure, BatchUploadResult, DownloadedImage, ImageService, UploadRequest,
};
pub use setting::{SettingsCache, SettingsService};
