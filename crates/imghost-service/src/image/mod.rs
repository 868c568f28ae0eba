//! Image upload, deduplication, listing and deletion.

pub(crate) mod cleanup;
pub mod service;
pub mod upload;

pub use service::{DownloadedImage, ImageService};
pub use upload::{BatchUploadFailure, BatchUploadResult, UploadRequest};
