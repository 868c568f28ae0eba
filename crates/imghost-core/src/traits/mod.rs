//! Core traits defined in `imghost-core` and implemented by other crates.

pub mod storage;

pub use storage::{StorageBackend, StorageUsage};
