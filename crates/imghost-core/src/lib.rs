//! # imghost-core
//!
//! Core crate for ImgHost. Contains the storage backend contract,
//! configuration schemas, pagination types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other ImgHost crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorCode, ErrorKind};
pub use result::AppResult;
