//! Convenience result type alias for ImgHost.

use crate::error::AppError;

/// A specialized `Result` type for ImgHost operations.
pub type AppResult<T> = Result<T, AppError>;
