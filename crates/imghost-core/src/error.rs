//! Unified application error types for ImgHost.
//!
//! All crates map their internal errors into [`AppError`] for consistent
//! propagation through the ? operator. Errors that a client needs to react
//! to programmatically additionally carry a stable [`ErrorCode`].

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Input validation failed.
    Validation,
    /// The requested resource was not found.
    NotFound,
    /// A conflict occurred (resource in use, capacity exceeded, etc.).
    Conflict,
    /// A storage engine exists but cannot serve requests right now.
    StorageUnavailable,
    /// A storage backend I/O operation failed.
    StorageIo,
    /// A storage backend call did not finish in time.
    Timeout,
    /// A database error occurred.
    Database,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal server error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation => write!(f, "VALIDATION"),
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::StorageUnavailable => write!(f, "STORAGE_UNAVAILABLE"),
            Self::StorageIo => write!(f, "STORAGE_IO"),
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::Database => write!(f, "DATABASE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// Stable machine-readable error codes returned to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    InvalidImageFormat,
    ImageTooLarge,
    ImageNotFound,
    ImageUploadFailed,
    StorageNotFound,
    StorageDisabled,
    NoDefaultStorage,
    StorageNotLoaded,
    StorageFull,
    StorageInUse,
    InvalidCapacity,
    UnsupportedStorageType,
    InvalidStorageConfig,
    StorageInstanceCreateFailed,
    InvalidPathRule,
    StorageTimeout,
    ConfigNotFound,
}

impl ErrorCode {
    /// Return the wire representation of this code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidImageFormat => "INVALID_IMAGE_FORMAT",
            Self::ImageTooLarge => "IMAGE_TOO_LARGE",
            Self::ImageNotFound => "IMAGE_NOT_FOUND",
            Self::ImageUploadFailed => "IMAGE_UPLOAD_FAILED",
            Self::StorageNotFound => "STORAGE_NOT_FOUND",
            Self::StorageDisabled => "STORAGE_DISABLED",
            Self::NoDefaultStorage => "NO_DEFAULT_STORAGE",
            Self::StorageNotLoaded => "STORAGE_NOT_LOADED",
            Self::StorageFull => "STORAGE_FULL",
            Self::StorageInUse => "STORAGE_IN_USE",
            Self::InvalidCapacity => "INVALID_CAPACITY",
            Self::UnsupportedStorageType => "UNSUPPORTED_STORAGE_TYPE",
            Self::InvalidStorageConfig => "INVALID_STORAGE_CONFIG",
            Self::StorageInstanceCreateFailed => "STORAGE_INSTANCE_CREATE_FAILED",
            Self::InvalidPathRule => "INVALID_PATH_RULE",
            Self::StorageTimeout => "STORAGE_TIMEOUT",
            Self::ConfigNotFound => "CONFIG_NOT_FOUND",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The unified application error used throughout ImgHost.
///
/// All crate-specific errors are mapped into `AppError` using `From` impls
/// or explicit `.map_err()` calls.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// Client-facing error code, if one applies.
    pub code: Option<ErrorCode>,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new application error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new application error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            code: None,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Attach a client-facing error code.
    pub fn with_code(mut self, code: ErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a storage-unavailable error.
    pub fn storage_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageUnavailable, message)
    }

    /// Create a storage I/O error.
    pub fn storage_io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::StorageIo, message)
    }

    /// Create a timeout error.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message).with_code(ErrorCode::StorageTimeout)
    }

    /// Create a database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Database, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Whether this error carries the given code.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code == Some(code)
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            code: self.code,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::StorageIo, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_kind_and_message() {
        let err = AppError::not_found("Image 7 not found");
        assert_eq!(err.to_string(), "NOT_FOUND: Image 7 not found");
    }

    #[test]
    fn test_code_survives_clone() {
        let err = AppError::conflict("full").with_code(ErrorCode::StorageFull);
        let cloned = err.clone();
        assert!(cloned.has_code(ErrorCode::StorageFull));
        assert_eq!(cloned.kind, ErrorKind::Conflict);
    }

    #[test]
    fn test_code_serializes_screaming_snake() {
        let json = serde_json::to_string(&ErrorCode::StorageInstanceCreateFailed).unwrap();
        assert_eq!(json, "\"STORAGE_INSTANCE_CREATE_FAILED\"");
        assert_eq!(
            ErrorCode::NoDefaultStorage.as_str(),
            "NO_DEFAULT_STORAGE"
        );
    }

    #[test]
    fn test_io_error_maps_to_storage_io() {
        let err: AppError = std::io::Error::other("disk").into();
        assert_eq!(err.kind, ErrorKind::StorageIo);
    }
}
