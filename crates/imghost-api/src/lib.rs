//! # imghost-api
//!
//! HTTP API layer for ImgHost built on Axum.
//!
//! Provides the REST endpoints for images, storage engines and runtime
//! settings, static file serving for local uploads and thumbnails,
//! middleware (CORS, logging, error detail), extractors, DTOs, and error
//! mapping.

pub mod app;
pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, build_state, build_state_with_factory};
pub use error::{ApiError, ApiResult};
pub use state::AppState;
