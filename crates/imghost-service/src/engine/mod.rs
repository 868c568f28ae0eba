//! Storage engine administration.

pub mod service;

pub use service::{ConnectionTestResult, EngineService, EngineUsage};
