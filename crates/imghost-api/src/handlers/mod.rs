//! HTTP request handlers, one module per resource.

pub mod config;
pub mod engine;
pub mod health;
pub mod image;
