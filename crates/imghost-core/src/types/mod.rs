//! Core type definitions used across the ImgHost workspace.

pub mod pagination;

pub use pagination::{PageRequest, PageResponse};
