//! Custom Axum extractors.

pub mod client_ip;
pub mod rejection;
pub mod validated;

pub use client_ip::ClientIp;
pub use rejection::{ApiJson, ApiPath, ApiQuery};
pub use validated::ValidatedJson;
