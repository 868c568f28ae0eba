//! Runtime settings: the in-memory cache and the service that persists it.

pub mod cache;
pub mod service;

pub use cache::{DEFAULT_SETTINGS, SettingsCache, keys};
pub use service::SettingsService;
