//! Repository implementations for all ImgHost entities.

pub mod engine;
pub mod image;
pub mod system_config;

pub use engine::EngineRepository;
pub use image::ImageRepository;
pub use system_config::SystemConfigRepository;
