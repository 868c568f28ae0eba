//! Thumbnail rendering and on-disk thumbnail storage.

pub mod generator;
pub mod render;

pub use generator::ThumbnailGenerator;
pub use render::{Thumbnail, image_dimensions, render_thumbnail};
