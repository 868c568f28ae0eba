//! Image domain entities.

pub mod model;
pub mod query;

pub use model::{Image, NewImage};
pub use query::{DedupPolicy, ImageQuery};
