//! Runtime settings stored in the database.

pub mod model;

pub use model::SystemConfig;
