//! # imghost-database
//!
//! SQLite connection management and concrete repository
//! implementations for all ImgHost entities.
//!
//! Read methods run against the pool. Write methods take a
//! `&mut SqliteConnection` so that services can group them in one
//! transaction (`&mut *tx`).

pub mod connection;
pub mod migration;
pub mod repositories;

pub use connection::DatabasePool;
pub use migration::run_migrations;
