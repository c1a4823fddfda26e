//! Data layer module
//!
//! Handles all data persistence and caching:
//! - SQLite database operations
//! - Per-entity caches (volatile)
//! - Cache-backed repositories for accounts and media attachments

mod accounts;
mod cache;
mod database;
mod media;
mod models;

pub use accounts::AccountRepository;
pub use cache::{CacheKey, Cacheable, StructCache};
pub use database::Database;
pub(crate) use database::with_updated_at;
pub use media::MediaRepository;
pub use models::*;

#[cfg(test)]
pub(crate) mod fixtures;
