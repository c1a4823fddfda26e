//! Blob storage module
//!
//! Handles:
//! - Media file write/delete on the local filesystem

mod media;

pub use media::MediaStorage;
