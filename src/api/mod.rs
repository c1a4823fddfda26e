//! API layer
//!
//! HTTP handlers for:
//! - Account self-deletion
//! - Admin media maintenance

mod accounts;
mod admin;

pub use accounts::accounts_router;
pub use admin::{MediaCleanupRequest, MediaRefetchRequest, admin_router};
