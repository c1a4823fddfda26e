//! Processing layer
//!
//! Business logic behind the HTTP handlers and the client API worker.

pub mod account;
pub mod admin;
pub mod fromclientapi;

pub use account::AccountProcessor;
pub use admin::AdminProcessor;
pub use fromclientapi::ClientApiProcessor;
