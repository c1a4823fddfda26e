//! Authentication
//!
//! OAuth bearer tokens issued to local users.

mod middleware;

pub use middleware::{AdminAccount, CurrentAccount};
