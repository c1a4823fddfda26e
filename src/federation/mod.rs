//! ActivityPub federation module
//!
//! Handles:
//! - Building outgoing activities
//! - Persisting them to the outbox for the delivery transport

mod activity;
mod outbox;

pub use activity::{audience_for_visibility, builder, PUBLIC_AUDIENCE};
pub use outbox::{Federator, OutboxFederator};
