//! Account processing
//!
//! Account deletion runs in two halves: `delete_self` only queues a
//! Delete Person event, and the client API consumer later calls `delete`
//! to run the cascade.

mod delete;
mod stubbify;

use std::sync::Arc;

use crate::data::{Account, AccountRepository, Database};
use crate::error::Result;
use crate::workers::{ClientApiMessage, Workers};

pub use stubbify::{stubbify_account, stubbify_user};

/// Account processor
#[derive(Clone)]
pub struct AccountProcessor {
    db: Arc<Database>,
    accounts: AccountRepository,
    workers: Workers,
}

impl AccountProcessor {
    /// Create new account processor
    pub fn new(db: Arc<Database>, accounts: AccountRepository, workers: Workers) -> Self {
        Self {
            db,
            accounts,
            workers,
        }
    }

    /// Queue deletion of a local account by its owner
    ///
    /// Returns once the event is queued. Federation of the Delete and the
    /// cascade itself happen on the client API consumer.
    pub async fn delete_self(&self, account: &Account) -> Result<()> {
        tracing::info!(
            account_id = %account.id,
            username = %account.username,
            "account deletion requested by owner"
        );

        self.workers
            .enqueue_client_api(vec![ClientApiMessage::delete_person(account.clone())]);

        Ok(())
    }
}
