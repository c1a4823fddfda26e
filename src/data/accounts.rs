//! Account repository

use chrono::Utc;
use std::sync::Arc;

use super::cache::{CacheKey, Cacheable, StructCache};
use super::database::{with_updated_at, Database};
use super::models::{Account, AccountColumn, Follow};
use crate::error::{NotFoundExt, Result};

impl Cacheable for Account {
    fn cache_keys(&self) -> Vec<CacheKey> {
        vec![
            CacheKey::new("ID", &[&self.id]),
            CacheKey::new("URI", &[&self.uri]),
            CacheKey::new("Username.Domain", &[&self.username, &self.domain]),
        ]
    }
}

/// Cache-backed access to accounts
#[derive(Clone)]
pub struct AccountRepository {
    db: Arc<Database>,
    cache: Arc<StructCache<Account>>,
}

impl AccountRepository {
    pub fn new(db: Arc<Database>, cache: Arc<StructCache<Account>>) -> Self {
        Self { db, cache }
    }

    pub async fn get_account_by_id(&self, id: &str) -> Result<Account> {
        let account = self
            .cache
            .load("ID", || self.db.get_account_by_id(id), &[id])
            .await?;
        Ok(Account::clone(&account))
    }

    pub async fn get_account_by_uri(&self, uri: &str) -> Result<Account> {
        let account = self
            .cache
            .load("URI", || self.db.get_account_by_uri(uri), &[uri])
            .await?;
        Ok(Account::clone(&account))
    }

    /// Look up by username and domain (empty domain for local accounts)
    pub async fn get_account_by_username_domain(
        &self,
        username: &str,
        domain: &str,
    ) -> Result<Account> {
        let account = self
            .cache
            .load(
                "Username.Domain",
                || self.db.get_account_by_username_domain(username, domain),
                &[username, domain],
            )
            .await?;
        Ok(Account::clone(&account))
    }

    pub async fn sync_cache_size(&self) {
        self.cache.sync_size().await;
    }

    pub async fn put_account(&self, account: &Account) -> Result<()> {
        self.cache
            .store(account, self.db.insert_account(account))
            .await
    }

    /// Persist the given columns, always including `updated_at`
    pub async fn update_account(
        &self,
        account: &mut Account,
        columns: &[AccountColumn],
    ) -> Result<()> {
        account.updated_at = Utc::now();
        let columns = with_updated_at(columns, AccountColumn::UpdatedAt);

        let account: &Account = account;
        self.cache
            .store(account, self.db.update_account_columns(account, &columns))
            .await
    }

    /// Attach both ends of a follow, leaving `None` for accounts that no
    /// longer exist
    pub async fn populate_follow(&self, follow: &mut Follow) -> Result<()> {
        if follow.account.is_none() {
            follow.account = self.get_account_by_id(&follow.account_id).await.optional()?;
        }

        if follow.target_account.is_none() {
            follow.target_account = self
                .get_account_by_id(&follow.target_account_id)
                .await
                .optional()?;
        }

        Ok(())
    }
}
