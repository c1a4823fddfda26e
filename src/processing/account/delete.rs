//! Account deletion cascade

use crate::data::{Account, Follow, UserColumn};
use crate::error::{AppError, NotFoundExt, Result};
use crate::workers::ClientApiMessage;

use super::stubbify::{stubbify_account, stubbify_user};
use super::AccountProcessor;

/// Statuses fetched per page while scanning an account's statuses
const DELETE_SELECT_LIMIT: usize = 50;

/// What to do about a follow the deleted account had created
///
/// Decided once per deletion from the deleted account's locality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UnfollowPolicy {
    /// Remote accounts are undone by their own server
    Noop,
    /// Local accounts tell remote targets they are no longer followed
    FederateRemote,
}

impl UnfollowPolicy {
    fn for_account(account: &Account) -> Self {
        if account.is_local() {
            Self::FederateRemote
        } else {
            Self::Noop
        }
    }

    fn side_effect(&self, deleted: &Account, follow: Follow) -> Option<ClientApiMessage> {
        match self {
            Self::Noop => None,
            Self::FederateRemote => {
                let Some(target) = follow.target_account.clone() else {
                    tracing::warn!(
                        follow_id = %follow.id,
                        target_account_id = %follow.target_account_id,
                        "follow has no target account, skipping undo"
                    );
                    return None;
                };

                if target.is_local() {
                    return None;
                }

                Some(ClientApiMessage::undo_follow(follow, deleted.clone(), target))
            }
        }
    }
}

fn step_error(step: &'static str, error: AppError) -> AppError {
    AppError::Internal(anyhow::Error::new(error).context(format!("account delete: {step}")))
}

impl AccountProcessor {
    /// Delete an account and everything hanging off it
    ///
    /// Steps run in order and stop at the first failure; completed steps
    /// are not rolled back. Every step treats "nothing there" as done, so
    /// running the whole thing again after a failure is safe. The account
    /// row itself is kept as a suspended stub.
    ///
    /// Concurrent deletes of the same account are not serialized here.
    ///
    /// # Arguments
    /// * `account` - Account to delete, local or remote
    /// * `origin` - ID of the account (possibly itself) or domain block
    ///   that caused the deletion
    pub async fn delete(&self, account: Account, origin: &str) -> Result<()> {
        use crate::metrics::ACCOUNTS_DELETED_TOTAL;

        let locality = if account.is_local() { "local" } else { "remote" };
        let result = self.run_delete(account, origin).await;

        let status = if result.is_ok() { "ok" } else { "error" };
        ACCOUNTS_DELETED_TOTAL
            .with_label_values(&[locality, status])
            .inc();

        result
    }

    async fn run_delete(&self, mut account: Account, origin: &str) -> Result<()> {
        tracing::trace!(
            username = %account.username,
            domain = %account.domain,
            "beginning account delete"
        );

        if account.is_local() {
            self.delete_user_and_tokens(&account)
                .await
                .map_err(|e| step_error("deleting user and tokens", e))?;
        }

        self.delete_follows(&account)
            .await
            .map_err(|e| step_error("deleting follows", e))?;

        self.db
            .delete_account_blocks(&account.id)
            .await
            .map_err(|e| step_error("deleting blocks", e))?;

        self.delete_statuses(&account)
            .await
            .map_err(|e| step_error("deleting statuses", e))?;

        self.delete_notifications(&account)
            .await
            .map_err(|e| step_error("deleting notifications", e))?;

        self.delete_peripheral(&account)
            .await
            .map_err(|e| step_error("deleting bookmarks and faves", e))?;

        let columns = stubbify_account(&mut account, origin);
        self.accounts
            .update_account(&mut account, &columns)
            .await
            .map_err(|e| step_error("stubbifying account", e))?;

        tracing::info!(
            username = %account.username,
            domain = %account.domain,
            "account deleted"
        );
        Ok(())
    }

    /// Delete OAuth tokens (with their clients and applications), then
    /// stub the user
    async fn delete_user_and_tokens(&self, account: &Account) -> Result<()> {
        let Some(user) = self.db.get_user_by_account_id(&account.id).await.optional()? else {
            tracing::warn!(account_id = %account.id, "local account has no user");
            return Ok(());
        };

        for token in self.db.get_tokens_by_user_id(&user.id).await? {
            self.db.delete_client_by_id(&token.client_id).await?;
            self.db
                .delete_applications_by_client_id(&token.client_id)
                .await?;
            self.db.delete_token_by_id(&token.id).await?;
        }

        let (mut user, columns) = tokio::task::spawn_blocking(move || {
            let mut user = user;
            let columns: Vec<UserColumn> = stubbify_user(&mut user)?;
            Ok::<_, AppError>((user, columns))
        })
        .await
        .map_err(|e| AppError::Internal(e.into()))??;

        self.db.update_user_columns(&mut user, &columns).await
    }

    /// Delete follows and follow requests in both directions
    ///
    /// Undo events for follows the account had created go out in one batch
    /// once all edges are gone.
    async fn delete_follows(&self, account: &Account) -> Result<()> {
        for follow in self.db.get_account_followers(&account.id).await? {
            self.db.delete_follow_by_id(&follow.id).await?;
        }

        for request in self.db.get_account_follow_requests(&account.id).await? {
            self.db.delete_follow_request_by_id(&request.id).await?;
        }

        let policy = UnfollowPolicy::for_account(account);
        let mut messages = Vec::new();

        for mut follow in self.db.get_account_follows(&account.id).await? {
            self.db.delete_follow_by_id(&follow.id).await?;

            if policy == UnfollowPolicy::FederateRemote {
                self.accounts.populate_follow(&mut follow).await?;
            }
            messages.extend(policy.side_effect(account, follow));
        }

        for request in self.db.get_account_follow_requesting(&account.id).await? {
            self.db.delete_follow_request_by_id(&request.id).await?;

            let mut follow = request.as_follow();
            if policy == UnfollowPolicy::FederateRemote {
                self.accounts.populate_follow(&mut follow).await?;
            }
            messages.extend(policy.side_effect(account, follow));
        }

        self.workers.enqueue_client_api(messages);
        Ok(())
    }

    /// Queue deletion of every status the account wrote, plus an undo for
    /// every reblog of them
    ///
    /// # Returns
    /// Number of non-empty pages scanned
    async fn delete_statuses(&self, account: &Account) -> Result<usize> {
        let mut messages = Vec::new();
        let mut max_id: Option<String> = None;
        let mut pages = 0;

        loop {
            let statuses = self
                .db
                .get_account_statuses(&account.id, DELETE_SELECT_LIMIT, max_id.as_deref())
                .await?;

            let Some(last) = statuses.last() else {
                break;
            };
            max_id = Some(last.id.clone());
            pages += 1;

            for mut status in statuses {
                status.account = Some(account.clone());

                let reblogs = self.db.get_status_reblogs(&status.id).await?;
                messages.push(ClientApiMessage::delete_note(status, account.clone()));

                for mut boost in reblogs {
                    let booster = match boost.account.take() {
                        Some(booster) => booster,
                        None => match self
                            .accounts
                            .get_account_by_id(&boost.account_id)
                            .await
                            .optional()?
                        {
                            Some(booster) => booster,
                            None => {
                                tracing::warn!(
                                    boost_id = %boost.id,
                                    account_id = %boost.account_id,
                                    "no account found for boost, skipping"
                                );
                                continue;
                            }
                        },
                    };
                    boost.account = Some(booster.clone());
                    messages.push(ClientApiMessage::undo_announce(
                        boost,
                        booster,
                        account.clone(),
                    ));
                }
            }
        }

        self.workers.enqueue_client_api(messages);
        Ok(pages)
    }

    async fn delete_notifications(&self, account: &Account) -> Result<()> {
        self.db.delete_notifications_targeting(&account.id).await?;
        self.db.delete_notifications_originating(&account.id).await?;
        Ok(())
    }

    async fn delete_peripheral(&self, account: &Account) -> Result<()> {
        self.db.delete_status_bookmarks_by_account(&account.id).await?;
        self.db
            .delete_status_bookmarks_by_target_account(&account.id)
            .await?;
        self.db.delete_status_faves_by_account(&account.id).await?;
        self.db
            .delete_status_faves_by_target_account(&account.id)
            .await?;
        Ok(())
    }
}
