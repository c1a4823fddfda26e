//! SQLite database operations
//!
//! All database access goes through this module.
//! Point lookups return `AppError::NotFound` when no row matches;
//! list queries return an empty `Vec` and deletes return the number of
//! rows removed, so "nothing there" is never an error for them.

use chrono::{DateTime, Utc};
use sqlx::{Pool, QueryBuilder, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

/// Column list with `updated_at` forced in.
pub(crate) fn with_updated_at<C: Copy + PartialEq>(columns: &[C], updated_at: C) -> Vec<C> {
    let mut columns = columns.to_vec();
    if !columns.contains(&updated_at) {
        columns.push(updated_at);
    }
    columns
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!("Database connected and migrated successfully");

        Ok(Self { pool })
    }

    #[cfg(test)]
    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub async fn get_account_by_id(&self, id: &str) -> Result<Account, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(account)
    }

    pub async fn get_account_by_uri(&self, uri: &str) -> Result<Account, AppError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE uri = ?")
            .bind(uri)
            .fetch_one(&self.pool)
            .await?;
        Ok(account)
    }

    /// Get account by username and domain (empty domain for local accounts)
    pub async fn get_account_by_username_domain(
        &self,
        username: &str,
        domain: &str,
    ) -> Result<Account, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM accounts WHERE username = ? AND domain = ?",
        )
        .bind(username)
        .bind(domain)
        .fetch_one(&self.pool)
        .await?;
        Ok(account)
    }

    pub async fn insert_account(&self, account: &Account) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO accounts (
                id, username, domain, uri, inbox_uri, display_name, note, note_raw,
                avatar_media_attachment_id, avatar_remote_url,
                header_media_attachment_id, header_remote_url,
                emojis, fields, memorial, also_known_as, moved_to_account_id, reason,
                discoverable, status_content_type, custom_css, hide_collections, enable_rss,
                fetched_at, suspended_at, suspension_origin, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.username)
        .bind(&account.domain)
        .bind(&account.uri)
        .bind(&account.inbox_uri)
        .bind(&account.display_name)
        .bind(&account.note)
        .bind(&account.note_raw)
        .bind(&account.avatar_media_attachment_id)
        .bind(&account.avatar_remote_url)
        .bind(&account.header_media_attachment_id)
        .bind(&account.header_remote_url)
        .bind(&account.emojis)
        .bind(&account.fields)
        .bind(account.memorial)
        .bind(&account.also_known_as)
        .bind(&account.moved_to_account_id)
        .bind(&account.reason)
        .bind(account.discoverable)
        .bind(&account.status_content_type)
        .bind(&account.custom_css)
        .bind(account.hide_collections)
        .bind(account.enable_rss)
        .bind(account.fetched_at)
        .bind(account.suspended_at)
        .bind(&account.suspension_origin)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist only the given account columns
    pub async fn update_account_columns(
        &self,
        account: &Account,
        columns: &[AccountColumn],
    ) -> Result<(), AppError> {
        if columns.is_empty() {
            return Ok(());
        }

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE accounts SET ");
        {
            let mut set = query.separated(", ");
            for column in columns {
                set.push(format!("{} = ", column.as_str()));
                match column {
                    AccountColumn::InboxUri => set.push_bind_unseparated(account.inbox_uri.clone()),
                    AccountColumn::DisplayName => {
                        set.push_bind_unseparated(account.display_name.clone())
                    }
                    AccountColumn::Note => set.push_bind_unseparated(account.note.clone()),
                    AccountColumn::NoteRaw => set.push_bind_unseparated(account.note_raw.clone()),
                    AccountColumn::AvatarMediaAttachmentId => {
                        set.push_bind_unseparated(account.avatar_media_attachment_id.clone())
                    }
                    AccountColumn::AvatarRemoteUrl => {
                        set.push_bind_unseparated(account.avatar_remote_url.clone())
                    }
                    AccountColumn::HeaderMediaAttachmentId => {
                        set.push_bind_unseparated(account.header_media_attachment_id.clone())
                    }
                    AccountColumn::HeaderRemoteUrl => {
                        set.push_bind_unseparated(account.header_remote_url.clone())
                    }
                    AccountColumn::Emojis => set.push_bind_unseparated(account.emojis.clone()),
                    AccountColumn::Fields => set.push_bind_unseparated(account.fields.clone()),
                    AccountColumn::Memorial => set.push_bind_unseparated(account.memorial),
                    AccountColumn::AlsoKnownAs => {
                        set.push_bind_unseparated(account.also_known_as.clone())
                    }
                    AccountColumn::MovedToAccountId => {
                        set.push_bind_unseparated(account.moved_to_account_id.clone())
                    }
                    AccountColumn::Reason => set.push_bind_unseparated(account.reason.clone()),
                    AccountColumn::Discoverable => set.push_bind_unseparated(account.discoverable),
                    AccountColumn::StatusContentType => {
                        set.push_bind_unseparated(account.status_content_type.clone())
                    }
                    AccountColumn::CustomCss => {
                        set.push_bind_unseparated(account.custom_css.clone())
                    }
                    AccountColumn::HideCollections => {
                        set.push_bind_unseparated(account.hide_collections)
                    }
                    AccountColumn::EnableRss => set.push_bind_unseparated(account.enable_rss),
                    AccountColumn::FetchedAt => set.push_bind_unseparated(account.fetched_at),
                    AccountColumn::SuspendedAt => set.push_bind_unseparated(account.suspended_at),
                    AccountColumn::SuspensionOrigin => {
                        set.push_bind_unseparated(account.suspension_origin.clone())
                    }
                    AccountColumn::UpdatedAt => set.push_bind_unseparated(account.updated_at),
                };
            }
        }
        query.push(" WHERE id = ");
        query.push_bind(account.id.clone());

        query.build().execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // Users
    // =========================================================================

    pub async fn get_user_by_account_id(&self, account_id: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn get_user_by_id(&self, id: &str) -> Result<User, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, account_id, email, admin, encrypted_password, sign_up_ip,
                current_sign_in_at, current_sign_in_ip, last_sign_in_at, last_sign_in_ip,
                sign_in_count, locale, created_by_application_id, last_emailed_at,
                confirmation_token, confirmation_sent_at, reset_password_token,
                reset_password_sent_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&user.id)
        .bind(&user.account_id)
        .bind(&user.email)
        .bind(user.admin)
        .bind(&user.encrypted_password)
        .bind(&user.sign_up_ip)
        .bind(user.current_sign_in_at)
        .bind(&user.current_sign_in_ip)
        .bind(user.last_sign_in_at)
        .bind(&user.last_sign_in_ip)
        .bind(user.sign_in_count)
        .bind(&user.locale)
        .bind(&user.created_by_application_id)
        .bind(user.last_emailed_at)
        .bind(&user.confirmation_token)
        .bind(user.confirmation_sent_at)
        .bind(&user.reset_password_token)
        .bind(user.reset_password_sent_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Persist the given user columns, stamping `updated_at`
    pub async fn update_user_columns(
        &self,
        user: &mut User,
        columns: &[UserColumn],
    ) -> Result<(), AppError> {
        user.updated_at = Utc::now();
        let columns = with_updated_at(columns, UserColumn::UpdatedAt);

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = query.separated(", ");
            for column in &columns {
                set.push(format!("{} = ", column.as_str()));
                match column {
                    UserColumn::EncryptedPassword => {
                        set.push_bind_unseparated(user.encrypted_password.clone())
                    }
                    UserColumn::SignUpIp => set.push_bind_unseparated(user.sign_up_ip.clone()),
                    UserColumn::CurrentSignInAt => {
                        set.push_bind_unseparated(user.current_sign_in_at)
                    }
                    UserColumn::CurrentSignInIp => {
                        set.push_bind_unseparated(user.current_sign_in_ip.clone())
                    }
                    UserColumn::LastSignInAt => set.push_bind_unseparated(user.last_sign_in_at),
                    UserColumn::LastSignInIp => {
                        set.push_bind_unseparated(user.last_sign_in_ip.clone())
                    }
                    UserColumn::SignInCount => set.push_bind_unseparated(user.sign_in_count),
                    UserColumn::Locale => set.push_bind_unseparated(user.locale.clone()),
                    UserColumn::CreatedByApplicationId => {
                        set.push_bind_unseparated(user.created_by_application_id.clone())
                    }
                    UserColumn::LastEmailedAt => set.push_bind_unseparated(user.last_emailed_at),
                    UserColumn::ConfirmationToken => {
                        set.push_bind_unseparated(user.confirmation_token.clone())
                    }
                    UserColumn::ConfirmationSentAt => {
                        set.push_bind_unseparated(user.confirmation_sent_at)
                    }
                    UserColumn::ResetPasswordToken => {
                        set.push_bind_unseparated(user.reset_password_token.clone())
                    }
                    UserColumn::ResetPasswordSentAt => {
                        set.push_bind_unseparated(user.reset_password_sent_at)
                    }
                    UserColumn::UpdatedAt => set.push_bind_unseparated(user.updated_at),
                };
            }
        }
        query.push(" WHERE id = ");
        query.push_bind(user.id.clone());

        query.build().execute(&self.pool).await?;
        Ok(())
    }

    // =========================================================================
    // OAuth
    // =========================================================================

    pub async fn insert_application(&self, app: &Application) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO applications (id, name, client_id, client_secret, redirect_uri, scopes, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&app.id)
        .bind(&app.name)
        .bind(&app.client_id)
        .bind(&app.client_secret)
        .bind(&app.redirect_uri)
        .bind(&app.scopes)
        .bind(app.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_applications_by_client_id(
        &self,
        client_id: &str,
    ) -> Result<Vec<Application>, AppError> {
        let apps =
            sqlx::query_as::<_, Application>("SELECT * FROM applications WHERE client_id = ?")
                .bind(client_id)
                .fetch_all(&self.pool)
                .await?;
        Ok(apps)
    }

    pub async fn delete_applications_by_client_id(&self, client_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM applications WHERE client_id = ?")
            .bind(client_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_client(&self, client: &Client) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO clients (id, secret, domain, user_id, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&client.id)
        .bind(&client.secret)
        .bind(&client.domain)
        .bind(&client.user_id)
        .bind(client.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_client_by_id(&self, id: &str) -> Result<Client, AppError> {
        let client = sqlx::query_as::<_, Client>("SELECT * FROM clients WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(client)
    }

    pub async fn delete_client_by_id(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_token(&self, token: &Token) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO tokens (id, client_id, user_id, access, scope, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&token.id)
        .bind(&token.client_id)
        .bind(&token.user_id)
        .bind(&token.access)
        .bind(&token.scope)
        .bind(token.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_token_by_access(&self, access: &str) -> Result<Token, AppError> {
        let token = sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE access = ?")
            .bind(access)
            .fetch_one(&self.pool)
            .await?;
        Ok(token)
    }

    pub async fn get_tokens_by_user_id(&self, user_id: &str) -> Result<Vec<Token>, AppError> {
        let tokens = sqlx::query_as::<_, Token>("SELECT * FROM tokens WHERE user_id = ?")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(tokens)
    }

    pub async fn delete_token_by_id(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM tokens WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Follows and follow requests
    // =========================================================================

    pub async fn insert_follow(&self, follow: &Follow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO follows (id, uri, account_id, target_account_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&follow.id)
        .bind(&follow.uri)
        .bind(&follow.account_id)
        .bind(&follow.target_account_id)
        .bind(follow.created_at)
        .bind(follow.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Follows targeting the account
    pub async fn get_account_followers(&self, account_id: &str) -> Result<Vec<Follow>, AppError> {
        let follows = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE target_account_id = ? ORDER BY id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    /// Follows created by the account
    pub async fn get_account_follows(&self, account_id: &str) -> Result<Vec<Follow>, AppError> {
        let follows = sqlx::query_as::<_, Follow>(
            "SELECT * FROM follows WHERE account_id = ? ORDER BY id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(follows)
    }

    pub async fn delete_follow_by_id(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM follows WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_follow_request(&self, request: &FollowRequest) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO follow_requests (id, uri, account_id, target_account_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request.id)
        .bind(&request.uri)
        .bind(&request.account_id)
        .bind(&request.target_account_id)
        .bind(request.created_at)
        .bind(request.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Follow requests targeting the account
    pub async fn get_account_follow_requests(
        &self,
        account_id: &str,
    ) -> Result<Vec<FollowRequest>, AppError> {
        let requests = sqlx::query_as::<_, FollowRequest>(
            "SELECT * FROM follow_requests WHERE target_account_id = ? ORDER BY id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    /// Follow requests created by the account
    pub async fn get_account_follow_requesting(
        &self,
        account_id: &str,
    ) -> Result<Vec<FollowRequest>, AppError> {
        let requests = sqlx::query_as::<_, FollowRequest>(
            "SELECT * FROM follow_requests WHERE account_id = ? ORDER BY id DESC",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    pub async fn delete_follow_request_by_id(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM follow_requests WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Blocks
    // =========================================================================

    pub async fn insert_block(&self, block: &Block) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO blocks (id, uri, account_id, target_account_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&block.id)
        .bind(&block.uri)
        .bind(&block.account_id)
        .bind(&block.target_account_id)
        .bind(block.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count blocks involving the account in either direction
    pub async fn count_account_blocks(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM blocks WHERE account_id = ? OR target_account_id = ?",
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Delete blocks created by or targeting the account
    pub async fn delete_account_blocks(&self, account_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM blocks WHERE account_id = ? OR target_account_id = ?")
            .bind(account_id)
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Statuses
    // =========================================================================

    pub async fn insert_status(&self, status: &Status) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO statuses (
                id, uri, account_id, content, visibility, local, in_reply_to_id,
                boost_of_id, boost_of_account_id, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&status.id)
        .bind(&status.uri)
        .bind(&status.account_id)
        .bind(&status.content)
        .bind(&status.visibility)
        .bind(status.local)
        .bind(&status.in_reply_to_id)
        .bind(&status.boost_of_id)
        .bind(&status.boost_of_account_id)
        .bind(status.created_at)
        .bind(status.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_status_by_id(&self, id: &str) -> Result<Status, AppError> {
        let status = sqlx::query_as::<_, Status>("SELECT * FROM statuses WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(status)
    }

    /// Page of statuses authored by the account, newest first
    ///
    /// # Arguments
    /// * `limit` - Maximum rows (0 for no limit)
    /// * `max_id` - Only return statuses with a smaller ID
    pub async fn get_account_statuses(
        &self,
        account_id: &str,
        limit: usize,
        max_id: Option<&str>,
    ) -> Result<Vec<Status>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT * FROM statuses WHERE account_id = ");
        query.push_bind(account_id);

        if let Some(max_id) = max_id {
            query.push(" AND id < ");
            query.push_bind(max_id);
        }

        query.push(" ORDER BY id DESC");

        if limit > 0 {
            query.push(" LIMIT ");
            query.push_bind(limit as i64);
        }

        let statuses = query
            .build_query_as::<Status>()
            .fetch_all(&self.pool)
            .await?;
        Ok(statuses)
    }

    pub async fn count_account_statuses(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM statuses WHERE account_id = ?")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Reblogs of the given status
    pub async fn get_status_reblogs(&self, status_id: &str) -> Result<Vec<Status>, AppError> {
        let reblogs = sqlx::query_as::<_, Status>(
            "SELECT * FROM statuses WHERE boost_of_id = ? ORDER BY id DESC",
        )
        .bind(status_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(reblogs)
    }

    pub async fn delete_status_by_id(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM statuses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    pub async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO notifications (
                id, notification_type, origin_account_id, target_account_id, status_id, read, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&notification.id)
        .bind(&notification.notification_type)
        .bind(&notification.origin_account_id)
        .bind(&notification.target_account_id)
        .bind(&notification.status_id)
        .bind(notification.read)
        .bind(notification.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count notifications where the account is origin or target
    pub async fn count_account_notifications(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE origin_account_id = ? OR target_account_id = ?",
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    /// Delete notifications of all types targeting the account
    pub async fn delete_notifications_targeting(&self, account_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE target_account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete notifications of all types originating from the account
    pub async fn delete_notifications_originating(
        &self,
        account_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE origin_account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Bookmarks and faves
    // =========================================================================

    pub async fn insert_status_bookmark(&self, bookmark: &StatusBookmark) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO status_bookmarks (id, account_id, target_account_id, status_id, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&bookmark.id)
        .bind(&bookmark.account_id)
        .bind(&bookmark.target_account_id)
        .bind(&bookmark.status_id)
        .bind(bookmark.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count bookmarks owned by or targeting the account
    pub async fn count_account_bookmarks(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM status_bookmarks WHERE account_id = ? OR target_account_id = ?",
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn delete_status_bookmarks_by_account(
        &self,
        account_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM status_bookmarks WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_status_bookmarks_by_target_account(
        &self,
        target_account_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM status_bookmarks WHERE target_account_id = ?")
            .bind(target_account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn insert_status_fave(&self, fave: &StatusFave) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO status_faves (id, uri, account_id, target_account_id, status_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&fave.id)
        .bind(&fave.uri)
        .bind(&fave.account_id)
        .bind(&fave.target_account_id)
        .bind(&fave.status_id)
        .bind(fave.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Count faves owned by or targeting the account
    pub async fn count_account_faves(&self, account_id: &str) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM status_faves WHERE account_id = ? OR target_account_id = ?",
        )
        .bind(account_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    pub async fn delete_status_faves_by_account(&self, account_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM status_faves WHERE account_id = ?")
            .bind(account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn delete_status_faves_by_target_account(
        &self,
        target_account_id: &str,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM status_faves WHERE target_account_id = ?")
            .bind(target_account_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    // =========================================================================
    // Media attachments
    // =========================================================================

    pub async fn insert_media_attachment(&self, media: &MediaAttachment) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO media_attachments (
                id, status_id, account_id, url, remote_url, file_path, thumbnail_path,
                content_type, file_size, description, blurhash, avatar, header, cached,
                created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&media.id)
        .bind(&media.status_id)
        .bind(&media.account_id)
        .bind(&media.url)
        .bind(&media.remote_url)
        .bind(&media.file_path)
        .bind(&media.thumbnail_path)
        .bind(&media.content_type)
        .bind(media.file_size)
        .bind(&media.description)
        .bind(&media.blurhash)
        .bind(media.avatar)
        .bind(media.header)
        .bind(media.cached)
        .bind(media.created_at)
        .bind(media.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_media_attachment_by_id(&self, id: &str) -> Result<MediaAttachment, AppError> {
        let media =
            sqlx::query_as::<_, MediaAttachment>("SELECT * FROM media_attachments WHERE id = ?")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;
        Ok(media)
    }

    /// Persist the given media columns (all columns when the list is empty)
    pub async fn update_media_attachment_columns(
        &self,
        media: &MediaAttachment,
        columns: &[MediaColumn],
    ) -> Result<(), AppError> {
        let columns = if columns.is_empty() {
            &MediaColumn::ALL[..]
        } else {
            columns
        };

        let mut query = QueryBuilder::<Sqlite>::new("UPDATE media_attachments SET ");
        {
            let mut set = query.separated(", ");
            for column in columns {
                set.push(format!("{} = ", column.as_str()));
                match column {
                    MediaColumn::StatusId => set.push_bind_unseparated(media.status_id.clone()),
                    MediaColumn::Url => set.push_bind_unseparated(media.url.clone()),
                    MediaColumn::RemoteUrl => set.push_bind_unseparated(media.remote_url.clone()),
                    MediaColumn::FilePath => set.push_bind_unseparated(media.file_path.clone()),
                    MediaColumn::ThumbnailPath => {
                        set.push_bind_unseparated(media.thumbnail_path.clone())
                    }
                    MediaColumn::ContentType => {
                        set.push_bind_unseparated(media.content_type.clone())
                    }
                    MediaColumn::FileSize => set.push_bind_unseparated(media.file_size),
                    MediaColumn::Description => {
                        set.push_bind_unseparated(media.description.clone())
                    }
                    MediaColumn::Blurhash => set.push_bind_unseparated(media.blurhash.clone()),
                    MediaColumn::Avatar => set.push_bind_unseparated(media.avatar),
                    MediaColumn::Header => set.push_bind_unseparated(media.header),
                    MediaColumn::Cached => set.push_bind_unseparated(media.cached),
                    MediaColumn::UpdatedAt => set.push_bind_unseparated(media.updated_at),
                };
            }
        }
        query.push(" WHERE id = ");
        query.push_bind(media.id.clone());

        query.build().execute(&self.pool).await?;
        Ok(())
    }

    pub async fn delete_media_attachment_by_id(&self, id: &str) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM media_attachments WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn get_media_attachment_ids_by_status(
        &self,
        status_id: &str,
    ) -> Result<Vec<String>, AppError> {
        let ids = sqlx::query_scalar::<_, String>(
            "SELECT id FROM media_attachments WHERE status_id = ? ORDER BY id DESC",
        )
        .bind(status_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    /// IDs of cached remote media created before `older_than`
    pub async fn get_remote_media_ids_older_than(
        &self,
        older_than: DateTime<Utc>,
        max_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM media_attachments WHERE ");
        push_remote_older_than(&mut query, older_than);
        push_page(&mut query, max_id, limit);

        let ids = query
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn count_remote_media_older_than(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM media_attachments WHERE ");
        push_remote_older_than(&mut query, older_than);

        let count = query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// IDs of media used as an avatar or header
    pub async fn get_avatar_and_header_media_ids(
        &self,
        max_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT id FROM media_attachments WHERE (avatar = 1 OR header = 1)",
        );
        push_page(&mut query, max_id, limit);

        let ids = query
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    /// IDs of cached local media never attached to a status or profile
    pub async fn get_local_unattached_media_ids_older_than(
        &self,
        older_than: DateTime<Utc>,
        max_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<String>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT id FROM media_attachments WHERE ");
        push_local_unattached_older_than(&mut query, older_than);
        push_page(&mut query, max_id, limit);

        let ids = query
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(ids)
    }

    pub async fn count_local_unattached_media_older_than(
        &self,
        older_than: DateTime<Utc>,
    ) -> Result<i64, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM media_attachments WHERE ");
        push_local_unattached_older_than(&mut query, older_than);

        let count = query
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    // =========================================================================
    // Emojis
    // =========================================================================

    pub async fn insert_emoji(&self, emoji: &Emoji) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO emojis (id, shortcode, domain, image_remote_url, image_path, cached, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&emoji.id)
        .bind(&emoji.shortcode)
        .bind(&emoji.domain)
        .bind(&emoji.image_remote_url)
        .bind(&emoji.image_path)
        .bind(emoji.cached)
        .bind(emoji.created_at)
        .bind(emoji.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn get_emoji_by_id(&self, id: &str) -> Result<Emoji, AppError> {
        let emoji = sqlx::query_as::<_, Emoji>("SELECT * FROM emojis WHERE id = ?")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;
        Ok(emoji)
    }

    /// Remote emojis whose image is not in media storage
    ///
    /// # Arguments
    /// * `domain` - Restrict to one domain, or all remote domains when `None`
    pub async fn get_uncached_remote_emojis(
        &self,
        domain: Option<&str>,
    ) -> Result<Vec<Emoji>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(
            "SELECT * FROM emojis WHERE domain != '' AND cached = 0 AND image_remote_url IS NOT NULL",
        );

        if let Some(domain) = domain {
            query.push(" AND domain = ");
            query.push_bind(domain);
        }

        query.push(" ORDER BY id DESC");

        let emojis = query
            .build_query_as::<Emoji>()
            .fetch_all(&self.pool)
            .await?;
        Ok(emojis)
    }

    pub async fn mark_emoji_cached(&self, id: &str, image_path: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE emojis SET cached = 1, image_path = ?, updated_at = ? WHERE id = ?")
            .bind(image_path)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    // =========================================================================
    // Federation outbox
    // =========================================================================

    pub async fn insert_outbox_activity(&self, activity: &OutboxActivity) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO federation_outbox (id, activity_type, object_type, actor_uri, target_uri, payload, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&activity.id)
        .bind(&activity.activity_type)
        .bind(&activity.object_type)
        .bind(&activity.actor_uri)
        .bind(&activity.target_uri)
        .bind(&activity.payload)
        .bind(activity.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Outbox activities in the order they were written
    pub async fn get_outbox_activities(&self) -> Result<Vec<OutboxActivity>, AppError> {
        let activities = sqlx::query_as::<_, OutboxActivity>(
            "SELECT * FROM federation_outbox ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(activities)
    }
}

fn push_remote_older_than(query: &mut QueryBuilder<'_, Sqlite>, older_than: DateTime<Utc>) {
    query.push("cached = 1 AND created_at < ");
    query.push_bind(older_than);
    query.push(" AND remote_url IS NOT NULL AND remote_url != ''");
}

fn push_local_unattached_older_than(
    query: &mut QueryBuilder<'_, Sqlite>,
    older_than: DateTime<Utc>,
) {
    query.push("cached = 1 AND avatar = 0 AND header = 0 AND created_at < ");
    query.push_bind(older_than);
    query.push(" AND (remote_url IS NULL OR remote_url = '') AND status_id IS NULL");
}

/// Exclusive `max_id` cursor, newest first, `limit == 0` for no limit
fn push_page<'args>(
    query: &mut QueryBuilder<'args, Sqlite>,
    max_id: Option<&'args str>,
    limit: usize,
) {
    if let Some(max_id) = max_id {
        query.push(" AND id < ");
        query.push_bind(max_id);
    }

    query.push(" ORDER BY id DESC");

    if limit > 0 {
        query.push(" LIMIT ");
        query.push_bind(limit as i64);
    }
}
