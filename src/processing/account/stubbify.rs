//! Account and user stubs
//!
//! A deleted account keeps its row, id, URI, username and domain so nobody
//! can register the same handle again, but everything else is cleared.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use chrono::Utc;
use sqlx::types::Json;

use crate::data::{Account, AccountColumn, User, UserColumn};
use crate::error::{AppError, Result};

/// Clear an account down to a suspended stub
///
/// # Arguments
/// * `origin` - ID of the account or domain block that caused the deletion
///
/// # Returns
/// The columns that changed
pub fn stubbify_account(account: &mut Account, origin: &str) -> Vec<AccountColumn> {
    account.fetched_at = None;
    account.avatar_media_attachment_id = None;
    account.avatar_remote_url = None;
    account.header_media_attachment_id = None;
    account.header_remote_url = None;
    account.display_name = None;
    account.emojis = Json(Vec::new());
    account.fields = Json(Vec::new());
    account.note = None;
    account.note_raw = None;
    account.memorial = false;
    account.also_known_as = None;
    account.moved_to_account_id = None;
    account.reason = None;
    account.discoverable = false;
    account.status_content_type = None;
    account.custom_css = None;
    account.suspended_at = Some(Utc::now());
    account.suspension_origin = Some(origin.to_string());
    account.hide_collections = true;
    account.enable_rss = false;

    vec![
        AccountColumn::FetchedAt,
        AccountColumn::AvatarMediaAttachmentId,
        AccountColumn::AvatarRemoteUrl,
        AccountColumn::HeaderMediaAttachmentId,
        AccountColumn::HeaderRemoteUrl,
        AccountColumn::DisplayName,
        AccountColumn::Emojis,
        AccountColumn::Fields,
        AccountColumn::Note,
        AccountColumn::NoteRaw,
        AccountColumn::Memorial,
        AccountColumn::AlsoKnownAs,
        AccountColumn::MovedToAccountId,
        AccountColumn::Reason,
        AccountColumn::Discoverable,
        AccountColumn::StatusContentType,
        AccountColumn::CustomCss,
        AccountColumn::SuspendedAt,
        AccountColumn::SuspensionOrigin,
        AccountColumn::HideCollections,
        AccountColumn::EnableRss,
    ]
}

/// Strip a user of sign-in history and credentials
///
/// The email is kept so it cannot be used for a new sign-up. The password
/// hash is replaced by the hash of a random value nobody knows, so
/// restoring the user would require a password reset. CPU heavy: call
/// from a blocking task.
///
/// # Errors
/// Returns error if random generation or hashing fails
pub fn stubbify_user(user: &mut User) -> Result<Vec<UserColumn>> {
    let mut secret = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("random generation failed: {e}")))?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(&secret, &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("password hashing failed: {e}")))?;

    user.encrypted_password = hash.to_string();
    user.sign_up_ip = None;
    user.current_sign_in_at = None;
    user.current_sign_in_ip = None;
    user.last_sign_in_at = None;
    user.last_sign_in_ip = None;
    user.sign_in_count = 1;
    user.locale = None;
    user.created_by_application_id = None;
    user.last_emailed_at = None;
    user.confirmation_token = None;
    user.confirmation_sent_at = None;
    user.reset_password_token = None;
    user.reset_password_sent_at = None;

    Ok(vec![
        UserColumn::EncryptedPassword,
        UserColumn::SignUpIp,
        UserColumn::CurrentSignInAt,
        UserColumn::CurrentSignInIp,
        UserColumn::LastSignInAt,
        UserColumn::LastSignInIp,
        UserColumn::SignInCount,
        UserColumn::Locale,
        UserColumn::CreatedByApplicationId,
        UserColumn::LastEmailedAt,
        UserColumn::ConfirmationToken,
        UserColumn::ConfirmationSentAt,
        UserColumn::ResetPasswordToken,
        UserColumn::ResetPasswordSentAt,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{local_account, user_for};
    use argon2::{PasswordHash, PasswordVerifier};

    fn hash(password: &str) -> String {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    fn verifies(password: &str, hash: &str) -> bool {
        let parsed = PasswordHash::new(hash).unwrap();
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    #[test]
    fn stubbify_account_clears_profile_and_suspends() {
        let mut account = local_account("alice");
        let username = account.username.clone();
        let uri = account.uri.clone();

        let columns = stubbify_account(&mut account, "origin-id");

        assert_eq!(account.username, username);
        assert_eq!(account.uri, uri);
        assert_eq!(account.display_name, None);
        assert_eq!(account.note, None);
        assert!(account.fields.0.is_empty());
        assert!(!account.discoverable);
        assert!(account.hide_collections);
        assert!(!account.enable_rss);
        assert!(account.is_suspended());
        assert_eq!(account.suspension_origin.as_deref(), Some("origin-id"));

        assert_eq!(columns.len(), 21);
        assert!(columns.contains(&AccountColumn::SuspendedAt));
        assert!(!columns.contains(&AccountColumn::UpdatedAt));
    }

    #[test]
    fn stubbify_user_replaces_password_and_keeps_email() {
        let account = local_account("alice");
        let mut user = user_for(&account);
        user.encrypted_password = hash("hunter2");
        let old_hash = user.encrypted_password.clone();
        let email = user.email.clone();

        let columns = stubbify_user(&mut user).unwrap();

        assert_ne!(user.encrypted_password, old_hash);
        assert!(user.encrypted_password.starts_with("$argon2"));
        assert!(!verifies("hunter2", &user.encrypted_password));
        assert!(!verifies("", &user.encrypted_password));

        assert_eq!(user.email, email);
        assert_eq!(user.sign_in_count, 1);
        assert_eq!(user.sign_up_ip, None);
        assert_eq!(user.last_sign_in_ip, None);
        assert_eq!(user.reset_password_token, None);

        assert_eq!(columns.len(), 14);
        assert!(columns.contains(&UserColumn::EncryptedPassword));
    }
}
