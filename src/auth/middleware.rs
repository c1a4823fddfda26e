//! Bearer token extractors
//!
//! Resolves `Authorization: Bearer <access>` through the token, user and
//! account tables.

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, request::Parts},
};

use crate::AppState;
use crate::data::{Account, User};
use crate::error::{AppError, NotFoundExt};

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(ToOwned::to_owned)
}

async fn authenticate_token(token: &str, state: &AppState) -> Result<CurrentAccount, AppError> {
    let token = state
        .db
        .get_token_by_access(token)
        .await
        .optional()?
        .ok_or(AppError::Unauthorized)?;

    let user = state
        .db
        .get_user_by_id(&token.user_id)
        .await
        .optional()?
        .ok_or(AppError::Unauthorized)?;

    let account = state
        .accounts
        .get_account_by_id(&user.account_id)
        .await
        .optional()?
        .ok_or(AppError::Unauthorized)?;

    if account.is_suspended() {
        return Err(AppError::Forbidden);
    }

    Ok(CurrentAccount { account, user })
}

/// Extractor for the local account behind a bearer token
///
/// # Usage
/// ```ignore
/// async fn handler(current: CurrentAccount) -> impl IntoResponse {
///     format!("Hello, {}", current.account.username)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct CurrentAccount {
    pub account: Account,
    pub user: User,
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(current) = parts.extensions.get::<CurrentAccount>().cloned() {
            return Ok(current);
        }

        let state = AppState::from_ref(state);
        let token = extract_token_from_headers(&parts.headers).ok_or(AppError::Unauthorized)?;
        let current = authenticate_token(&token, &state).await?;
        parts.extensions.insert(current.clone());

        Ok(current)
    }
}

/// Like `CurrentAccount`, but the user must be an admin
#[derive(Debug, Clone)]
pub struct AdminAccount(pub CurrentAccount);

#[async_trait]
impl<S> FromRequestParts<S> for AdminAccount
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let current = CurrentAccount::from_request_parts(parts, state).await?;

        if !current.user.admin {
            return Err(AppError::Forbidden);
        }

        Ok(AdminAccount(current))
    }
}
