//! Account endpoints

use axum::{Router, extract::State, http::StatusCode, routing::post};

use crate::AppState;
use crate::auth::CurrentAccount;
use crate::error::AppError;

/// Create account router
///
/// Routes:
/// - POST /api/v1/accounts/delete - Delete the caller's own account
pub fn accounts_router() -> Router<AppState> {
    Router::new().route("/v1/accounts/delete", post(delete_self))
}

/// POST /api/v1/accounts/delete
///
/// Queues deletion of the authenticated account and answers 202 right
/// away; the cascade runs on the client API worker.
async fn delete_self(
    State(state): State<AppState>,
    current: CurrentAccount,
) -> Result<StatusCode, AppError> {
    state.account_processor.delete_self(&current.account).await?;
    Ok(StatusCode::ACCEPTED)
}
