//! Admin API endpoints
//!
//! Media maintenance. All routes require an admin user.

use axum::{Router, extract::State, response::Json, routing::post};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::auth::AdminAccount;
use crate::error::AppError;

/// Create admin router
///
/// Routes:
/// - POST /admin/media_cleanup - Prune remote media cache and unused media
/// - POST /admin/media_refetch - Refetch uncached remote emojis
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/media_cleanup", post(media_cleanup))
        .route("/media_refetch", post(media_refetch))
}

/// Media cleanup request
#[derive(Debug, Default, Deserialize)]
pub struct MediaCleanupRequest {
    /// Days of remote media to keep; the configured value when absent
    pub remote_cache_days: Option<i64>,
}

/// Media refetch request
#[derive(Debug, Default, Deserialize)]
pub struct MediaRefetchRequest {
    /// Only this domain; every remote domain when absent or empty
    #[serde(default)]
    pub domain: Option<String>,
}

/// Response for started background jobs
#[derive(Debug, Serialize)]
pub struct JobStartedResponse {
    pub message: String,
}

/// POST /admin/media_cleanup
async fn media_cleanup(
    State(state): State<AppState>,
    AdminAccount(admin): AdminAccount,
    Json(request): Json<MediaCleanupRequest>,
) -> Result<Json<JobStartedResponse>, AppError> {
    let days = request
        .remote_cache_days
        .unwrap_or_else(|| i64::from(state.config.media.remote_cache_days));

    tracing::info!(admin = %admin.account.username, days, "media cleanup requested");
    state.admin_processor.media_prune(days)?;

    Ok(Json(JobStartedResponse {
        message: "cleanup started".to_string(),
    }))
}

/// POST /admin/media_refetch
async fn media_refetch(
    State(state): State<AppState>,
    AdminAccount(admin): AdminAccount,
    Json(request): Json<MediaRefetchRequest>,
) -> Result<Json<JobStartedResponse>, AppError> {
    let domain = request.domain.unwrap_or_default();

    tracing::info!(admin = %admin.account.username, %domain, "media refetch requested");
    state.admin_processor.media_refetch(&domain)?;

    Ok(Json(JobStartedResponse {
        message: "refetch started".to_string(),
    }))
}
