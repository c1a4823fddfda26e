//! Admin media maintenance
//!
//! Both operations validate, spawn the work and return; the outcome is only
//! logged.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::media::{MediaDereferencer, MediaManager};

/// Admin processor
#[derive(Clone)]
pub struct AdminProcessor {
    media_manager: Arc<dyn MediaManager>,
    dereferencer: Arc<dyn MediaDereferencer>,
}

impl AdminProcessor {
    pub fn new(
        media_manager: Arc<dyn MediaManager>,
        dereferencer: Arc<dyn MediaDereferencer>,
    ) -> Self {
        Self {
            media_manager,
            dereferencer,
        }
    }

    /// Start pruning media older than `days`
    ///
    /// # Errors
    /// `AppError::Validation` when `days` is negative
    pub fn media_prune(&self, days: i64) -> Result<JoinHandle<()>> {
        let days = u32::try_from(days).map_err(|_| {
            AppError::Validation("media_remote_cache_days must not be negative".to_string())
        })?;

        let media_manager = self.media_manager.clone();
        Ok(tokio::spawn(async move {
            match media_manager.prune_all(days, false).await {
                Ok(()) => tracing::info!(days, "media prune completed"),
                Err(error) => tracing::error!(days, %error, "error pruning media"),
            }
        }))
    }

    /// Start refetching uncached emojis of `domain`, or of every remote
    /// domain when empty
    pub fn media_refetch(&self, domain: &str) -> Result<JoinHandle<()>> {
        let media_manager = self.media_manager.clone();
        let dereferencer = self.dereferencer.clone();
        let domain = domain.to_string();

        Ok(tokio::spawn(async move {
            match media_manager.refetch_emojis(&domain, dereferencer).await {
                Ok(refetched) => tracing::info!(%domain, refetched, "refetched emojis"),
                Err(error) => tracing::error!(%domain, %error, "error refetching emojis"),
            }
        }))
    }
}
