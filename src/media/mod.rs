//! Media maintenance
//!
//! Pruning of cached and unused media, and refetching of remote emoji
//! images.

mod manager;

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::{AppError, Result};

pub use manager::Manager;

/// Fetches remote media bytes
#[async_trait]
pub trait MediaDereferencer: Send + Sync {
    async fn dereference(&self, url: &str) -> Result<Vec<u8>>;
}

/// Media maintenance operations used by the admin processor
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaManager: Send + Sync {
    /// Refetch remote emojis whose image is not cached
    ///
    /// # Arguments
    /// * `domain` - Only this domain, or every remote domain when empty
    ///
    /// # Returns
    /// Number of emojis refetched
    async fn refetch_emojis(
        &self,
        domain: &str,
        dereferencer: Arc<dyn MediaDereferencer>,
    ) -> Result<usize>;

    /// Prune remote media cache, unused local media and orphaned
    /// avatars/headers
    ///
    /// With `dry_run` set nothing is changed, only counted and logged.
    async fn prune_all(&self, remote_cache_days: u32, dry_run: bool) -> Result<()>;
}

/// `MediaDereferencer` over plain HTTP GET
pub struct HttpDereferencer {
    http_client: Arc<reqwest::Client>,
}

impl HttpDereferencer {
    pub fn new(http_client: Arc<reqwest::Client>) -> Self {
        Self { http_client }
    }
}

#[async_trait]
impl MediaDereferencer for HttpDereferencer {
    async fn dereference(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http_client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Storage(format!(
                "dereferencing {url} failed with status {}",
                response.status()
            )));
        }

        let bytes = response.bytes().await?;
        Ok(bytes.to_vec())
    }
}
