//! Media attachment repository
//!
//! Every read of a single attachment goes through the `ID` cache index.
//! Range queries only select IDs and hydrate them through the same path,
//! so a cached attachment is never read from the database twice.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::cache::{CacheKey, Cacheable, StructCache};
use super::database::{with_updated_at, Database};
use super::models::{MediaAttachment, MediaColumn};
use crate::error::{AppError, Result};

impl Cacheable for MediaAttachment {
    fn cache_keys(&self) -> Vec<CacheKey> {
        vec![CacheKey::new("ID", &[&self.id])]
    }
}

/// Cache-backed access to media attachments
#[derive(Clone)]
pub struct MediaRepository {
    db: Arc<Database>,
    cache: Arc<StructCache<MediaAttachment>>,
}

impl MediaRepository {
    pub fn new(db: Arc<Database>, cache: Arc<StructCache<MediaAttachment>>) -> Self {
        Self { db, cache }
    }

    pub async fn get_attachment_by_id(&self, id: &str) -> Result<MediaAttachment> {
        let media = self
            .cache
            .load("ID", || self.db.get_media_attachment_by_id(id), &[id])
            .await?;
        Ok(MediaAttachment::clone(&media))
    }

    /// Best-effort lookup of many attachments
    ///
    /// IDs that fail to load are logged and left out of the result.
    pub async fn get_attachments_by_ids(&self, ids: &[String]) -> Vec<MediaAttachment> {
        let mut attachments = Vec::with_capacity(ids.len());

        for id in ids {
            match self.get_attachment_by_id(id).await {
                Ok(media) => attachments.push(media),
                Err(AppError::NotFound) => {
                    tracing::debug!(media_id = %id, "attachment vanished before hydration");
                }
                Err(e) => {
                    tracing::error!(media_id = %id, error = %e, "error getting attachment");
                }
            }
        }

        attachments
    }

    pub async fn get_attachments_by_status(&self, status_id: &str) -> Result<Vec<MediaAttachment>> {
        let ids = self.db.get_media_attachment_ids_by_status(status_id).await?;
        Ok(self.get_attachments_by_ids(&ids).await)
    }

    pub async fn sync_cache_size(&self) {
        self.cache.sync_size().await;
    }

    pub async fn put_attachment(&self, media: &MediaAttachment) -> Result<()> {
        self.cache
            .store(media, self.db.insert_media_attachment(media))
            .await
    }

    /// Persist changed columns of an attachment
    ///
    /// `updated_at` is always refreshed. An empty column list writes
    /// every column.
    pub async fn update_attachment(
        &self,
        media: &mut MediaAttachment,
        columns: &[MediaColumn],
    ) -> Result<()> {
        media.updated_at = Utc::now();

        let columns = if columns.is_empty() {
            Vec::new()
        } else {
            with_updated_at(columns, MediaColumn::UpdatedAt)
        };

        let media: &MediaAttachment = media;
        self.cache
            .store(media, self.db.update_media_attachment_columns(media, &columns))
            .await
    }

    /// Delete from the database, then drop from the cache
    pub async fn delete_attachment(&self, id: &str) -> Result<()> {
        self.db.delete_media_attachment_by_id(id).await?;
        self.cache.invalidate("ID", &[id]).await;
        Ok(())
    }

    /// Cached remote attachments created before `older_than`
    pub async fn get_remote_older_than(
        &self,
        older_than: DateTime<Utc>,
        max_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MediaAttachment>> {
        let ids = self
            .db
            .get_remote_media_ids_older_than(older_than, max_id, limit)
            .await?;
        Ok(self.get_attachments_by_ids(&ids).await)
    }

    pub async fn count_remote_older_than(&self, older_than: DateTime<Utc>) -> Result<i64> {
        self.db.count_remote_media_older_than(older_than).await
    }

    pub async fn get_avatars_and_headers(
        &self,
        max_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MediaAttachment>> {
        let ids = self.db.get_avatar_and_header_media_ids(max_id, limit).await?;
        Ok(self.get_attachments_by_ids(&ids).await)
    }

    /// Cached local attachments never attached to a status, avatar or header
    pub async fn get_local_unattached_older_than(
        &self,
        older_than: DateTime<Utc>,
        max_id: Option<&str>,
        limit: usize,
    ) -> Result<Vec<MediaAttachment>> {
        let ids = self
            .db
            .get_local_unattached_media_ids_older_than(older_than, max_id, limit)
            .await?;
        Ok(self.get_attachments_by_ids(&ids).await)
    }

    pub async fn count_local_unattached_older_than(&self, older_than: DateTime<Utc>) -> Result<i64> {
        self.db
            .count_local_unattached_media_older_than(older_than)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::{create_test_db, local_account, remote_account, media_for};
    use chrono::Duration;
    use tempfile::TempDir;

    async fn setup() -> (MediaRepository, Arc<Database>, TempDir) {
        let (db, temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let cache = Arc::new(StructCache::new(
            "media",
            100,
            std::time::Duration::from_secs(60),
        ));
        (MediaRepository::new(db.clone(), cache), db, temp_dir)
    }

    #[tokio::test]
    async fn test_put_then_get_is_served_from_cache() {
        let (repo, db, _temp_dir) = setup().await;
        let media = media_for(&local_account("alice"));

        repo.put_attachment(&media).await.unwrap();

        // Remove the row behind the repository's back; the cached copy remains.
        db.delete_media_attachment_by_id(&media.id).await.unwrap();

        let loaded = repo.get_attachment_by_id(&media.id).await.unwrap();
        assert_eq!(loaded, media);
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let (repo, _db, _temp_dir) = setup().await;

        let result = repo.get_attachment_by_id("missing").await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_update_stamps_updated_at() {
        let (repo, db, _temp_dir) = setup().await;
        let mut media = media_for(&local_account("alice"));
        media.updated_at = Utc::now() - Duration::days(1);
        let before = media.updated_at;
        repo.put_attachment(&media).await.unwrap();

        media.description = Some("a cat".to_string());
        repo.update_attachment(&mut media, &[MediaColumn::Description])
            .await
            .unwrap();

        let stored = db.get_media_attachment_by_id(&media.id).await.unwrap();
        assert_eq!(stored.description.as_deref(), Some("a cat"));
        assert!(stored.updated_at > before);

        let cached = repo.get_attachment_by_id(&media.id).await.unwrap();
        assert_eq!(cached.updated_at, media.updated_at);
    }

    #[tokio::test]
    async fn test_delete_invalidates_cache() {
        let (repo, _db, _temp_dir) = setup().await;
        let media = media_for(&local_account("alice"));
        repo.put_attachment(&media).await.unwrap();

        repo.delete_attachment(&media.id).await.unwrap();

        let result = repo.get_attachment_by_id(&media.id).await;
        assert!(matches!(result, Err(AppError::NotFound)));
    }

    #[tokio::test]
    async fn test_get_attachments_by_ids_skips_missing() {
        let (repo, _db, _temp_dir) = setup().await;
        let alice = local_account("alice");
        let first = media_for(&alice);
        let second = media_for(&alice);
        repo.put_attachment(&first).await.unwrap();
        repo.put_attachment(&second).await.unwrap();

        let ids = vec![first.id.clone(), "missing".to_string(), second.id.clone()];
        let found = repo.get_attachments_by_ids(&ids).await;

        let found_ids: Vec<_> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(found_ids, vec![first.id.as_str(), second.id.as_str()]);
    }

    #[tokio::test]
    async fn test_remote_older_than_hydrates_attachments() {
        let (repo, _db, _temp_dir) = setup().await;
        let bob = remote_account("bob", "remote.example");

        let mut stale = media_for(&bob);
        stale.remote_url = Some("https://remote.example/media/1.png".to_string());
        stale.created_at = Utc::now() - Duration::days(40);
        repo.put_attachment(&stale).await.unwrap();

        let cutoff = Utc::now() - Duration::days(30);
        let found = repo.get_remote_older_than(cutoff, None, 0).await.unwrap();
        assert_eq!(found, vec![stale]);
        assert_eq!(repo.count_remote_older_than(cutoff).await.unwrap(), 1);
    }
}
