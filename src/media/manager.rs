//! Media manager backed by the repositories and filesystem storage

use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

use super::{MediaDereferencer, MediaManager};
use crate::data::{AccountRepository, Database, MediaAttachment, MediaColumn, MediaRepository};
use crate::error::{NotFoundExt, Result};
use crate::storage::MediaStorage;

/// Attachments fetched per page while pruning
const PRUNE_SELECT_LIMIT: usize = 50;

/// Local uploads never attached to anything are kept this long
const UNUSED_LOCAL_ATTACHMENT_DAYS: i64 = 1;

/// Default `MediaManager`
pub struct Manager {
    db: Arc<Database>,
    media: MediaRepository,
    accounts: AccountRepository,
    storage: Arc<MediaStorage>,
}

impl Manager {
    pub fn new(
        db: Arc<Database>,
        media: MediaRepository,
        accounts: AccountRepository,
        storage: Arc<MediaStorage>,
    ) -> Self {
        Self {
            db,
            media,
            accounts,
            storage,
        }
    }

    async fn delete_blobs(&self, media: &MediaAttachment) -> Result<()> {
        for key in [media.file_path.as_deref(), media.thumbnail_path.as_deref()]
            .into_iter()
            .flatten()
        {
            self.storage.delete(key).await?;
        }
        Ok(())
    }

    /// Drop blobs of remote media older than the cutoff, keeping the rows
    async fn uncache_remote(&self, remote_cache_days: u32, dry_run: bool) -> Result<i64> {
        let older_than = Utc::now() - Duration::days(i64::from(remote_cache_days));

        if dry_run {
            return self.media.count_remote_older_than(older_than).await;
        }

        let mut total = 0;
        let mut max_id: Option<String> = None;

        loop {
            let page = self
                .media
                .get_remote_older_than(older_than, max_id.as_deref(), PRUNE_SELECT_LIMIT)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            max_id = Some(last.id.clone());

            for mut media in page {
                self.delete_blobs(&media).await?;

                media.cached = false;
                media.file_path = None;
                media.thumbnail_path = None;
                self.media
                    .update_attachment(
                        &mut media,
                        &[
                            MediaColumn::Cached,
                            MediaColumn::FilePath,
                            MediaColumn::ThumbnailPath,
                        ],
                    )
                    .await?;
                total += 1;
            }
        }

        Ok(total)
    }

    /// Delete local uploads that were never attached to a status or profile
    async fn prune_unused_local(&self, dry_run: bool) -> Result<i64> {
        let older_than = Utc::now() - Duration::days(UNUSED_LOCAL_ATTACHMENT_DAYS);

        if dry_run {
            return self
                .media
                .count_local_unattached_older_than(older_than)
                .await;
        }

        let mut total = 0;
        let mut max_id: Option<String> = None;

        loop {
            let page = self
                .media
                .get_local_unattached_older_than(older_than, max_id.as_deref(), PRUNE_SELECT_LIMIT)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            max_id = Some(last.id.clone());

            for media in page {
                self.delete_blobs(&media).await?;
                self.media.delete_attachment(&media.id).await?;
                total += 1;
            }
        }

        Ok(total)
    }

    /// Delete avatars and headers their owning account no longer uses
    async fn prune_orphaned_profile_media(&self, dry_run: bool) -> Result<i64> {
        let mut total = 0;
        let mut max_id: Option<String> = None;

        loop {
            let page = self
                .media
                .get_avatars_and_headers(max_id.as_deref(), PRUNE_SELECT_LIMIT)
                .await?;
            let Some(last) = page.last() else {
                break;
            };
            max_id = Some(last.id.clone());

            for media in page {
                let owner = self
                    .accounts
                    .get_account_by_id(&media.account_id)
                    .await
                    .optional()?;

                let in_use = owner.is_some_and(|account| {
                    account.avatar_media_attachment_id.as_deref() == Some(media.id.as_str())
                        || account.header_media_attachment_id.as_deref() == Some(media.id.as_str())
                });
                if in_use {
                    continue;
                }

                if !dry_run {
                    self.delete_blobs(&media).await?;
                    self.media.delete_attachment(&media.id).await?;
                }
                total += 1;
            }
        }

        Ok(total)
    }
}

#[async_trait]
impl MediaManager for Manager {
    async fn refetch_emojis(
        &self,
        domain: &str,
        dereferencer: Arc<dyn MediaDereferencer>,
    ) -> Result<usize> {
        let domain = (!domain.is_empty()).then_some(domain);
        let emojis = self.db.get_uncached_remote_emojis(domain).await?;
        let mut refetched = 0;

        for emoji in emojis {
            let Some(url) = emoji.image_remote_url.as_deref() else {
                continue;
            };

            let bytes = match dereferencer.dereference(url).await {
                Ok(bytes) => bytes,
                Err(error) => {
                    tracing::warn!(
                        shortcode = %emoji.shortcode,
                        domain = %emoji.domain,
                        %error,
                        "error dereferencing emoji image"
                    );
                    continue;
                }
            };

            let key = format!("emoji/{}/{}", emoji.domain, emoji.id);
            self.storage.put(&key, &bytes).await?;
            self.db.mark_emoji_cached(&emoji.id, &key).await?;
            refetched += 1;
        }

        Ok(refetched)
    }

    async fn prune_all(&self, remote_cache_days: u32, dry_run: bool) -> Result<()> {
        let uncached = self.uncache_remote(remote_cache_days, dry_run).await?;
        let unused_local = self.prune_unused_local(dry_run).await?;
        let orphaned = self.prune_orphaned_profile_media(dry_run).await?;

        tracing::info!(
            uncached,
            unused_local,
            orphaned,
            dry_run,
            "media prune finished"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::*;
    use crate::data::{AccountColumn, Emoji, EntityId, StructCache};
    use crate::error::AppError;
    use tempfile::TempDir;

    struct Harness {
        manager: Manager,
        db: Arc<Database>,
        media: MediaRepository,
        accounts: AccountRepository,
        storage: Arc<MediaStorage>,
        _temp_dir: TempDir,
    }

    async fn harness() -> Harness {
        let (db, temp_dir) = create_test_db().await;
        let db = Arc::new(db);
        let ttl = std::time::Duration::from_secs(60);
        let media = MediaRepository::new(db.clone(), Arc::new(StructCache::new("media", 100, ttl)));
        let accounts =
            AccountRepository::new(db.clone(), Arc::new(StructCache::new("account", 100, ttl)));
        let storage = Arc::new(MediaStorage::new(&temp_dir.path().join("media")).unwrap());

        Harness {
            manager: Manager::new(db.clone(), media.clone(), accounts.clone(), storage.clone()),
            db,
            media,
            accounts,
            storage,
            _temp_dir: temp_dir,
        }
    }

    struct FakeDereferencer;

    #[async_trait]
    impl MediaDereferencer for FakeDereferencer {
        async fn dereference(&self, url: &str) -> Result<Vec<u8>> {
            if url.contains("broken") {
                return Err(AppError::Storage("gone".to_string()));
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    #[tokio::test]
    async fn test_prune_uncaches_old_remote_media() {
        let h = harness().await;
        let bob = remote_account("bob", "remote.example");

        let mut stale = media_for(&bob);
        stale.remote_url = Some("https://remote.example/media/1.png".to_string());
        stale.created_at = Utc::now() - Duration::days(40);
        h.media.put_attachment(&stale).await.unwrap();
        let key = stale.file_path.clone().unwrap();
        h.storage.put(&key, b"png").await.unwrap();

        h.manager.prune_all(30, false).await.unwrap();

        let stored = h.db.get_media_attachment_by_id(&stale.id).await.unwrap();
        assert!(!stored.cached);
        assert_eq!(stored.file_path, None);
        assert!(!h.storage.exists(&key).await.unwrap());
    }

    #[tokio::test]
    async fn test_dry_run_changes_nothing() {
        let h = harness().await;
        let alice = local_account("alice");

        let mut unused = media_for(&alice);
        unused.created_at = Utc::now() - Duration::days(3);
        h.media.put_attachment(&unused).await.unwrap();

        h.manager.prune_all(30, true).await.unwrap();

        assert!(h.media.get_attachment_by_id(&unused.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_deletes_unused_local_media() {
        let h = harness().await;
        let alice = local_account("alice");

        let mut unused = media_for(&alice);
        unused.created_at = Utc::now() - Duration::days(3);
        h.media.put_attachment(&unused).await.unwrap();

        let fresh = media_for(&alice);
        h.media.put_attachment(&fresh).await.unwrap();

        h.manager.prune_all(30, false).await.unwrap();

        assert!(matches!(
            h.media.get_attachment_by_id(&unused.id).await,
            Err(AppError::NotFound)
        ));
        assert!(h.media.get_attachment_by_id(&fresh.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_prune_deletes_only_orphaned_avatars() {
        let h = harness().await;
        let mut alice = local_account("alice");
        h.accounts.put_account(&alice).await.unwrap();

        let mut current = media_for(&alice);
        current.avatar = true;
        h.media.put_attachment(&current).await.unwrap();

        let mut replaced = media_for(&alice);
        replaced.avatar = true;
        h.media.put_attachment(&replaced).await.unwrap();

        alice.avatar_media_attachment_id = Some(current.id.clone());
        h.accounts
            .update_account(&mut alice, &[AccountColumn::AvatarMediaAttachmentId])
            .await
            .unwrap();

        h.manager.prune_all(30, false).await.unwrap();

        assert!(h.media.get_attachment_by_id(&current.id).await.is_ok());
        assert!(matches!(
            h.media.get_attachment_by_id(&replaced.id).await,
            Err(AppError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_refetch_emojis_skips_failures() {
        let h = harness().await;

        for (shortcode, url) in [
            ("blob", "https://remote.example/emoji/blob.png"),
            ("broken", "https://remote.example/emoji/broken.png"),
        ] {
            h.db.insert_emoji(&Emoji {
                id: EntityId::new().0,
                shortcode: shortcode.to_string(),
                domain: "remote.example".to_string(),
                image_remote_url: Some(url.to_string()),
                image_path: None,
                cached: false,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .await
            .unwrap();
        }

        let refetched = h
            .manager
            .refetch_emojis("remote.example", Arc::new(FakeDereferencer))
            .await
            .unwrap();
        assert_eq!(refetched, 1);

        let remaining = h
            .db
            .get_uncached_remote_emojis(Some("remote.example"))
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].shortcode, "broken");
    }
}
