//! Media storage on the local filesystem
//!
//! Blobs are addressed by relative keys such as
//! `{account_id}/attachment/original/{id}.webp`, stored under one root
//! directory.

use std::path::{Component, Path, PathBuf};

use crate::error::AppError;

/// Media storage service
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    /// Create new media storage rooted at `root`
    ///
    /// # Errors
    /// Returns error if the root directory cannot be created
    pub fn new(root: &Path) -> Result<Self, AppError> {
        std::fs::create_dir_all(root).map_err(|e| {
            AppError::Storage(format!("failed to create media directory: {e}"))
        })?;

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Resolve a key below the root, refusing anything that could escape it
    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        let relative = Path::new(key);
        let safe = !key.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));

        if !safe {
            return Err(AppError::Validation(format!("invalid media key: {key}")));
        }

        Ok(self.root.join(relative))
    }

    /// Write a blob, replacing any existing one
    ///
    /// # Arguments
    /// * `key` - Relative storage key
    /// * `data` - File contents
    pub async fn put(&self, key: &str, data: &[u8]) -> Result<(), AppError> {
        let path = self.path_for(key)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::Storage(format!("failed to create media directory: {e}")))?;
        }

        tokio::fs::write(&path, data)
            .await
            .map_err(|e| AppError::Storage(format!("failed to write media {key}: {e}")))?;

        tracing::debug!(key, bytes = data.len(), "media stored");
        Ok(())
    }

    /// Delete a blob; a missing blob is not an error
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(key, "media deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Storage(format!("failed to delete media {key}: {e}"))),
        }
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let path = self.path_for(key)?;

        match tokio::fs::metadata(&path).await {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Storage(format!("failed to stat media {key}: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn put_then_delete_roundtrip() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path()).unwrap();

        storage.put("acct/attachment/original/1.png", b"png").await.unwrap();
        assert!(storage.exists("acct/attachment/original/1.png").await.unwrap());

        storage.delete("acct/attachment/original/1.png").await.unwrap();
        assert!(!storage.exists("acct/attachment/original/1.png").await.unwrap());
    }

    #[tokio::test]
    async fn delete_missing_blob_is_ok() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(temp_dir.path()).unwrap();

        assert!(storage.delete("never/written.png").await.is_ok());
    }

    #[tokio::test]
    async fn keys_cannot_escape_root() {
        let temp_dir = TempDir::new().unwrap();
        let storage = MediaStorage::new(&temp_dir.path().join("media")).unwrap();

        for key in ["../outside.png", "/etc/passwd", "a/../../b", ""] {
            assert!(
                matches!(storage.put(key, b"x").await, Err(AppError::Validation(_))),
                "key {key:?} should be rejected"
            );
        }
    }
}
