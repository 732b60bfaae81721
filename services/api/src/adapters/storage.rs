//! services/api/src/adapters/storage.rs
//!
//! This module contains the object storage adapter, which is the concrete
//! implementation of the `ObjectStorageService` port. Objects live on the
//! local filesystem under the configured media root and are served publicly
//! beneath `<public_base_url>/media/`.

use async_trait::async_trait;
use bytes::Bytes;
use folktales_core::ports::{ObjectStorageService, PortError, PortResult};
use std::path::{Path, PathBuf};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `ObjectStorageService` port on a local
/// directory tree.
#[derive(Clone)]
pub struct FsStorageAdapter {
    media_root: PathBuf,
    public_base_url: String,
}

impl FsStorageAdapter {
    /// Creates a new `FsStorageAdapter`.
    pub fn new(media_root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            media_root: media_root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    /// Resolves a storage path against the media root. Paths are generated
    /// internally, but anything trying to climb out of the root is refused.
    fn resolve(&self, path: &str) -> PortResult<PathBuf> {
        let relative = Path::new(path);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(PortError::Unexpected(format!(
                "Refusing storage path outside the media root: {path}"
            )));
        }
        Ok(self.media_root.join(relative))
    }
}

//=========================================================================================
// `ObjectStorageService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ObjectStorageService for FsStorageAdapter {
    async fn store(&self, path: &str, data: Bytes) -> PortResult<()> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(e.to_string()))?;
        }
        tokio::fs::write(&target, &data)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))
    }

    fn public_url(&self, path: &str) -> String {
        format!(
            "{}/media/{}",
            self.public_base_url.trim_end_matches('/'),
            path
        )
    }

    async fn remove(&self, path: &str) -> PortResult<()> {
        let target = self.resolve(path)?;
        match tokio::fs::remove_file(&target).await {
            Ok(()) => Ok(()),
            // An object that is already gone is not a failure to remove it.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stores_and_removes_objects_under_the_media_root() {
        let root = tempfile::tempdir().unwrap();
        let storage = FsStorageAdapter::new(root.path(), "http://localhost:3000");

        let path = "user-1/abc-song.mp3";
        storage.store(path, Bytes::from_static(b"riff")).await.unwrap();
        assert!(root.path().join(path).exists());

        storage.remove(path).await.unwrap();
        assert!(!root.path().join(path).exists());

        // Removing a missing object stays quiet.
        storage.remove(path).await.unwrap();
    }

    #[tokio::test]
    async fn refuses_paths_that_escape_the_root() {
        let root = tempfile::tempdir().unwrap();
        let storage = FsStorageAdapter::new(root.path(), "http://localhost:3000");
        assert!(storage
            .store("../outside.mp3", Bytes::from_static(b"x"))
            .await
            .is_err());
        assert!(storage.remove("/etc/passwd").await.is_err());
    }

    #[test]
    fn public_urls_are_issued_beneath_the_media_prefix() {
        let storage = FsStorageAdapter::new("/tmp/media", "http://localhost:3000/");
        assert_eq!(
            storage.public_url("user-1/abc-song.mp3"),
            "http://localhost:3000/media/user-1/abc-song.mp3"
        );
    }
}
