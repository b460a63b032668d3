//! Raw source-file and generated-artifact byte storage. Bulk multipart
//! upload handling and any bucket/CDN concerns are an external
//! collaborator's problem; this trait only needs to move bytes in and out
//! by key. The filesystem adapter is a plain `std::fs`/`Path` style
//! implementation, built on `tokio::fs` since every caller here is
//! already async.

use async_trait::async_trait;
use std::path::PathBuf;
use tracing::debug;

use crate::errors::CoreError;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError>;
    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError>;
    async fn delete(&self, key: &str) -> Result<(), CoreError>;
    async fn exists(&self, key: &str) -> Result<bool, CoreError>;
    async fn copy(&self, source_key: &str, dest_key: &str) -> Result<(), CoreError>;
}

pub struct FilesystemObjectStorage {
    root: PathBuf,
}

impl FilesystemObjectStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, CoreError> {
        if key.contains("..") || key.starts_with('/') {
            return Err(CoreError::Storage(format!("refusing unsafe storage key: {key}")));
        }
        Ok(self.root.join(key))
    }
}

#[async_trait]
impl ObjectStorage for FilesystemObjectStorage {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), CoreError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Storage(format!("mkdir {}: {e}", parent.display())))?;
        }
        debug!(key, bytes = bytes.len(), "writing object");
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| CoreError::Storage(format!("write {key}: {e}")))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, CoreError> {
        let path = self.resolve(key)?;
        tokio::fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CoreError::NotFound(format!("object {key}"))
            } else {
                CoreError::Storage(format!("read {key}: {e}"))
            }
        })
    }

    async fn delete(&self, key: &str) -> Result<(), CoreError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CoreError::Storage(format!("delete {key}: {e}"))),
        }
    }

    async fn exists(&self, key: &str) -> Result<bool, CoreError> {
        let path = self.resolve(key)?;
        Ok(tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CoreError::Storage(format!("stat {key}: {e}")))?)
    }

    async fn copy(&self, source_key: &str, dest_key: &str) -> Result<(), CoreError> {
        let source = self.resolve(source_key)?;
        let dest = self.resolve(dest_key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Storage(format!("mkdir {}: {e}", parent.display())))?;
        }
        tokio::fs::copy(&source, &dest)
            .await
            .map(|_| ())
            .map_err(|e| CoreError::Storage(format!("copy {source_key} -> {dest_key}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_through_put_and_get() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemObjectStorage::new(dir.path());
        storage.put("docs/a.txt", b"hello").await.unwrap();
        assert_eq!(storage.get("docs/a.txt").await.unwrap(), b"hello");
        assert!(storage.exists("docs/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn missing_key_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemObjectStorage::new(dir.path());
        let err = storage.get("nope.txt").await.unwrap_err();
        assert!(matches!(err, CoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn rejects_path_traversal_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemObjectStorage::new(dir.path());
        let err = storage.put("../escape.txt", b"x").await.unwrap_err();
        assert!(matches!(err, CoreError::Storage(_)));
    }

    #[tokio::test]
    async fn copy_duplicates_content_under_new_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FilesystemObjectStorage::new(dir.path());
        storage.put("v1/file.pdf", b"pdf-bytes").await.unwrap();
        storage.copy("v1/file.pdf", "v2/file.pdf").await.unwrap();
        assert_eq!(storage.get("v2/file.pdf").await.unwrap(), b"pdf-bytes");
    }
}
