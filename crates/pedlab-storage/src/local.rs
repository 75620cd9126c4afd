//! Filesystem backend: objects are plain files under a root directory,
//! served by whatever web server exposes that directory at `base_url`.

use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::AsyncWriteExt;

#[derive(Clone)]
pub struct LocalStorage {
    root: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Open (creating if needed) a store rooted at `root`. Public URLs are
    /// `{base_url}/{key}`.
    pub async fn new(root: impl Into<PathBuf>, base_url: String) -> StorageResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!("cannot create {}: {}", root.display(), e))
        })?;

        Ok(Self {
            root,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn resolve(&self, key: &str) -> StorageResult<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(key))
    }
}

async fn write_and_rename(partial: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut file = fs::File::create(partial).await?;
    file.write_all(data).await?;
    file.sync_all().await?;
    drop(file);
    fs::rename(partial, target).await
}

#[async_trait]
impl Storage for LocalStorage {
    async fn put(&self, key: &str, data: Vec<u8>, _content_type: &str) -> StorageResult<()> {
        let target = self.resolve(key)?;
        let started = Instant::now();
        let write_err =
            |e: std::io::Error| StorageError::UploadFailed(format!("{}: {}", target.display(), e));

        if let Some(dir) = target.parent() {
            fs::create_dir_all(dir).await.map_err(write_err)?;
        }

        // Readers never observe a half-written document.
        let partial = target.with_extension("part");
        if let Err(e) = write_and_rename(&partial, &target, &data).await {
            if let Err(cleanup) = fs::remove_file(&partial).await {
                tracing::debug!(
                    path = %partial.display(),
                    error = %cleanup,
                    "Partial file not removed"
                );
            }
            return Err(write_err(e));
        }

        tracing::info!(
            key = %key,
            size_bytes = data.len(),
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Document written to local storage"
        );
        Ok(())
    }

    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>> {
        let path = self.resolve(key)?;
        match fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => Err(StorageError::ReadFailed(format!("{}: {}", path.display(), e))),
        }
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.base_url, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stored_document_is_readable_at_its_key() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://localhost:3000/files/".to_string())
            .await
            .unwrap();

        let (key, url) = storage
            .store_document("lesson plan.txt", "text/plain", b"plan".to_vec())
            .await
            .unwrap();

        assert!(key.starts_with("articles/") && key.ends_with("_lesson_plan.txt"));
        assert_eq!(url, format!("http://localhost:3000/files/{}", key));
        assert_eq!(storage.fetch(&key).await.unwrap(), b"plan");
        assert!(!dir.path().join(&key).with_extension("part").exists());
    }

    #[tokio::test]
    async fn keys_outside_the_root_are_refused() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();

        assert!(matches!(
            storage.fetch("../../etc/passwd").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            storage.put("/tmp/x", Vec::new(), "text/plain").await,
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();
        assert!(matches!(
            storage.fetch("articles/00000000_gone.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_leaves_no_partial_file() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), String::new()).await.unwrap();
        let key = "articles/0a1b2c3d_plan.pdf";
        // a non-empty directory in the way makes the final rename fail
        std::fs::create_dir_all(dir.path().join(key).join("occupied")).unwrap();

        assert!(matches!(
            storage.put(key, b"plan".to_vec(), "application/pdf").await,
            Err(StorageError::UploadFailed(_))
        ));
        assert!(!dir.path().join(key).with_extension("part").exists());
    }
}
