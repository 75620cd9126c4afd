//! Raw-file store: keeps the original bytes of an upload downloadable.
//!
//! The ingestion pipeline only needs "accept bytes + filename, return a
//! durable URL"; `RawFileStore` is that contract. `StorageRawFileStore`
//! satisfies it with any `Storage` backend, and the API client crate
//! satisfies it with the remote upload endpoint.

use crate::traits::{Storage, StorageResult};
use async_trait::async_trait;
use std::sync::Arc;

/// Where a raw upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub key: String,
    pub file_name: String,
}

#[async_trait]
pub trait RawFileStore: Send + Sync {
    async fn store(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<StoredFile>;
}

/// Raw-file store backed by object storage (S3-compatible or local).
#[derive(Clone)]
pub struct StorageRawFileStore {
    storage: Arc<dyn Storage>,
}

impl StorageRawFileStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl RawFileStore for StorageRawFileStore {
    async fn store(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<StoredFile> {
        let (key, url) = self.storage.store_document(file_name, content_type, data).await?;

        Ok(StoredFile {
            url,
            key,
            file_name: file_name.to_string(),
        })
    }
}

#[cfg(all(test, feature = "storage-local"))]
mod tests {
    use super::*;
    use crate::LocalStorage;
    use tempfile::tempdir;

    #[tokio::test]
    async fn stores_under_article_prefix() {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path(), "http://files.local".to_string())
            .await
            .unwrap();
        let store = StorageRawFileStore::new(Arc::new(storage.clone()));

        let stored = store
            .store(b"hello".to_vec(), "Урок 1.txt", "text/plain")
            .await
            .unwrap();

        assert!(stored.key.starts_with("articles/"));
        assert!(stored.key.ends_with("_Урок_1.txt"));
        assert_eq!(stored.url, format!("http://files.local/{}", stored.key));
        assert_eq!(stored.file_name, "Урок 1.txt");
        assert_eq!(storage.fetch(&stored.key).await.unwrap(), b"hello");
    }
}
