//! The `Storage` trait implemented by every raw-document backend.

use crate::StorageBackend;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Read failed: {0}")]
    ReadFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// A storage failure only ever fails the raw-file track of an upload.
impl From<StorageError> for pedlab_core::IngestError {
    fn from(err: StorageError) -> Self {
        pedlab_core::IngestError::StorageUnavailable(err.to_string())
    }
}

/// Write-once storage for original documents.
///
/// Objects are never overwritten or deleted by the pipeline; each upload gets
/// a fresh key (see [`crate::keys`]).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Store a document under a new key; returns `(key, public_url)`.
    async fn store_document(
        &self,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> StorageResult<(String, String)> {
        let key = crate::keys::generate_raw_file_key(filename);
        self.put(&key, data, content_type).await?;
        let url = self.url_for(&key);
        Ok((key, url))
    }

    /// Write `data` at `key`. Keys must pass [`crate::keys::validate_key`].
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()>;

    /// Read back the object at `key`.
    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>>;

    /// Public URL for a key, without checking that the object exists
    fn url_for(&self, key: &str) -> String;

    fn backend_type(&self) -> StorageBackend;
}
