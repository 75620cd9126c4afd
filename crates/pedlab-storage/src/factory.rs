//! Builds the configured [`Storage`] backend.

use crate::{Storage, StorageBackend, StorageError, StorageResult};
use pedlab_core::Config;
use std::sync::Arc;

fn required<'a>(value: Option<&'a str>, var: &str) -> StorageResult<&'a str> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| StorageError::ConfigError(format!("{} is not set", var)))
}

/// Backend named by `STORAGE_BACKEND`, S3 when unset.
pub async fn create_storage(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let backend = config.storage_backend().unwrap_or(StorageBackend::S3);
    tracing::debug!(backend = %backend, "Creating raw document storage");

    match backend {
        StorageBackend::S3 => s3(config).await,
        StorageBackend::Local => local(config).await,
    }
}

#[cfg(feature = "storage-s3")]
async fn s3(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let bucket = required(config.s3_bucket(), "S3_BUCKET")?;
    let region = required(config.s3_region(), "S3_REGION")?;
    let storage = crate::S3Storage::new(
        bucket.to_string(),
        region.to_string(),
        config.s3_endpoint().map(str::to_string),
    )
    .await?;
    Ok(Arc::new(storage))
}

#[cfg(not(feature = "storage-s3"))]
async fn s3(_config: &Config) -> StorageResult<Arc<dyn Storage>> {
    Err(StorageError::ConfigError(
        "built without the storage-s3 feature".to_string(),
    ))
}

#[cfg(feature = "storage-local")]
async fn local(config: &Config) -> StorageResult<Arc<dyn Storage>> {
    let root = required(config.local_storage_path(), "LOCAL_STORAGE_PATH")?;
    let base_url = match config.local_storage_base_url() {
        Some(url) => url.to_string(),
        None => format!("file://{}", root.trim_end_matches('/')),
    };
    Ok(Arc::new(crate::LocalStorage::new(root, base_url).await?))
}

#[cfg(not(feature = "storage-local"))]
async fn local(_config: &Config) -> StorageResult<Arc<dyn Storage>> {
    Err(StorageError::ConfigError(
        "built without the storage-local feature".to_string(),
    ))
}
