//! S3-compatible object storage (AWS, Yandex Object Storage, MinIO).

use crate::keys::validate_key;
use crate::traits::{Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, ObjectStoreExt, PutOptions, PutPayload};
use std::time::Instant;

#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    url_prefix: String,
}

impl S3Storage {
    /// Credentials are read from the `AWS_*` environment variables. With a
    /// custom `endpoint` objects are addressed path-style.
    pub async fn new(
        bucket: String,
        region: String,
        endpoint: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_bucket_name(&bucket)
            .with_region(&region);
        if let Some(endpoint) = endpoint.as_deref() {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(format!("S3 client: {}", e)))?;
        let url_prefix = url_prefix(endpoint.as_deref(), &bucket, &region);

        Ok(Self {
            store,
            bucket,
            url_prefix,
        })
    }
}

fn url_prefix(endpoint: Option<&str>, bucket: &str, region: &str) -> String {
    match endpoint {
        Some(endpoint) => format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        None => format!("https://{}.s3.{}.amazonaws.com", bucket, region),
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> StorageResult<()> {
        validate_key(key)?;
        let started = Instant::now();
        let size = data.len();

        let mut attributes = Attributes::new();
        attributes.insert(Attribute::ContentType, content_type.to_string().into());
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(
                &ObjectPath::from(key),
                PutPayload::from(Bytes::from(data)),
                options,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %self.bucket, key = %key, "S3 put failed");
                StorageError::UploadFailed(e.to_string())
            })?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = started.elapsed().as_secs_f64() * 1000.0,
            "Document written to S3"
        );
        Ok(())
    }

    async fn fetch(&self, key: &str) -> StorageResult<Vec<u8>> {
        validate_key(key)?;
        let object = match self.store.get(&ObjectPath::from(key)).await {
            Ok(object) => object,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(StorageError::ReadFailed(e.to_string())),
        };
        let bytes = object
            .bytes()
            .await
            .map_err(|e| StorageError::ReadFailed(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.url_prefix, key)
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
