//! Raw-file storage through the remote upload function.

use crate::ApiClient;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use pedlab_storage::{RawFileStore, StorageError, StorageResult, StoredFile};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadBody<'a> {
    file: String,
    file_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    url: String,
    file_name: String,
    key: String,
}

/// [`RawFileStore`] that posts the file, base64 encoded, to the upload
/// endpoint and returns the URL the endpoint reports.
#[derive(Clone, Debug)]
pub struct HttpRawFileStore {
    client: ApiClient,
}

impl HttpRawFileStore {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl RawFileStore for HttpRawFileStore {
    async fn store(
        &self,
        data: Vec<u8>,
        file_name: &str,
        _content_type: &str,
    ) -> StorageResult<StoredFile> {
        let start = Instant::now();
        let size = data.len();
        let body = UploadBody {
            file: STANDARD.encode(&data),
            file_name,
        };

        let response: UploadResponse = self
            .client
            .post_json(&self.client.endpoints().upload, &body)
            .await
            .map_err(|e| StorageError::UploadFailed(format!("{:#}", e)))?;

        if response.url.is_empty() {
            return Err(StorageError::UploadFailed(
                "upload endpoint returned no URL".to_string(),
            ));
        }

        tracing::info!(
            key = %response.key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Raw file uploaded to remote store"
        );

        Ok(StoredFile {
            url: response.url,
            key: response.key,
            file_name: response.file_name,
        })
    }
}
