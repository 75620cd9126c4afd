use async_trait::async_trait;
use pedlab_storage::{RawFileStore, StorageError, StorageResult, StoredFile};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Raw-file store that records every call and answers with a fake URL.
#[derive(Default)]
pub struct RecordingStore {
    calls: AtomicUsize,
    stored: Mutex<Vec<(String, String, usize)>>,
    delay: Option<Duration>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that takes `delay` before answering.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(file_name, content_type, size)` per call
    pub fn stored(&self) -> Vec<(String, String, usize)> {
        self.stored.lock().unwrap().clone()
    }
}

#[async_trait]
impl RawFileStore for RecordingStore {
    async fn store(
        &self,
        data: Vec<u8>,
        file_name: &str,
        content_type: &str,
    ) -> StorageResult<StoredFile> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.stored.lock().unwrap().push((
            file_name.to_string(),
            content_type.to_string(),
            data.len(),
        ));
        let key = format!("articles/{:08x}_{}", call, file_name);
        Ok(StoredFile {
            url: format!("https://files.test/{}", key),
            key,
            file_name: file_name.to_string(),
        })
    }
}

/// Raw-file store that is always down.
#[derive(Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RawFileStore for FailingStore {
    async fn store(
        &self,
        _data: Vec<u8>,
        _file_name: &str,
        _content_type: &str,
    ) -> StorageResult<StoredFile> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StorageError::BackendError("connection refused".to_string()))
    }
}
