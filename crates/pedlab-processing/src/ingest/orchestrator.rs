use super::state::{
    ContentPhase, ContentTrack, IngestionOutcome, IngestionStatus, StoragePhase, StorageTrack,
};
use crate::extract::extract;
use crate::html::normalize;
use crate::sniffer::FormatSniffer;
use pedlab_core::models::{DocumentKind, NormalizedDocument, UploadRequest};
use pedlab_core::{Config, IngestError};
use pedlab_storage::RawFileStore;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::watch;
use tracing::{error, info, warn, Instrument, Span};

/// Runs one upload through validation, then the content track (extract and
/// normalize on the blocking pool) and the storage track (raw file upload)
/// concurrently.
pub struct IngestionOrchestrator {
    sniffer: FormatSniffer,
    raw_store: Arc<dyn RawFileStore>,
}

impl IngestionOrchestrator {
    pub fn new(sniffer: FormatSniffer, raw_store: Arc<dyn RawFileStore>) -> Self {
        Self { sniffer, raw_store }
    }

    pub fn from_config(config: &Config, raw_store: Arc<dyn RawFileStore>) -> Self {
        Self::new(
            FormatSniffer::new(config.max_document_size_bytes()),
            raw_store,
        )
    }

    pub async fn ingest(&self, request: UploadRequest) -> IngestionOutcome {
        let (progress, _) = watch::channel(IngestionStatus::default());
        self.ingest_with_progress(request, Arc::new(progress)).await
    }

    /// Like [`ingest`](Self::ingest), publishing every phase change on
    /// `progress`. Returns once both tracks are terminal.
    #[tracing::instrument(
        skip(self, request, progress),
        fields(
            filename = %request.original_filename,
            size_bytes = request.size(),
            operation = "ingest"
        )
    )]
    pub async fn ingest_with_progress(
        &self,
        request: UploadRequest,
        progress: Arc<watch::Sender<IngestionStatus>>,
    ) -> IngestionOutcome {
        progress.send_replace(IngestionStatus {
            content: ContentPhase::Validating,
            storage: StoragePhase::NotStarted,
        });

        let kind = match self.sniffer.validate_all(&request) {
            Ok(kind) => kind,
            Err(e) => {
                let error = IngestError::from(e);
                warn!(error = %error, "Upload rejected");
                progress.send_modify(|status| status.content = ContentPhase::Rejected);
                return IngestionOutcome {
                    file_name: request.original_filename,
                    file_type: None,
                    content: ContentTrack::Rejected(error),
                    storage: StorageTrack::NotStarted,
                };
            }
        };

        let UploadRequest {
            data,
            original_filename: file_name,
            ..
        } = request;
        let raw = data.clone();

        progress.send_modify(|status| status.storage = StoragePhase::Uploading);
        let storage_handle = tokio::spawn(
            store_raw(
                self.raw_store.clone(),
                raw,
                file_name.clone(),
                kind.content_type(),
            )
            .in_current_span(),
        );

        let content_progress = progress.clone();
        let span = Span::current();
        let content_handle = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            process_content(kind, &data, &content_progress)
        });

        let content = async {
            let track = match content_handle.await {
                Ok(Ok(document)) => ContentTrack::Ready(document),
                Ok(Err(e)) => {
                    warn!(error = %e, "Content track failed");
                    ContentTrack::Failed(e)
                }
                Err(e) => {
                    error!(error = %e, "Content task aborted");
                    ContentTrack::Failed(IngestError::extraction(format!(
                        "extraction task failed: {}",
                        e
                    )))
                }
            };
            progress.send_modify(|status| status.content = track.phase());
            track
        };

        let storage = async {
            let track = match storage_handle.await {
                Ok(track) => track,
                Err(e) => {
                    error!(error = %e, "Storage task aborted");
                    StorageTrack::Failed(IngestError::StorageUnavailable(format!(
                        "storage task failed: {}",
                        e
                    )))
                }
            };
            progress.send_modify(|status| status.storage = track.phase());
            track
        };

        let (content, storage) = tokio::join!(content, storage);

        IngestionOutcome {
            file_name,
            file_type: Some(kind),
            content,
            storage,
        }
    }
}

fn process_content(
    kind: DocumentKind,
    data: &[u8],
    progress: &watch::Sender<IngestionStatus>,
) -> Result<NormalizedDocument, IngestError> {
    let start = Instant::now();

    progress.send_modify(|status| status.content = ContentPhase::Extracting);
    let blocks = extract(kind, data)?;

    progress.send_modify(|status| status.content = ContentPhase::Normalizing);
    let document = normalize(&blocks)?;

    info!(
        kind = %kind,
        size_bytes = data.len(),
        html_bytes = document.html.len(),
        images = document.images.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Content track ready"
    );

    Ok(document)
}

async fn store_raw(
    store: Arc<dyn RawFileStore>,
    data: Vec<u8>,
    file_name: String,
    content_type: &'static str,
) -> StorageTrack {
    let start = Instant::now();
    let size = data.len();

    match store.store(data, &file_name, content_type).await {
        Ok(stored) => {
            info!(
                key = %stored.key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "Raw file stored"
            );
            StorageTrack::Stored(stored)
        }
        Err(e) => {
            error!(error = %e, file_name = %file_name, "Raw file storage failed");
            StorageTrack::Failed(e.into())
        }
    }
}
