use pedlab_core::models::{DocumentKind, IngestionResult, NormalizedDocument};
use pedlab_core::{ErrorMetadata, IngestError};
use pedlab_storage::StoredFile;
use serde::Serialize;

/// Content track: `Idle → Validating → Extracting → Normalizing → Ready`,
/// with `Rejected` (validation) and `Failed` (extraction/normalization) exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentPhase {
    #[default]
    Idle,
    Validating,
    Extracting,
    Normalizing,
    Ready,
    Rejected,
    Failed,
}

impl ContentPhase {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ContentPhase::Ready | ContentPhase::Rejected | ContentPhase::Failed
        )
    }

    pub fn is_busy(self) -> bool {
        matches!(
            self,
            ContentPhase::Validating | ContentPhase::Extracting | ContentPhase::Normalizing
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoragePhase {
    #[default]
    NotStarted,
    Uploading,
    Stored,
    Failed,
}

/// Snapshot of both tracks, published to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct IngestionStatus {
    pub content: ContentPhase,
    pub storage: StoragePhase,
}

impl IngestionStatus {
    /// Submission is disabled while either track is still running.
    pub fn can_submit(&self) -> bool {
        !self.content.is_busy() && self.storage != StoragePhase::Uploading
    }
}

/// Terminal state of the content track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentTrack {
    Ready(NormalizedDocument),
    Rejected(IngestError),
    Failed(IngestError),
}

impl ContentTrack {
    pub fn phase(&self) -> ContentPhase {
        match self {
            ContentTrack::Ready(_) => ContentPhase::Ready,
            ContentTrack::Rejected(_) => ContentPhase::Rejected,
            ContentTrack::Failed(_) => ContentPhase::Failed,
        }
    }

    pub fn document(&self) -> Option<&NormalizedDocument> {
        match self {
            ContentTrack::Ready(document) => Some(document),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&IngestError> {
        match self {
            ContentTrack::Ready(_) => None,
            ContentTrack::Rejected(error) | ContentTrack::Failed(error) => Some(error),
        }
    }
}

/// Terminal state of the raw-file storage track.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageTrack {
    /// The upload was rejected before storage was attempted
    NotStarted,
    Stored(StoredFile),
    Failed(IngestError),
}

impl StorageTrack {
    pub fn phase(&self) -> StoragePhase {
        match self {
            StorageTrack::NotStarted => StoragePhase::NotStarted,
            StorageTrack::Stored(_) => StoragePhase::Stored,
            StorageTrack::Failed(_) => StoragePhase::Failed,
        }
    }

    pub fn stored(&self) -> Option<&StoredFile> {
        match self {
            StorageTrack::Stored(file) => Some(file),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&IngestError> {
        match self {
            StorageTrack::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Both tracks of one upload, available once both are terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionOutcome {
    pub file_name: String,
    /// `None` when the upload was rejected for its extension
    pub file_type: Option<DocumentKind>,
    pub content: ContentTrack,
    pub storage: StorageTrack,
}

impl IngestionOutcome {
    pub fn status(&self) -> IngestionStatus {
        IngestionStatus {
            content: self.content.phase(),
            storage: self.storage.phase(),
        }
    }

    /// Merged result when the content track is ready. The file URL is only
    /// present when the storage track succeeded too.
    pub fn result(&self) -> Option<IngestionResult> {
        let document = self.content.document()?;
        let file_type = self.file_type?;
        Some(IngestionResult {
            html: document.html.clone(),
            images: document.images.clone(),
            file_url: self.storage.stored().map(|file| file.url.clone()),
            file_name: self.file_name.clone(),
            file_type,
        })
    }

    /// Message for the person who uploaded the file, if the content track
    /// did not succeed.
    pub fn user_message(&self) -> Option<String> {
        self.content.error().map(|error| error.client_message())
    }
}
