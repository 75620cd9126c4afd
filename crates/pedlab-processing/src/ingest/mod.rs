//! Two-track ingestion: normalized content and the stored original.

mod images;
mod orchestrator;
mod session;
mod state;

pub use images::{host_images, image_file_name};
pub use orchestrator::IngestionOrchestrator;
pub use session::{UploadSession, UploadTicket};
pub use state::{
    ContentPhase, ContentTrack, IngestionOutcome, IngestionStatus, StoragePhase, StorageTrack,
};
