//! Pedlab Processing Library
//!
//! The document ingestion pipeline: format sniffing, per-format extraction
//! into the intermediate block model, HTML normalization, the two-track
//! ingestion orchestrator and article assembly.

pub mod assembly;
pub mod extract;
pub mod html;
pub mod ingest;
pub mod sniffer;

// Re-export commonly used types
pub use assembly::{assemble, ArticleDraft, ContentMode};
pub use extract::{extract, extractor_for, Extractor};
pub use html::{bind_image_sources, normalize};
pub use ingest::{
    host_images, image_file_name, ContentPhase, ContentTrack, IngestionOrchestrator,
    IngestionOutcome, IngestionStatus, StoragePhase, StorageTrack, UploadSession, UploadTicket,
};
pub use sniffer::{sniff, FormatSniffer, ValidationError};
