//! Pedlab Core Library
//!
//! This crate provides the domain models, error taxonomy, configuration and
//! constants shared by the ingestion pipeline, the storage backends, the API
//! client and the CLI.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{Config, PedlabConfig};
pub use error::{AppError, ErrorMetadata, IngestError, LogLevel};
pub use models::DocumentKind;
pub use storage_types::StorageBackend;
// Note: Storage, StorageError, StorageResult live in pedlab-storage
