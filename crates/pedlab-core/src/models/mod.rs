//! Data models for the application
//!
//! Organized by domain: the intermediate document model produced by the
//! extractors, the ingestion request/result types, and the records exchanged
//! with the remote article, material and message stores.

mod article;
mod document;
mod ingestion;

// Re-export all models for convenient imports
pub use article::*;
pub use document::*;
pub use ingestion::*;
