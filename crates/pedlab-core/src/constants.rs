//! Shared constants
//!
//! Defaults mirror what the remote stores fill in when a field is omitted.

/// Author recorded when the form leaves the field blank
pub const DEFAULT_AUTHOR: &str = "Аноним";

/// Category recorded when the form leaves the field blank
pub const DEFAULT_CATEGORY: &str = "Общее";

/// File type recorded for materials created without one
pub const DEFAULT_MATERIAL_FILE_TYPE: &str = "PDF";

/// Key prefix for raw uploaded documents
pub const RAW_FILE_PREFIX: &str = "articles";

/// Extensions accepted for upload (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "rtf", "doc", "docx", "odt", "pdf"];

/// Default upload size limit in megabytes
pub const DEFAULT_MAX_DOCUMENT_SIZE_MB: usize = 50;

/// Default S3-compatible endpoint for raw files
pub const DEFAULT_S3_ENDPOINT: &str = "https://storage.yandexcloud.net";

/// Default bucket for raw files
pub const DEFAULT_S3_BUCKET: &str = "pedagogical-forum-files";

/// Default region for the S3-compatible endpoint
pub const DEFAULT_S3_REGION: &str = "ru-central1";
