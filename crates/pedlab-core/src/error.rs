//! Error taxonomy.
//!
//! [`IngestError`] covers both ingestion tracks; [`AppError`] adds the
//! failures of article assembly and the outer surfaces. Both describe
//! themselves to users through [`ErrorMetadata`].

/// Level a failure should be logged at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Warn,
    Error,
}

/// How an error is presented to the person who caused it.
pub trait ErrorMetadata {
    /// Stable machine-readable code, e.g. `EXTRACTION_FAILED`
    fn error_code(&self) -> &'static str;

    /// Retrying the same input may succeed
    fn is_recoverable(&self) -> bool;

    fn suggested_action(&self) -> Option<&'static str>;

    /// Message safe to show in the UI
    fn client_message(&self) -> String;

    fn log_level(&self) -> LogLevel;
}

/// Failures of the ingestion pipeline.
///
/// Content-track variants never affect the storage track, and
/// `StorageUnavailable` never affects the content track.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("Unsupported format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("File too large: {size} bytes (max: {max} bytes)")]
    PayloadTooLarge { size: usize, max: usize },

    #[error("Empty file")]
    EmptyFile,

    #[error("Extraction failed: {reason}")]
    ExtractionFailed { reason: String },

    #[error("Normalization failed: {0}")]
    NormalizationFailed(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),
}

const MANUAL_ENTRY: &str = "Enter the article text manually";

impl IngestError {
    pub fn extraction(reason: impl Into<String>) -> Self {
        IngestError::ExtractionFailed {
            reason: reason.into(),
        }
    }

    pub fn unsupported(extension: impl Into<String>) -> Self {
        IngestError::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// True for failures detected before any extractor ran.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            IngestError::UnsupportedFormat { .. }
                | IngestError::PayloadTooLarge { .. }
                | IngestError::EmptyFile
        )
    }
}

impl ErrorMetadata for IngestError {
    fn error_code(&self) -> &'static str {
        match self {
            IngestError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            IngestError::PayloadTooLarge { .. } => "PAYLOAD_TOO_LARGE",
            IngestError::EmptyFile => "EMPTY_FILE",
            IngestError::ExtractionFailed { .. } => "EXTRACTION_FAILED",
            IngestError::NormalizationFailed(_) => "NORMALIZATION_FAILED",
            IngestError::StorageUnavailable(_) => "STORAGE_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, IngestError::StorageUnavailable(_))
    }

    fn suggested_action(&self) -> Option<&'static str> {
        Some(match self {
            IngestError::UnsupportedFormat { .. } => {
                "Upload a .txt, .rtf, .doc, .docx, .odt or .pdf file"
            }
            IngestError::PayloadTooLarge { .. } => "Reduce file size or split the document",
            IngestError::EmptyFile => "Choose a non-empty file",
            IngestError::ExtractionFailed { .. } | IngestError::NormalizationFailed(_) => {
                MANUAL_ENTRY
            }
            IngestError::StorageUnavailable(_) => "Retry the upload later",
        })
    }

    fn client_message(&self) -> String {
        match self {
            IngestError::UnsupportedFormat { extension } if extension.is_empty() => {
                "File has no extension".to_string()
            }
            IngestError::UnsupportedFormat { extension } => {
                format!("Files of type .{} are not supported", extension)
            }
            IngestError::PayloadTooLarge { max, .. } => {
                format!("File exceeds the {} MB limit", max / (1024 * 1024))
            }
            IngestError::EmptyFile => "File is empty".to_string(),
            IngestError::ExtractionFailed { .. } | IngestError::NormalizationFailed(_) => {
                "Could not process this file, try manual text entry".to_string()
            }
            IngestError::StorageUnavailable(_) => {
                "The original file could not be saved".to_string()
            }
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            _ if self.is_rejection() => LogLevel::Debug,
            IngestError::ExtractionFailed { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("{0:#}")]
    Internal(#[from] anyhow::Error),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::InvalidInput(format!("Validation error: {}", err))
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        match self {
            AppError::Ingest(inner) => inner.error_code(),
            AppError::InvalidInput(_) => "INVALID_INPUT",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            AppError::Ingest(inner) => inner.is_recoverable(),
            AppError::InvalidInput(_) => false,
            AppError::Internal(_) => true,
        }
    }

    fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Ingest(inner) => inner.suggested_action(),
            AppError::InvalidInput(_) => Some("Check the form fields and try again"),
            AppError::Internal(_) => None,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Ingest(inner) => inner.client_message(),
            AppError::InvalidInput(msg) => msg.clone(),
            AppError::Internal(_) => "Internal error".to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::Ingest(inner) => inner.log_level(),
            AppError::InvalidInput(_) => LogLevel::Debug,
            AppError::Internal(_) => LogLevel::Error,
        }
    }
}
