use pedlab_core::constants::ALLOWED_EXTENSIONS;
use pedlab_core::models::{declared_extension, DocumentKind, UploadRequest};
use pedlab_core::IngestError;

/// Validation errors raised before any extractor runs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: usize, max: usize },

    #[error("Invalid file extension: {extension} (allowed: {allowed:?})")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("Invalid filename: {0}")]
    InvalidFilename(String),

    #[error("Empty file")]
    EmptyFile,
}

impl From<ValidationError> for IngestError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::FileTooLarge { size, max } => {
                IngestError::PayloadTooLarge { size, max }
            }
            ValidationError::InvalidExtension { extension, .. } => {
                IngestError::UnsupportedFormat { extension }
            }
            ValidationError::InvalidFilename(_) => IngestError::UnsupportedFormat {
                extension: String::new(),
            },
            ValidationError::EmptyFile => IngestError::EmptyFile,
        }
    }
}

/// Determine the document kind from a filename.
///
/// The extension is the last dot-segment, compared case-insensitively. No
/// magic-byte sniffing: a renamed binary is handed to the extractor its
/// extension names.
pub fn sniff(filename: &str) -> Result<DocumentKind, IngestError> {
    kind_for_extension(&declared_extension(filename), filename).map_err(IngestError::from)
}

fn kind_for_extension(extension: &str, filename: &str) -> Result<DocumentKind, ValidationError> {
    if extension.is_empty() {
        return Err(ValidationError::InvalidFilename(filename.to_string()));
    }

    DocumentKind::from_extension(extension).ok_or_else(|| ValidationError::InvalidExtension {
        extension: extension.to_string(),
        allowed: ALLOWED_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
    })
}

/// Upload validator: size limits plus the extension allow-list.
#[derive(Debug, Clone)]
pub struct FormatSniffer {
    max_file_size: usize,
}

impl FormatSniffer {
    pub fn new(max_file_size: usize) -> Self {
        Self { max_file_size }
    }

    pub fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    /// Validate file size
    pub fn validate_file_size(&self, size: usize) -> Result<(), ValidationError> {
        if size == 0 {
            return Err(ValidationError::EmptyFile);
        }

        if size > self.max_file_size {
            return Err(ValidationError::FileTooLarge {
                size,
                max: self.max_file_size,
            });
        }

        Ok(())
    }

    /// Validate the declared extension against the allow-list
    pub fn validate_extension(&self, request: &UploadRequest) -> Result<DocumentKind, ValidationError> {
        kind_for_extension(&request.extension, &request.original_filename)
    }

    /// Run every check; the extension is checked first so an unsupported
    /// file is reported as such even when it is also empty or oversized.
    pub fn validate_all(&self, request: &UploadRequest) -> Result<DocumentKind, ValidationError> {
        let kind = self.validate_extension(request)?;
        self.validate_file_size(request.size())?;
        Ok(kind)
    }
}
