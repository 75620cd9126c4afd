//! Format extractors: raw bytes to the intermediate block model.
//!
//! Each supported format has one extractor. They are synchronous and CPU
//! bound; the orchestrator runs them on the blocking pool.

mod builder;
pub mod doc;
pub mod docx;
mod media;
pub mod odt;
mod package;
pub mod pdf;
pub mod rtf;
pub mod text;

use pedlab_core::models::{DocumentBlock, DocumentKind};
use pedlab_core::IngestError;

pub use doc::DocExtractor;
pub use docx::DocxExtractor;
pub use odt::OdtExtractor;
pub use pdf::PdfExtractor;
pub use rtf::RtfExtractor;
pub use text::TextExtractor;

pub trait Extractor: Send + Sync {
    fn kind(&self) -> DocumentKind;

    /// Convert the document into blocks in reading order.
    ///
    /// Either the full sequence or an error; never a truncated sequence.
    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError>;
}

pub fn extractor_for(kind: DocumentKind) -> &'static dyn Extractor {
    match kind {
        DocumentKind::Txt => &TextExtractor,
        DocumentKind::Rtf => &RtfExtractor,
        DocumentKind::Doc => &DocExtractor,
        DocumentKind::Docx => &DocxExtractor,
        DocumentKind::Odt => &OdtExtractor,
        DocumentKind::Pdf => &PdfExtractor,
    }
}

/// Run the extractor for `kind`, failing when the document yields nothing.
pub fn extract(kind: DocumentKind, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
    let start = std::time::Instant::now();
    let blocks = extractor_for(kind).extract(data)?;

    if blocks.is_empty() {
        return Err(IngestError::extraction(
            "document contains no extractable content",
        ));
    }

    tracing::debug!(
        kind = %kind,
        size_bytes = data.len(),
        blocks = blocks.len(),
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Document extracted"
    );

    Ok(blocks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_has_matching_extractor() {
        for kind in DocumentKind::ALL {
            assert_eq!(extractor_for(kind).kind(), kind);
        }
    }

    #[test]
    fn empty_extraction_is_an_error() {
        let err = extract(DocumentKind::Txt, b"\n\n  \n").unwrap_err();
        assert_eq!(
            err,
            IngestError::extraction("document contains no extractable content")
        );
    }
}
