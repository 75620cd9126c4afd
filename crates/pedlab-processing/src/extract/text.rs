//! Plain text extractor.

use super::Extractor;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1251};
use pedlab_core::models::{DocumentBlock, DocumentKind};
use pedlab_core::IngestError;
use std::borrow::Cow;

pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Txt
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
        let text = decode_text(data);
        Ok(split_paragraphs(&text)
            .into_iter()
            .map(DocumentBlock::paragraph)
            .collect())
    }
}

/// Decode text bytes: a BOM wins, then strict UTF-8, then Windows-1251 for
/// legacy Cyrillic files.
pub(crate) fn decode_text(data: &[u8]) -> Cow<'_, str> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(data) {
        let (text, _) = encoding.decode_without_bom_handling(&data[bom_len..]);
        return text;
    }

    match std::str::from_utf8(data) {
        Ok(text) => Cow::Borrowed(text),
        Err(_) => {
            let (text, had_errors) = WINDOWS_1251.decode_without_bom_handling(data);
            if had_errors {
                tracing::debug!("Windows-1251 fallback hit unmappable bytes");
                return UTF_8.decode_without_bom_handling(data).0;
            }
            text
        }
    }
}

/// One paragraph per blank-line-delimited group; single newlines stay.
pub(crate) fn split_paragraphs(text: &str) -> Vec<String> {
    let normalized = text.replace("\r\n", "\n").replace('\r', "\n");

    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in normalized.split('\n') {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join("\n").trim().to_string());
                current.clear();
            }
        } else {
            current.push(line.trim_end());
        }
    }
    if !current.is_empty() {
        paragraphs.push(current.join("\n").trim().to_string());
    }

    paragraphs
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(blocks: &[DocumentBlock]) -> Vec<String> {
        blocks
            .iter()
            .map(|block| match block {
                DocumentBlock::Paragraph(p) => p.text(),
                other => panic!("unexpected block {:?}", other),
            })
            .collect()
    }

    #[test]
    fn splits_on_blank_lines_only() {
        let blocks = TextExtractor
            .extract(b"first line\nsecond line\r\n\r\n  \nnext paragraph\n")
            .unwrap();
        assert_eq!(texts(&blocks), vec!["first line\nsecond line", "next paragraph"]);
    }

    #[test]
    fn strips_utf8_bom() {
        let blocks = TextExtractor.extract(b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(texts(&blocks), vec!["hello"]);
    }

    #[test]
    fn decodes_utf16le_with_bom() {
        let mut data = vec![0xFF, 0xFE];
        for unit in "Привет".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        let blocks = TextExtractor.extract(&data).unwrap();
        assert_eq!(texts(&blocks), vec!["Привет"]);
    }

    #[test]
    fn falls_back_to_windows_1251() {
        let (encoded, _, _) = WINDOWS_1251.encode("Урок математики");
        let blocks = TextExtractor.extract(&encoded).unwrap();
        assert_eq!(texts(&blocks), vec!["Урок математики"]);
    }
}
