use serde::{Deserialize, Serialize};

use super::document::DocumentKind;

/// A file selected for ingestion.
#[derive(Debug, Clone)]
pub struct UploadRequest {
    pub data: Vec<u8>,
    pub original_filename: String,
    /// Last dot-segment of the filename, lowercased; empty when there is none.
    pub extension: String,
}

impl UploadRequest {
    pub fn new(original_filename: impl Into<String>, data: Vec<u8>) -> Self {
        let original_filename = original_filename.into();
        let extension = declared_extension(&original_filename);
        Self {
            data,
            original_filename,
            extension,
        }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Extension of the final path component: everything after its last dot.
///
/// `"report.final.DOCX"` gives `"docx"`, `".txt"` gives `"txt"`, `"README"` and
/// `"notes."` give `""`.
pub fn declared_extension(filename: &str) -> String {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    match name.rsplit_once('.') {
        Some((_, extension)) => extension.to_lowercase(),
        None => String::new(),
    }
}

/// An image pulled out of a document, ready for transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedImage {
    /// Position in emission order; the markup refers to it via `data-image-index`
    pub index: usize,
    pub media_type: String,
    /// Payload, standard base64 alphabet
    pub data: String,
}

impl ExtractedImage {
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.decode(&self.data)
    }
}

/// Restricted HTML plus the images it references by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub html: String,
    pub images: Vec<ExtractedImage>,
}

/// Result of one upload: normalized content plus, when the raw-file track
/// succeeded, where the original can be downloaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestionResult {
    pub html: String,
    pub images: Vec<ExtractedImage>,
    pub file_url: Option<String>,
    pub file_name: String,
    pub file_type: DocumentKind,
}

impl IngestionResult {
    /// Text content without markup: one line per paragraph or table cell,
    /// entities decoded.
    pub fn plain_text(&self) -> String {
        html_to_text(&self.html)
    }

    /// First non-empty line of the plain text, cut to `max_chars` characters.
    pub fn excerpt(&self, max_chars: usize) -> String {
        let text = self.plain_text();
        let first = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("");
        if first.chars().count() <= max_chars {
            return first.to_string();
        }
        let mut cut: String = first.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }

    /// Content type of the raw file, for the draft's file reference.
    pub fn content_type(&self) -> &'static str {
        self.file_type.content_type()
    }
}

fn html_to_text(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while let Some(open) = rest.find('<') {
        out.push_str(&decode_entities(&rest[..open]));
        let Some(close) = rest[open..].find('>') else {
            rest = "";
            break;
        };
        let tag = &rest[open + 1..open + close];
        if matches!(tag, "/p" | "/td" | "/tr") && !out.ends_with('\n') && !out.is_empty() {
            out.push('\n');
        }
        rest = &rest[open + close + 1..];
    }
    out.push_str(&decode_entities(rest));
    out.trim_end().to_string()
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}
