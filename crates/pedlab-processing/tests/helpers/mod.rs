//! Test helpers: in-memory document fixtures and raw-file store doubles.
//!
//! Run from workspace root: `cargo test -p pedlab-processing --test ingestion_test`.

#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use pedlab_processing::{FormatSniffer, IngestionOrchestrator};
use std::sync::Arc;

/// Upload limit used by the orchestrator in tests.
pub const TEST_MAX_BYTES: usize = 1024 * 1024;

pub fn orchestrator(store: Arc<dyn pedlab_storage::RawFileStore>) -> IngestionOrchestrator {
    IngestionOrchestrator::new(FormatSniffer::new(TEST_MAX_BYTES), store)
}

/// Tags the normalizer is allowed to emit.
pub const ALLOWED_TAGS: &[&str] = &["p", "strong", "em", "u", "table", "tr", "td", "img"];

/// Names of every opening or closing tag in `html`, in order.
pub fn tag_names(html: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = html;
    while let Some(start) = rest.find('<') {
        let tag = &rest[start + 1..];
        let tag = tag.strip_prefix('/').unwrap_or(tag);
        let end = tag
            .find(|c: char| c == '>' || c.is_whitespace())
            .unwrap_or(tag.len());
        names.push(tag[..end].to_string());
        rest = &tag[end..];
    }
    names
}

pub fn count_opening(html: &str, tag: &str) -> usize {
    html.matches(&format!("<{}>", tag)).count() + html.matches(&format!("<{} ", tag)).count()
}
