//! Helpers shared by the `pedlab` binary: tracing setup, outcome reports
//! and table output.

use pedlab_core::models::{Article, Material, Message};
use pedlab_core::ErrorMetadata;
use pedlab_processing::IngestionOutcome;
use serde_json::{json, Value};
use std::path::Path;

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Final path component, used as the upload's original filename.
pub fn file_name_of(path: &Path) -> anyhow::Result<String> {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .ok_or_else(|| anyhow::anyhow!("Invalid file path: {}", path.display()))
}

/// JSON view of an ingestion outcome: both track phases, the merged result
/// when content is ready, and the messages for whichever track failed.
pub fn outcome_report(outcome: &IngestionOutcome) -> Value {
    let content_error = outcome.content.error();
    json!({
        "file_name": outcome.file_name,
        "file_type": outcome.file_type,
        "status": outcome.status(),
        "can_submit": outcome.status().can_submit(),
        "result": outcome.result(),
        "error": outcome.user_message(),
        "error_code": content_error.map(|e| e.error_code()),
        "hint": content_error.and_then(|e| e.suggested_action()),
        "content_error": content_error.map(ToString::to_string),
        "storage_error": outcome.storage.error().map(ToString::to_string),
    })
}

pub fn articles_table(articles: &[Article]) -> String {
    let mut out = format!(
        "{:<6} {:<40} {:<20} {:<16} {:<16}\n",
        "ID", "Title", "Author", "Category", "Date"
    );
    out.push_str(&"-".repeat(102));
    out.push('\n');
    for article in articles {
        out.push_str(&format!(
            "{:<6} {:<40} {:<20} {:<16} {:<16}\n",
            article.id,
            truncate_string(&article.title, 40),
            truncate_string(article.author.as_deref().unwrap_or(""), 20),
            truncate_string(article.category.as_deref().unwrap_or(""), 16),
            article.date.as_deref().unwrap_or(""),
        ));
    }
    out
}

pub fn materials_table(materials: &[Material]) -> String {
    let mut out = format!(
        "{:<6} {:<40} {:<20} {:<8} {:>9}\n",
        "ID", "Title", "Author", "Type", "Downloads"
    );
    out.push_str(&"-".repeat(87));
    out.push('\n');
    for material in materials {
        out.push_str(&format!(
            "{:<6} {:<40} {:<20} {:<8} {:>9}\n",
            material.id,
            truncate_string(&material.title, 40),
            truncate_string(material.author.as_deref().unwrap_or(""), 20),
            material.file_type.as_deref().unwrap_or(""),
            material.downloads,
        ));
    }
    out
}

pub fn messages_list(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|message| {
            format!(
                "[{}] {}: {}\n",
                message.time.as_deref().unwrap_or("--:--"),
                message.author,
                message.text
            )
        })
        .collect()
}

/// Initialize tracing for CLI binaries.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
