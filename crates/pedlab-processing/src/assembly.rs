//! Article assembly: draft form fields plus an optional ingestion result
//! merged into the article store's create payload.

use pedlab_core::constants::{DEFAULT_AUTHOR, DEFAULT_CATEGORY};
use pedlab_core::models::{CreateArticleRequest, IngestionResult};
use pedlab_core::AppError;
use validator::Validate;

/// Excerpt length used when the draft leaves the excerpt blank
pub const EXCERPT_CHARS: usize = 200;

/// Where the article body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContentMode {
    /// Only typed text
    #[default]
    Typed,
    /// Ingested HTML wins over typed text
    Structured,
    /// The text was edited after ingestion; the HTML is discarded
    ManualOverride,
}

/// Article form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleDraft {
    pub title: String,
    pub excerpt: String,
    pub author: String,
    pub category: String,
    text: String,
    mode: ContentMode,
}

impl ArticleDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn mode(&self) -> ContentMode {
        self.mode
    }

    /// A new ingestion result is available; its HTML becomes the content.
    pub fn attach_ingestion(&mut self) {
        self.mode = ContentMode::Structured;
    }

    /// User typed into the content field. After an ingestion this switches
    /// to the typed text for good.
    pub fn edit_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
        if self.mode == ContentMode::Structured {
            self.mode = ContentMode::ManualOverride;
            tracing::warn!(
                policy = "MergeConflict",
                "Typed text replaces ingested content"
            );
        }
    }
}

fn or_default(value: &str, default: &str) -> String {
    match value.trim() {
        "" => default.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn first_line(text: &str, max_chars: usize) -> String {
    let line = text
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("");
    if line.chars().count() <= max_chars {
        line.to_string()
    } else {
        let mut cut: String = line.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

/// Build the create-article payload.
///
/// Ingested HTML is used unless the draft is in manual override or the HTML
/// is empty. The raw-file reference is attached whenever the storage track
/// produced a URL, independent of which content wins.
pub fn assemble(
    draft: &ArticleDraft,
    ingestion: Option<&IngestionResult>,
) -> Result<CreateArticleRequest, AppError> {
    let structured = match (draft.mode, ingestion) {
        (ContentMode::ManualOverride, _) => None,
        (_, Some(result)) if !result.html.trim().is_empty() => Some(result),
        _ => None,
    };

    let content = match structured {
        Some(result) => result.html.clone(),
        None => draft.text.trim().to_string(),
    };

    let excerpt = match draft.excerpt.trim() {
        "" => match structured {
            Some(result) => result.excerpt(EXCERPT_CHARS),
            None => first_line(&draft.text, EXCERPT_CHARS),
        },
        excerpt => excerpt.to_string(),
    };

    let stored = ingestion.filter(|result| result.file_url.is_some());

    let request = CreateArticleRequest {
        title: draft.title.trim().to_string(),
        excerpt,
        content,
        author: or_default(&draft.author, DEFAULT_AUTHOR),
        category: or_default(&draft.category, DEFAULT_CATEGORY),
        file_url: stored.and_then(|result| result.file_url.clone()),
        file_name: stored.map(|result| result.file_name.clone()),
        file_type: stored.map(|result| result.content_type().to_string()),
    };

    request.validate()?;
    Ok(request)
}
