//! Shared key generation for storage backends.
//!
//! Key format: `articles/{8 hex digits}_{sanitized filename}`.

use crate::traits::{StorageError, StorageResult};
use pedlab_core::constants::RAW_FILE_PREFIX;
use uuid::Uuid;

/// Leaves room for the id prefix and the `.part` suffix of a local write
/// within a 255-byte path component.
const MAX_FILENAME_BYTES: usize = 240;

/// Generate a storage key for a raw uploaded document.
///
/// The random prefix keeps repeated uploads of the same name apart.
pub fn generate_raw_file_key(filename: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}/{}_{}", RAW_FILE_PREFIX, &id[..8], sanitize_filename(filename))
}

/// Reject keys that are empty, absolute, or could leave the key space.
pub fn validate_key(key: &str) -> StorageResult<()> {
    let bad_segment = key
        .split('/')
        .any(|segment| segment.is_empty() || segment == "." || segment == "..");
    if key.starts_with('/') || key.contains('\\') || key.contains('\0') || bad_segment {
        return Err(StorageError::InvalidKey(key.to_string()));
    }
    Ok(())
}

/// Reduce a user-supplied filename to a safe key segment.
///
/// Keeps alphanumerics (any script), `.`, `-` and `_`; everything else
/// becomes `_`. Path components are dropped, `..` never survives, and an
/// empty result falls back to `file`.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);

    let mut sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    while sanitized.contains("..") {
        sanitized = sanitized.replace("..", ".");
    }
    let sanitized = sanitized.trim_start_matches('.');

    let mut sanitized = shorten(sanitized, MAX_FILENAME_BYTES);
    if sanitized.is_empty() {
        sanitized.push_str("file");
    }
    sanitized
}

/// Cut `name` to at most `max` bytes on a char boundary, keeping a short
/// extension intact.
fn shorten(name: &str, max: usize) -> String {
    if name.len() <= max {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() < max / 4 => {
            format!("{}.{}", prefix_within(stem, max - ext.len() - 1), ext)
        }
        _ => prefix_within(name, max).to_string(),
    }
}

fn prefix_within(s: &str, max: usize) -> &str {
    let mut end = max.min(s.len());
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_has_prefix_and_short_id() {
        let key = generate_raw_file_key("План урока.docx");
        let rest = key.strip_prefix("articles/").unwrap();
        let (id, name) = rest.split_once('_').unwrap();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(name, "План_урока.docx");
    }

    #[test]
    fn generated_keys_are_valid() {
        assert!(validate_key(&generate_raw_file_key("../x/../../y.pdf")).is_ok());
    }

    #[test]
    fn validate_key_rejects_escapes() {
        for key in ["", "/etc/passwd", "articles/../x", "a//b", "a\\b", "./a"] {
            assert!(validate_key(key).is_err(), "{:?}", key);
        }
        assert!(validate_key("articles/0a1b2c3d_plan.docx").is_ok());
    }

    #[test]
    fn sanitize_blocks_traversal() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("a..b.txt"), "a.b.txt");
        assert_eq!(sanitize_filename("..hidden"), "hidden");
        assert_eq!(sanitize_filename(""), "file");
        assert_eq!(sanitize_filename("C:\\Users\\me\\notes.rtf"), "notes.rtf");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), MAX_FILENAME_BYTES);
    }

    #[test]
    fn long_names_are_cut_by_bytes() {
        let name = format!("{}.docx", "Методика".repeat(30));
        let sanitized = sanitize_filename(&name);
        assert!(sanitized.len() <= MAX_FILENAME_BYTES, "{}", sanitized.len());
        assert!(sanitized.starts_with("Методика"));
        assert!(sanitized.ends_with(".docx"));

        let key = generate_raw_file_key(&name);
        let segment = key.rsplit('/').next().unwrap();
        assert!(segment.len() + ".part".len() <= 255);
    }
}
