//! Media type detection for embedded images.

/// Media type from an archive path's extension.
pub(crate) fn media_type_for_path(path: &str) -> Option<&'static str> {
    let extension = path.rsplit_once('.')?.1.to_ascii_lowercase();
    let media_type = match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" | "jpe" => "image/jpeg",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "emf" => "image/emf",
        "wmf" => "image/wmf",
        _ => return None,
    };
    Some(media_type)
}

/// Media type from the payload's signature.
pub(crate) fn sniff_image(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some("image/png")
    } else if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("image/jpeg")
    } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        Some("image/gif")
    } else if data.starts_with(b"BM") {
        Some("image/bmp")
    } else if data.starts_with(b"II*\0") || data.starts_with(b"MM\0*") {
        Some("image/tiff")
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some("image/webp")
    } else {
        None
    }
}

/// Prefer the payload signature, fall back to the path.
pub(crate) fn detect_media_type(path: &str, data: &[u8]) -> Option<&'static str> {
    sniff_image(data).or_else(|| media_type_for_path(path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_by_signature_then_extension() {
        assert_eq!(
            detect_media_type("media/image1.bin", &[0xFF, 0xD8, 0xFF, 0xE0]),
            Some("image/jpeg")
        );
        assert_eq!(detect_media_type("Pictures/a.SVG", b"<svg"), Some("image/svg+xml"));
        assert_eq!(detect_media_type("media/blob", b"????"), None);
    }
}
