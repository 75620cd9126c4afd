use crate::html::bind_image_sources;
use pedlab_core::models::{ExtractedImage, IngestionResult};
use pedlab_core::IngestError;
use pedlab_storage::RawFileStore;
use std::time::Instant;
use tracing::info;

/// File name an extracted image is stored under: `{stem}_image{N}.{ext}`.
pub fn image_file_name(document_name: &str, image: &ExtractedImage) -> String {
    let stem = match document_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => document_name,
    };
    let subtype = image
        .media_type
        .split_once('/')
        .map_or("bin", |(_, subtype)| subtype);
    let extension = match subtype.split('+').next().unwrap_or(subtype) {
        "jpeg" => "jpg",
        "" => "bin",
        other => other,
    };
    format!("{}_image{}.{}", stem, image.index, extension)
}

/// Store every extracted image through `store` and return the result's HTML
/// with `src` bound to the stored URLs. The first image that cannot be
/// decoded or stored fails the whole call.
#[tracing::instrument(
    skip(store, result),
    fields(file_name = %result.file_name, images = result.images.len())
)]
pub async fn host_images(
    store: &dyn RawFileStore,
    result: &IngestionResult,
) -> Result<String, IngestError> {
    if result.images.is_empty() {
        return Ok(result.html.clone());
    }

    let start = Instant::now();
    let mut urls = Vec::with_capacity(result.images.len());
    let mut total_bytes = 0;

    for image in &result.images {
        let data = image.decode().map_err(|e| {
            IngestError::NormalizationFailed(format!("image {} payload: {}", image.index, e))
        })?;
        total_bytes += data.len();
        let stored = store
            .store(data, &image_file_name(&result.file_name, image), &image.media_type)
            .await?;
        urls.push(stored.url);
    }

    info!(
        images = urls.len(),
        size_bytes = total_bytes,
        duration_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Extracted images hosted"
    );

    Ok(bind_image_sources(&result.html, &urls))
}
