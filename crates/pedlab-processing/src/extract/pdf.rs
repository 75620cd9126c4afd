//! PDF extractor.
//!
//! Text comes per page from lopdf (with pdf-extract as a whole-document
//! fallback). Raster images are read from each page's XObject resources and
//! placed among the page's text lines by the number of text-showing
//! operators that precede their `Do` in the content stream.

use super::text::split_paragraphs;
use super::Extractor;
use image::{GrayImage, ImageFormat, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use pedlab_core::models::{DocumentBlock, DocumentKind, EmbeddedImage};
use pedlab_core::IngestError;
use std::collections::BTreeMap;
use std::io::Cursor;
use tracing::{debug, warn};

const TEXT_OPERATORS: &[&str] = &["Tj", "TJ", "'", "\""];

pub struct PdfExtractor;

impl Extractor for PdfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Pdf
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
        let doc = Document::load_mem(data)
            .map_err(|e| IngestError::extraction(format!("unparsable PDF: {}", e)))?;
        if doc.trailer.get(b"Encrypt").is_ok() {
            return Err(IngestError::extraction(
                "encrypted PDF documents are not supported",
            ));
        }

        let pages = doc
            .get_pages()
            .into_iter()
            .map(|(number, id)| {
                read_page(&doc, number, id).map_err(|reason| {
                    IngestError::extraction(format!("page {}: {}", number, reason))
                })
            })
            .collect::<Result<Vec<PageContent>, IngestError>>()?;

        if pages.iter().all(|page| page.lines.is_empty()) {
            return Ok(fallback_blocks(data, pages));
        }

        let mut blocks = Vec::new();
        for page in pages {
            layout_page(page, &mut blocks);
        }
        Ok(blocks)
    }
}

struct PlacedImage {
    image: EmbeddedImage,
    text_ops_before: usize,
}

struct PageContent {
    lines: Vec<String>,
    text_ops: usize,
    images: Vec<PlacedImage>,
}

/// Text, text operator count and placed images of one page. Any part of the
/// page that cannot be read fails the whole page.
fn read_page(doc: &Document, number: u32, id: ObjectId) -> Result<PageContent, String> {
    // lopdf skips content references it cannot resolve
    for stream_id in doc.get_page_contents(id) {
        doc.get_object(stream_id)
            .and_then(Object::as_stream)
            .map_err(|e| {
                format!(
                    "content stream {} {} unreadable: {}",
                    stream_id.0, stream_id.1, e
                )
            })?;
    }

    let text = doc
        .extract_text(&[number])
        .map_err(|e| format!("text extraction failed: {}", e))?;
    let mut lines: Vec<String> = text
        .replace("\r\n", "\n")
        .split('\n')
        .map(|line| line.trim_end().to_string())
        .collect();
    while lines.last().is_some_and(|line| line.trim().is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|line| line.trim().is_empty()) {
        lines.remove(0);
    }

    let operations = doc
        .get_and_decode_page_content(id)
        .map_err(|e| format!("content stream undecodable: {}", e))?
        .operations;

    let xobjects = page_xobjects(doc, id)?;
    let mut text_ops = 0;
    let mut images = Vec::new();
    for operation in &operations {
        if TEXT_OPERATORS.contains(&operation.operator.as_str()) {
            text_ops += 1;
        } else if operation.operator == "Do" {
            let Some(name) = operation.operands.first().and_then(|o| o.as_name().ok()) else {
                continue;
            };
            let Some(&object_id) = xobjects.get(name) else {
                continue;
            };
            if let Some(image) = read_image(doc, object_id)? {
                images.push(PlacedImage {
                    image,
                    text_ops_before: text_ops,
                });
            }
        }
    }

    Ok(PageContent {
        lines,
        text_ops,
        images,
    })
}

/// Emit a page: its lines split at image positions and blank lines.
fn layout_page(page: PageContent, blocks: &mut Vec<DocumentBlock>) {
    let line_count = page.lines.len();
    let mut cursor = 0;

    for placed in page.images {
        let position = if page.text_ops == 0 {
            line_count
        } else {
            ((placed.text_ops_before * line_count) as f64 / page.text_ops as f64).round() as usize
        }
        .clamp(cursor, line_count);

        push_paragraphs(&page.lines[cursor..position], blocks);
        blocks.push(DocumentBlock::Image(placed.image));
        cursor = position;
    }
    push_paragraphs(&page.lines[cursor..], blocks);
}

fn push_paragraphs(lines: &[String], blocks: &mut Vec<DocumentBlock>) {
    if lines.is_empty() {
        return;
    }
    blocks.extend(
        split_paragraphs(&lines.join("\n"))
            .into_iter()
            .map(DocumentBlock::paragraph),
    );
}

/// lopdf found no text at all: try pdf-extract on the whole document and
/// append the images after the recovered text.
fn fallback_blocks(data: &[u8], pages: Vec<PageContent>) -> Vec<DocumentBlock> {
    let mut blocks = Vec::new();

    match std::panic::catch_unwind(|| pdf_extract::extract_text_from_mem(data)) {
        Ok(Ok(text)) => {
            blocks.extend(
                split_paragraphs(&text)
                    .into_iter()
                    .map(DocumentBlock::paragraph),
            );
        }
        Ok(Err(e)) => warn!(error = %e, "pdf-extract failed on PDF without lopdf text"),
        Err(_) => warn!("pdf-extract panicked on PDF without lopdf text"),
    }

    for page in pages {
        blocks.extend(page.images.into_iter().map(|p| DocumentBlock::Image(p.image)));
    }
    blocks
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Option<&'a Object> {
    match object {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// XObject names visible from a page, including inherited resources.
fn page_xobjects(
    doc: &Document,
    page_id: ObjectId,
) -> Result<BTreeMap<Vec<u8>, ObjectId>, String> {
    let (inline, referenced) = doc
        .get_page_resources(page_id)
        .map_err(|e| format!("resources unreadable: {}", e))?;
    let mut dictionaries: Vec<&Dictionary> = inline.into_iter().collect();
    dictionaries.extend(
        referenced
            .into_iter()
            .filter_map(|id| doc.get_dictionary(id).ok()),
    );

    let mut xobjects = BTreeMap::new();
    for resources in dictionaries {
        let Some(entries) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| resolve(doc, o))
            .and_then(|o| o.as_dict().ok())
        else {
            continue;
        };
        for (name, object) in entries.iter() {
            if let Object::Reference(id) = object {
                xobjects.entry(name.clone()).or_insert(*id);
            }
        }
    }
    Ok(xobjects)
}

/// `Ok(None)` for form XObjects and image encodings that are not carried
/// over; a dangling reference is an error.
fn read_image(doc: &Document, id: ObjectId) -> Result<Option<EmbeddedImage>, String> {
    let object = doc
        .get_object(id)
        .map_err(|e| format!("XObject {} {} unreadable: {}", id.0, id.1, e))?;
    let Ok(stream) = object.as_stream() else {
        return Ok(None);
    };
    let is_image = stream
        .dict
        .get(b"Subtype")
        .and_then(Object::as_name)
        .is_ok_and(|subtype| subtype == b"Image");
    if !is_image {
        return Ok(None);
    }

    let Some((data, media_type)) = decode_image(doc, stream) else {
        debug!(object = ?id, "Skipping PDF image with unsupported encoding");
        return Ok(None);
    };
    Ok(Some(EmbeddedImage {
        reference_id: format!("{} {}", id.0, id.1),
        data,
        media_type: media_type.to_string(),
    }))
}

fn filter_names(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(filters)) => filters
            .iter()
            .filter_map(|f| f.as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn decode_image(doc: &Document, stream: &Stream) -> Option<(Vec<u8>, &'static str)> {
    let filters = filter_names(&stream.dict);
    match filters.as_slice() {
        [only] if only.as_slice() == b"DCTDecode" => Some((stream.content.clone(), "image/jpeg")),
        [only] if only.as_slice() == b"JPXDecode" => Some((stream.content.clone(), "image/jp2")),
        [] => encode_png(doc, &stream.dict, stream.content.clone()),
        [only] if only.as_slice() == b"FlateDecode" => {
            let raw = stream.decompressed_content().ok()?;
            encode_png(doc, &stream.dict, raw)
        }
        _ => None,
    }
}

fn color_components(doc: &Document, dict: &Dictionary) -> Option<u32> {
    let color_space = resolve(doc, dict.get(b"ColorSpace").ok()?)?;
    match color_space {
        Object::Name(name) => match name.as_slice() {
            b"DeviceRGB" | b"CalRGB" => Some(3),
            b"DeviceGray" | b"CalGray" => Some(1),
            _ => None,
        },
        Object::Array(items) => {
            let family = items.first()?.as_name().ok()?;
            if family != b"ICCBased" {
                return None;
            }
            let profile = resolve(doc, items.get(1)?)?.as_stream().ok()?;
            match profile.dict.get(b"N").ok()?.as_i64().ok()? {
                3 => Some(3),
                1 => Some(1),
                _ => None,
            }
        }
        _ => None,
    }
}

/// Re-encode 8-bit RGB or grayscale samples as PNG.
fn encode_png(doc: &Document, dict: &Dictionary, mut raw: Vec<u8>) -> Option<(Vec<u8>, &'static str)> {
    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    if dict.get(b"BitsPerComponent").ok()?.as_i64().ok()? != 8 {
        return None;
    }
    let components = color_components(doc, dict)?;

    let expected = (width as usize)
        .checked_mul(height as usize)?
        .checked_mul(components as usize)?;
    if raw.len() < expected {
        return None;
    }
    raw.truncate(expected);

    let mut out = Cursor::new(Vec::new());
    match components {
        3 => RgbImage::from_raw(width, height, raw)?
            .write_to(&mut out, ImageFormat::Png)
            .ok()?,
        _ => GrayImage::from_raw(width, height, raw)?
            .write_to(&mut out, ImageFormat::Png)
            .ok()?,
    }
    Some((out.into_inner(), "image/png"))
}
