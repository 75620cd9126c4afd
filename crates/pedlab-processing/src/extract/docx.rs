//! DOCX extractor: walks `word/document.xml` and resolves images through the
//! document relationships.

use super::builder::BlockBuilder;
use super::media::detect_media_type;
use super::package::{attr_val, open_package, read_entry, read_xml_entry, resolve_path, Package};
use super::Extractor;
use pedlab_core::models::{DocumentBlock, DocumentKind, EmbeddedImage, InlineStyle};
use pedlab_core::IngestError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use tracing::debug;

const DOCUMENT_PART: &str = "word/document.xml";
const RELATIONSHIPS_PART: &str = "word/_rels/document.xml.rels";

pub struct DocxExtractor;

impl Extractor for DocxExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Docx
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
        let mut package = open_package(data)?;
        let document = read_xml_entry(&mut package, DOCUMENT_PART)?
            .ok_or_else(|| IngestError::extraction("missing word/document.xml"))?;
        let relationships = match read_xml_entry(&mut package, RELATIONSHIPS_PART)? {
            Some(xml) => parse_relationships(&xml)?,
            None => HashMap::new(),
        };

        let mut walker = DocxWalker {
            package,
            relationships,
            builder: BlockBuilder::new(),
            run_style: InlineStyle::PLAIN,
            in_paragraph_props: false,
            in_text: false,
            in_drawing: false,
            drawing_has_image: false,
            fallback_depth: 0,
        };
        walker.walk(&document)?;
        Ok(walker.builder.finish())
    }
}

/// Relationship id to package-relative target, internal targets only.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>, IngestError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut relationships = HashMap::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"Relationship" => {
                if attr_val(&e, b"TargetMode").as_deref() == Some("External") {
                    continue;
                }
                if let (Some(id), Some(target)) = (attr_val(&e, b"Id"), attr_val(&e, b"Target")) {
                    relationships.insert(id, target);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IngestError::extraction(format!(
                    "malformed {}: {}",
                    RELATIONSHIPS_PART, e
                )))
            }
            _ => {}
        }
    }

    Ok(relationships)
}

/// `w:b`, `w:i` and `w:u` are on unless `w:val` switches them off.
fn toggle_value(e: &BytesStart<'_>) -> bool {
    match attr_val(e, b"w:val") {
        Some(value) => !matches!(value.as_str(), "0" | "false" | "off" | "none"),
        None => true,
    }
}

struct DocxWalker<'a> {
    package: Package<'a>,
    relationships: HashMap<String, String>,
    builder: BlockBuilder,
    run_style: InlineStyle,
    in_paragraph_props: bool,
    in_text: bool,
    in_drawing: bool,
    drawing_has_image: bool,
    fallback_depth: usize,
}

impl DocxWalker<'_> {
    fn walk(&mut self, xml: &str) -> Result<(), IngestError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        let mut buf = Vec::new();

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) => self.start(&e)?,
                Ok(Event::Empty(e)) => {
                    self.start(&e)?;
                    self.end(e.name().as_ref());
                }
                Ok(Event::End(e)) => self.end(e.name().as_ref()),
                Ok(Event::Text(t)) => {
                    if self.in_text && self.fallback_depth == 0 {
                        let text = t.unescape().map_err(|e| {
                            IngestError::extraction(format!("malformed {}: {}", DOCUMENT_PART, e))
                        })?;
                        self.builder.push_text(&text, self.run_style);
                    }
                }
                Ok(Event::CData(t)) => {
                    if self.in_text && self.fallback_depth == 0 {
                        self.builder
                            .push_text(&String::from_utf8_lossy(&t), self.run_style);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(IngestError::extraction(format!(
                        "malformed {}: {}",
                        DOCUMENT_PART, e
                    )))
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<(), IngestError> {
        let name = e.name();
        let name = name.as_ref();

        // mc:Fallback repeats the mc:Choice content in legacy markup
        if self.fallback_depth > 0 {
            if name == b"mc:Fallback" {
                self.fallback_depth += 1;
            }
            return Ok(());
        }

        match name {
            b"mc:Fallback" => self.fallback_depth = 1,
            b"w:pPr" => self.in_paragraph_props = true,
            b"w:r" => self.run_style = InlineStyle::PLAIN,
            b"w:b" if !self.in_paragraph_props => self.run_style.bold = toggle_value(e),
            b"w:i" if !self.in_paragraph_props => self.run_style.italic = toggle_value(e),
            b"w:u" if !self.in_paragraph_props => self.run_style.underline = toggle_value(e),
            b"w:rStyle" if !self.in_paragraph_props => {
                if let Some(style) = attr_val(e, b"w:val") {
                    if style.contains("Strong") {
                        self.run_style.bold = true;
                    }
                    if style.contains("Emphasis") {
                        self.run_style.italic = true;
                    }
                }
            }
            b"w:t" => self.in_text = true,
            b"w:tab" if !self.in_paragraph_props => self.builder.push_text("\t", self.run_style),
            b"w:br" | b"w:cr" => self.builder.push_text("\n", self.run_style),
            b"w:noBreakHyphen" => self.builder.push_text("-", self.run_style),
            b"w:tbl" => self.builder.begin_table(),
            b"w:tr" => self.builder.begin_row(),
            b"w:tc" => self.builder.begin_cell(),
            b"w:drawing" | b"w:pict" | b"w:object" => {
                self.in_drawing = true;
                self.drawing_has_image = false;
            }
            b"a:blip" if self.in_drawing && !self.drawing_has_image => {
                if let Some(id) = attr_val(e, b"r:embed") {
                    self.place_image(&id)?;
                }
            }
            b"v:imagedata" if self.in_drawing && !self.drawing_has_image => {
                if let Some(id) = attr_val(e, b"r:id") {
                    self.place_image(&id)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        if self.fallback_depth > 0 {
            if name == b"mc:Fallback" {
                self.fallback_depth -= 1;
            }
            return;
        }

        match name {
            b"w:p" => self.builder.end_paragraph(),
            b"w:pPr" => self.in_paragraph_props = false,
            b"w:t" => self.in_text = false,
            b"w:tc" => self.builder.end_cell(),
            b"w:tr" => self.builder.end_row(),
            b"w:tbl" => self.builder.end_table(),
            b"w:drawing" | b"w:pict" | b"w:object" => self.in_drawing = false,
            _ => {}
        }
    }

    /// Unknown relationship ids are external links and are skipped; an
    /// internal target that cannot be read fails the extraction.
    fn place_image(&mut self, id: &str) -> Result<(), IngestError> {
        let Some(target) = self.relationships.get(id) else {
            debug!(relationship = %id, "Image relationship not found");
            return Ok(());
        };
        let path = resolve_path("word", target);

        let data = read_entry(&mut self.package, &path)?.ok_or_else(|| {
            IngestError::extraction(format!("image part {} missing from package", path))
        })?;

        match detect_media_type(&path, &data) {
            Some(media_type) => {
                self.builder.push_image(EmbeddedImage {
                    reference_id: id.to_string(),
                    data,
                    media_type: media_type.to_string(),
                });
                self.drawing_has_image = true;
            }
            None => debug!(path = %path, "Skipping DOCX image with unknown media type"),
        }
        Ok(())
    }
}
