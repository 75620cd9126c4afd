//! ODT extractor: walks `content.xml`, resolving character styles from the
//! automatic styles and `styles.xml`.

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

const CONTENT_PART: &str = "content.xml";
const STYLES_PART: &str = "styles.xml";
const MAX_STYLE_DEPTH: usize = 16;
/// Upper bound for a `text:s` space run.
const MAX_SPACE_RUN: usize = 1024;

/// Content of these elements never reaches the body.
const SKIPPED_ELEMENTS: &[&[u8]] = &[
    b"office:annotation",
    b"text:note",
    b"text:tracked-changes",
    b"table:covered-table-cell",
];

pub struct OdtExtractor;

impl Extractor for OdtExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Odt
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
        let mut package = open_package(data)?;
        let content = read_xml_entry(&mut package, CONTENT_PART)?
            .ok_or_else(|| IngestError::extraction("missing content.xml"))?;

        let mut styles = StyleSheet::default();
        if let Some(xml) = read_xml_entry(&mut package, STYLES_PART)? {
            styles.load(&xml, STYLES_PART)?;
        }
        styles.load(&content, CONTENT_PART)?;

        let mut walker = OdtWalker {
            package,
            styles,
            builder: BlockBuilder::new(),
            style_stack: Vec::new(),
            skip_depth: 0,
            in_frame: false,
            frame_has_image: false,
        };
        walker.walk(&content)?;
        Ok(walker.builder.finish())
    }
}

#[derive(Debug, Clone, Default)]
struct TextStyle {
    bold: Option<bool>,
    italic: Option<bool>,
    underline: Option<bool>,
    parent: Option<String>,
}

#[derive(Debug, Default)]
struct StyleSheet {
    styles: HashMap<String, TextStyle>,
}

impl StyleSheet {
    fn load(&mut self, xml: &str, part: &str) -> Result<(), IngestError> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(true);
        let mut buf = Vec::new();
        let mut current: Option<String> = None;

        loop {
            buf.clear();
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) if e.name().as_ref() == b"style:style" => {
                    current = attr_val(&e, b"style:name");
                    if let Some(name) = &current {
                        self.styles.insert(
                            name.clone(),
                            TextStyle {
                                parent: attr_val(&e, b"style:parent-style-name"),
                                ..TextStyle::default()
                            },
                        );
                    }
                }
                Ok(Event::Empty(e)) if e.name().as_ref() == b"style:style" => {
                    if let Some(name) = attr_val(&e, b"style:name") {
                        self.styles.insert(
                            name,
                            TextStyle {
                                parent: attr_val(&e, b"style:parent-style-name"),
                                ..TextStyle::default()
                            },
                        );
                    }
                }
                Ok(Event::End(e)) if e.name().as_ref() == b"style:style" => current = None,
                Ok(Event::Start(e)) | Ok(Event::Empty(e))
                    if e.name().as_ref() == b"style:text-properties" =>
                {
                    if let Some(style) = current.as_ref().and_then(|n| self.styles.get_mut(n)) {
                        read_text_properties(&e, style);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(IngestError::extraction(format!("malformed {}: {}", part, e)))
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Apply `name` and its ancestors on top of `base`, nearest style last.
    fn apply(&self, name: &str, base: InlineStyle) -> InlineStyle {
        let mut chain = Vec::new();
        let mut next = Some(name);
        while let Some(current) = next {
            if chain.len() >= MAX_STYLE_DEPTH {
                break;
            }
            let Some(style) = self.styles.get(current) else {
                break;
            };
            chain.push(style);
            next = style.parent.as_deref();
        }

        let mut resolved = base;
        for style in chain.iter().rev() {
            if let Some(bold) = style.bold {
                resolved.bold = bold;
            }
            if let Some(italic) = style.italic {
                resolved.italic = italic;
            }
            if let Some(underline) = style.underline {
                resolved.underline = underline;
            }
        }
        resolved
    }
}

fn read_text_properties(e: &BytesStart<'_>, style: &mut TextStyle) {
    if let Some(weight) = attr_val(e, b"fo:font-weight") {
        style.bold = Some(match weight.as_str() {
            "bold" | "bolder" => true,
            "normal" | "lighter" => false,
            numeric => numeric.parse::<u32>().map(|w| w >= 600).unwrap_or(false),
        });
    }
    if let Some(font_style) = attr_val(e, b"fo:font-style") {
        style.italic = Some(matches!(font_style.as_str(), "italic" | "oblique"));
    }
    if let Some(underline) = attr_val(e, b"style:text-underline-style") {
        style.underline = Some(underline != "none");
    }
}

/// Collapse whitespace runs the way ODF text content is rendered.
fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last_space = false;
    for ch in text.chars() {
        if matches!(ch, ' ' | '\t' | '\n' | '\r') {
            if !last_space {
                out.push(' ');
            }
            last_space = true;
        } else {
            out.push(ch);
            last_space = false;
        }
    }
    out
}

struct OdtWalker<'a> {
    package: Package<'a>,
    styles: StyleSheet,
    builder: BlockBuilder,
    style_stack: Vec<InlineStyle>,
    skip_depth: usize,
    in_frame: bool,
    frame_has_image: bool,
}

impl OdtWalker<'_> {
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
                    if self.skip_depth == 0 {
                        if let Some(style) = self.style_stack.last().copied() {
                            let text = t.unescape().map_err(|e| {
                                IngestError::extraction(format!("malformed {}: {}", CONTENT_PART, e))
                            })?;
                            self.builder.push_text(&collapse_whitespace(&text), style);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(IngestError::extraction(format!(
                        "malformed {}: {}",
                        CONTENT_PART, e
                    )))
                }
                _ => {}
            }
        }

        Ok(())
    }

    fn current_style(&self) -> InlineStyle {
        self.style_stack.last().copied().unwrap_or_default()
    }

    fn styled(&self, e: &BytesStart<'_>) -> InlineStyle {
        let base = self.current_style();
        match attr_val(e, b"text:style-name") {
            Some(name) => self.styles.apply(&name, base),
            None => base,
        }
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<(), IngestError> {
        let name = e.name();
        let name = name.as_ref();

        if self.skip_depth > 0 || SKIPPED_ELEMENTS.contains(&name) {
            self.skip_depth += 1;
            return Ok(());
        }

        match name {
            b"text:p" | b"text:h" => {
                // a paragraph nested in a frame closes the enclosing one
                if self.builder.has_pending_text() {
                    self.builder.end_paragraph();
                }
                let style = self.styled(e);
                self.style_stack.push(style);
            }
            b"text:span" | b"text:a" => {
                let style = self.styled(e);
                self.style_stack.push(style);
            }
            b"text:s" => {
                let count = attr_val(e, b"text:c")
                    .and_then(|c| c.parse::<usize>().ok())
                    .unwrap_or(1)
                    .min(MAX_SPACE_RUN);
                self.push_inline(&" ".repeat(count));
            }
            b"text:tab" => self.push_inline("\t"),
            b"text:line-break" => self.push_inline("\n"),
            b"table:table" => self.builder.begin_table(),
            b"table:table-row" => self.builder.begin_row(),
            b"table:table-cell" => self.builder.begin_cell(),
            b"draw:frame" => {
                self.in_frame = true;
                self.frame_has_image = false;
            }
            b"draw:image" if !(self.in_frame && self.frame_has_image) => {
                if let Some(href) = attr_val(e, b"xlink:href") {
                    self.place_image(&href)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8]) {
        if self.skip_depth > 0 {
            self.skip_depth -= 1;
            return;
        }

        match name {
            b"text:p" | b"text:h" => {
                self.builder.end_paragraph();
                self.style_stack.pop();
            }
            b"text:span" | b"text:a" => {
                self.style_stack.pop();
            }
            b"table:table-cell" => self.builder.end_cell(),
            b"table:table-row" => self.builder.end_row(),
            b"table:table" => self.builder.end_table(),
            b"draw:frame" => self.in_frame = false,
            _ => {}
        }
    }

    fn push_inline(&mut self, text: &str) {
        if !self.style_stack.is_empty() {
            let style = self.current_style();
            self.builder.push_text(text, style);
        }
    }

    fn place_image(&mut self, href: &str) -> Result<(), IngestError> {
        if href.contains("://") {
            debug!(href = %href, "Skipping linked ODT image");
            return Ok(());
        }
        let path = resolve_path("", href);

        let data = read_entry(&mut self.package, &path)?.ok_or_else(|| {
            IngestError::extraction(format!("image {} missing from package", path))
        })?;

        match detect_media_type(&path, &data) {
            Some(media_type) => {
                self.builder.push_image(EmbeddedImage {
                    reference_id: path,
                    data,
                    media_type: media_type.to_string(),
                });
                self.frame_has_image = true;
            }
            None => debug!(path = %path, "Skipping ODT image with unknown media type"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::package::build_package;
    use pedlab_core::models::{Paragraph, TextRun};

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 1, 2];

    fn odt(automatic_styles: &str, body: &str) -> Vec<u8> {
        let content = format!(
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<office:document-content xmlns:office="urn:oasis:names:tc:opendocument:xmlns:office:1.0" "#,
                r#"xmlns:text="urn:oasis:names:tc:opendocument:xmlns:text:1.0" "#,
                r#"xmlns:table="urn:oasis:names:tc:opendocument:xmlns:table:1.0" "#,
                r#"xmlns:draw="urn:oasis:names:tc:opendocument:xmlns:drawing:1.0" "#,
                r#"xmlns:xlink="http://www.w3.org/1999/xlink" "#,
                r#"xmlns:style="urn:oasis:names:tc:opendocument:xmlns:style:1.0" "#,
                r#"xmlns:fo="urn:oasis:names:tc:opendocument:xmlns:xsl-fo-compatible:1.0">"#,
                "<office:automatic-styles>{}</office:automatic-styles>",
                "<office:body><office:text>{}</office:text></office:body>",
                "</office:document-content>"
            ),
            automatic_styles, body
        );
        let styles = concat!(
            r#"<office:document-styles><office:styles>"#,
            r#"<style:style style:name="Strong" style:family="text">"#,
            r#"<style:text-properties fo:font-weight="700"/></style:style>"#,
            "</office:styles></office:document-styles>"
        );
        build_package(&[
            ("mimetype", b"application/vnd.oasis.opendocument.text"),
            ("content.xml", content.as_bytes()),
            ("styles.xml", styles.as_bytes()),
            ("Pictures/photo.png", PNG),
        ])
    }

    #[test]
    fn resolves_span_styles_through_parents() {
        let data = odt(
            concat!(
                r#"<style:style style:name="T1" style:family="text" style:parent-style-name="Strong">"#,
                r#"<style:text-properties fo:font-style="italic"/></style:style>"#,
                r#"<style:style style:name="T2" style:family="text">"#,
                r#"<style:text-properties style:text-underline-style="solid"/></style:style>"#
            ),
            concat!(
                r#"<text:p>Hello <text:span text:style-name="T1">world</text:span>"#,
                r#"<text:s text:c="2"/><text:span text:style-name="T2">u</text:span></text:p>"#
            ),
        );
        let blocks = OdtExtractor.extract(&data).unwrap();
        assert_eq!(
            blocks,
            vec![DocumentBlock::Paragraph(Paragraph {
                runs: vec![
                    TextRun::plain("Hello "),
                    TextRun::styled(
                        "world",
                        InlineStyle {
                            bold: true,
                            italic: true,
                            underline: false,
                        }
                    ),
                    TextRun::plain("  "),
                    TextRun::styled(
                        "u",
                        InlineStyle {
                            underline: true,
                            ..InlineStyle::PLAIN
                        }
                    ),
                ]
            })]
        );
    }

    #[test]
    fn flattens_lists_and_skips_annotations() {
        let data = odt(
            "",
            concat!(
                "<text:list><text:list-item><text:p>One</text:p></text:list-item>",
                "<text:list-item><text:p>Two<office:annotation><text:p>note</text:p></office:annotation></text:p></text:list-item>",
                "</text:list><text:h>Heading<text:line-break/>next</text:h>"
            ),
        );
        let blocks = OdtExtractor.extract(&data).unwrap();
        assert_eq!(
            blocks,
            vec![
                DocumentBlock::paragraph("One"),
                DocumentBlock::paragraph("Two"),
                DocumentBlock::paragraph("Heading\nnext"),
            ]
        );
    }

    #[test]
    fn builds_tables_and_ignores_covered_cells() {
        let cell = |text: &str| format!("<table:table-cell><text:p>{}</text:p></table:table-cell>", text);
        let body = format!(
            "<table:table><table:table-column/><table:table-row>{}{}</table:table-row><table:table-row>{}<table:covered-table-cell><text:p>x</text:p></table:covered-table-cell>{}</table:table-row></table:table>",
            cell("A1"),
            cell("B1"),
            cell("A2"),
            cell("B2")
        );
        let blocks = OdtExtractor.extract(&odt("", &body)).unwrap();
        assert_eq!(blocks.len(), 1);
        let DocumentBlock::Table(table) = &blocks[0] else {
            panic!("expected table, got {:?}", blocks[0]);
        };
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|row| row.cells.len() == 2));
        assert_eq!(
            table.rows[1].cells[1].blocks,
            vec![DocumentBlock::paragraph("B2")]
        );
    }

    #[test]
    fn loads_images_from_archive() {
        let data = odt(
            "",
            concat!(
                "<text:p>Before</text:p>",
                r#"<text:p><draw:frame><draw:image xlink:href="Pictures/photo.png"/>"#,
                r#"<draw:image xlink:href="Pictures/photo.png"/></draw:frame></text:p>"#,
                "<text:p>After</text:p>"
            ),
        );
        let blocks = OdtExtractor.extract(&data).unwrap();
        assert_eq!(blocks.len(), 3);
        let DocumentBlock::Image(image) = &blocks[1] else {
            panic!("expected image, got {:?}", blocks[1]);
        };
        assert_eq!(image.reference_id, "Pictures/photo.png");
        assert_eq!(image.media_type, "image/png");
        assert_eq!(blocks[2], DocumentBlock::paragraph("After"));
    }

    #[test]
    fn missing_content_fails() {
        let data = build_package(&[("styles.xml", b"<office:document-styles/>")]);
        assert_eq!(
            OdtExtractor.extract(&data).unwrap_err(),
            IngestError::extraction("missing content.xml")
        );
    }

    #[test]
    fn space_runs_are_capped() {
        let data = odt("", r#"<text:p>a<text:s text:c="100000000000000"/>b</text:p>"#);
        let blocks = OdtExtractor.extract(&data).unwrap();
        let expected = format!("a{}b", " ".repeat(MAX_SPACE_RUN));
        assert_eq!(blocks, vec![DocumentBlock::paragraph(expected.as_str())]);

        let data = odt("", r#"<text:p>a<text:s text:c="18446744073709551615"/>b</text:p>"#);
        assert!(OdtExtractor.extract(&data).is_ok());
    }

    #[test]
    fn missing_image_fails() {
        let data = odt(
            "",
            r#"<text:p>Intro</text:p><text:p><draw:frame><draw:image xlink:href="Pictures/gone.png"/></draw:frame></text:p>"#,
        );
        assert_eq!(
            OdtExtractor.extract(&data).unwrap_err(),
            IngestError::extraction("image Pictures/gone.png missing from package")
        );
    }
}
