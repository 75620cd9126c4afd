//! Block model to restricted HTML.
//!
//! The output only ever contains `p`, `strong`, `em`, `u`, `table`, `tr`,
//! `td` and `img`; the only attribute is `data-image-index` (plus `src` once
//! images are bound to hosted URLs).

use base64::{engine::general_purpose::STANDARD, Engine};
use pedlab_core::models::{
    DocumentBlock, EmbeddedImage, ExtractedImage, NormalizedDocument, Paragraph, Table, TextRun,
};
use pedlab_core::IngestError;
use std::fmt::Write;

const IMG_PREFIX: &str = "<img data-image-index=\"";

pub fn normalize(blocks: &[DocumentBlock]) -> Result<NormalizedDocument, IngestError> {
    let mut writer = HtmlWriter::default();
    writer.blocks(blocks)?;

    tracing::debug!(
        html_bytes = writer.html.len(),
        images = writer.images.len(),
        "Document normalized"
    );

    Ok(NormalizedDocument {
        html: writer.html,
        images: writer.images,
    })
}

#[derive(Default)]
struct HtmlWriter {
    html: String,
    images: Vec<ExtractedImage>,
}

impl HtmlWriter {
    fn blocks(&mut self, blocks: &[DocumentBlock]) -> Result<(), IngestError> {
        for block in blocks {
            match block {
                DocumentBlock::Paragraph(paragraph) => self.paragraph(paragraph),
                DocumentBlock::Table(table) => self.table(table)?,
                DocumentBlock::Image(image) => self.image(image)?,
            }
        }
        Ok(())
    }

    fn paragraph(&mut self, paragraph: &Paragraph) {
        self.html.push_str("<p>");
        for run in &paragraph.runs {
            self.run(run);
        }
        self.html.push_str("</p>");
    }

    fn run(&mut self, run: &TextRun) {
        let style = run.style;
        if style.bold {
            self.html.push_str("<strong>");
        }
        if style.italic {
            self.html.push_str("<em>");
        }
        if style.underline {
            self.html.push_str("<u>");
        }
        escape_into(&mut self.html, &run.text);
        if style.underline {
            self.html.push_str("</u>");
        }
        if style.italic {
            self.html.push_str("</em>");
        }
        if style.bold {
            self.html.push_str("</strong>");
        }
    }

    fn table(&mut self, table: &Table) -> Result<(), IngestError> {
        if table.rows.is_empty() {
            return Err(IngestError::NormalizationFailed(
                "table has no rows".to_string(),
            ));
        }
        self.html.push_str("<table>");
        for row in &table.rows {
            if row.cells.is_empty() {
                return Err(IngestError::NormalizationFailed(
                    "table row has no cells".to_string(),
                ));
            }
            self.html.push_str("<tr>");
            for cell in &row.cells {
                self.html.push_str("<td>");
                self.blocks(&cell.blocks)?;
                self.html.push_str("</td>");
            }
            self.html.push_str("</tr>");
        }
        self.html.push_str("</table>");
        Ok(())
    }

    fn image(&mut self, image: &EmbeddedImage) -> Result<(), IngestError> {
        if image.data.is_empty() {
            return Err(IngestError::NormalizationFailed(format!(
                "image {} has an empty payload",
                image.reference_id
            )));
        }
        if !image.media_type.starts_with("image/") {
            return Err(IngestError::NormalizationFailed(format!(
                "image {} has media type {}",
                image.reference_id, image.media_type
            )));
        }

        let index = self.images.len();
        let _ = write!(self.html, "{}{}\">", IMG_PREFIX, index);
        self.images.push(ExtractedImage {
            index,
            media_type: image.media_type.clone(),
            data: STANDARD.encode(&image.data),
        });
        Ok(())
    }
}

fn escape_into(out: &mut String, text: &str) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
}

/// Add `src` attributes to image placeholders whose index has a URL.
/// Placeholders without one are left untouched.
pub fn bind_image_sources(html: &str, urls: &[String]) -> String {
    let mut out = String::with_capacity(html.len() + urls.iter().map(|u| u.len() + 7).sum::<usize>());
    let mut rest = html;

    while let Some(start) = rest.find(IMG_PREFIX) {
        let after_prefix = start + IMG_PREFIX.len();
        out.push_str(&rest[..after_prefix]);
        rest = &rest[after_prefix..];

        let digits = rest.bytes().take_while(u8::is_ascii_digit).count();
        let index = rest[..digits].parse::<usize>().ok();
        out.push_str(&rest[..digits]);
        rest = &rest[digits..];

        if let (Some(index), Some(tail)) = (index, rest.strip_prefix("\">")) {
            out.push('"');
            if let Some(url) = urls.get(index) {
                out.push_str(" src=\"");
                escape_into(&mut out, url);
                out.push('"');
            }
            out.push('>');
            rest = tail;
        }
    }
    out.push_str(rest);
    out
}
