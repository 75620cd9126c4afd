//! Test fixtures: small documents of every supported format, built in memory.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Signature plus an empty IEND chunk; enough for media type detection.
pub const PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E,
    0x44, 0xAE, 0x42, 0x60, 0x82,
];

pub fn zip_package(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(data).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub fn txt() -> Vec<u8> {
    "Урок 1\r\n\r\nПервый абзац.\nВторая строка.\n\n\nВторой абзац."
        .as_bytes()
        .to_vec()
}

pub fn rtf() -> Vec<u8> {
    concat!(
        r"{\rtf1\ansi\ansicpg1251\deff0",
        r"{\fonttbl{\f0\fswiss Arial;}}",
        r"{\*\generator Writer;}",
        r"\pard Plain \b bold\b0  and \i italic\i0.\par ",
        r"\pard \ul under\ulnone  text\par }"
    )
    .as_bytes()
    .to_vec()
}

fn docx_document(body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" "#,
            r#"xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing" "#,
            r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" "#,
            r#"xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            "<w:body>{}</w:body></w:document>"
        ),
        body
    )
}

pub fn docx(body: &str) -> Vec<u8> {
    let rels = concat!(
        r#"<?xml version="1.0" encoding="UTF-8"?>"#,
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        r#"<Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>"#,
        "</Relationships>"
    );
    let document = docx_document(body);
    zip_package(&[
        ("[Content_Types].xml", b"<Types/>"),
        ("word/document.xml", document.as_bytes()),
        ("word/_rels/document.xml.rels", rels.as_bytes()),
        ("word/media/image1.png", PNG),
    ])
}

pub fn docx_paragraph(text: &str) -> String {
    format!("<w:p><w:r><w:t>{}</w:t></w:r></w:p>", text)
}

pub fn docx_image_paragraph() -> String {
    concat!(
        "<w:p><w:r><w:drawing><wp:inline><a:graphic><a:graphicData>",
        r#"<pic:pic><pic:blipFill><a:blip r:embed="rId4"/></pic:blipFill></pic:pic>"#,
        "</a:graphicData></a:graphic></wp:inline></w:drawing></w:r></w:p>"
    )
    .to_string()
}

pub fn docx_table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<w:tbl><w:tblPr/>");
    for row in rows {
        xml.push_str("<w:tr>");
        for cell in row.iter() {
            xml.push_str("<w:tc><w:tcPr/>");
            xml.push_str(&docx_paragraph(cell));
            xml.push_str("</w:tc>");
        }
        xml.push_str("</w:tr>");
    }
    xml.push_str("</w:tbl>");
    xml
}

pub fn odt(body: &str) -> Vec<u8> {
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
            "<office:automatic-styles>",
            r#"<style:style style:name="T1" style:family="text">"#,
            r#"<style:text-properties fo:font-weight="bold"/></style:style>"#,
            "</office:automatic-styles>",
            "<office:body><office:text>{}</office:text></office:body>",
            "</office:document-content>"
        ),
        body
    );
    zip_package(&[
        ("mimetype", b"application/vnd.oasis.opendocument.text"),
        ("content.xml", content.as_bytes()),
        ("Pictures/photo.png", PNG),
    ])
}

pub fn odt_table(rows: &[&[&str]]) -> String {
    let mut xml = String::from("<table:table table:name=\"T\"><table:table-column/>");
    for row in rows {
        xml.push_str("<table:table-row>");
        for cell in row.iter() {
            xml.push_str(&format!(
                "<table:table-cell><text:p>{}</text:p></table:table-cell>",
                cell
            ));
        }
        xml.push_str("</table:table-row>");
    }
    xml.push_str("</table:table>");
    xml
}

/// One-page PDF drawing each of `lines` as its own text object.
pub fn pdf(lines: &[&str]) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let mut operations = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let y = 760 - 20 * i as i64;
        operations.extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(*line)]),
            Operation::new("ET", vec![]),
        ]);
    }

    let content = Content { operations };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

const DOC_TEXT_OFFSET: usize = 0x400;
const DOC_FC_COMPRESSED: u32 = 0x4000_0000;

/// Word 97 binary with a single compressed (cp1252) text piece.
///
/// `\r` ends a paragraph, `\x07` ends a cell and a second `\x07` the row.
pub fn doc(text: &str) -> Vec<u8> {
    let chars = text.chars().count() as u32;
    let mut word = vec![0u8; DOC_TEXT_OFFSET];
    word[0..2].copy_from_slice(&0xA5ECu16.to_le_bytes());
    word[0x20..0x22].copy_from_slice(&14u16.to_le_bytes());
    let cslw_at = 0x22 + 28;
    word[cslw_at..cslw_at + 2].copy_from_slice(&22u16.to_le_bytes());
    let rg_lw = cslw_at + 2;
    word[rg_lw + 12..rg_lw + 16].copy_from_slice(&chars.to_le_bytes());
    let cb_at = rg_lw + 22 * 4;
    word[cb_at..cb_at + 2].copy_from_slice(&93u16.to_le_bytes());
    let clx_at = cb_at + 2 + 33 * 8;
    word[clx_at + 4..clx_at + 8].copy_from_slice(&21u32.to_le_bytes());

    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(text);
    word.extend_from_slice(&bytes);
    let fc = ((DOC_TEXT_OFFSET as u32) * 2) | DOC_FC_COMPRESSED;

    let mut table = vec![0x02];
    table.extend_from_slice(&16u32.to_le_bytes());
    table.extend_from_slice(&0u32.to_le_bytes());
    table.extend_from_slice(&chars.to_le_bytes());
    table.extend_from_slice(&0u16.to_le_bytes());
    table.extend_from_slice(&fc.to_le_bytes());
    table.extend_from_slice(&0u16.to_le_bytes());

    let mut file = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    file.create_stream("/WordDocument")
        .unwrap()
        .write_all(&word)
        .unwrap();
    file.create_stream("/0Table")
        .unwrap()
        .write_all(&table)
        .unwrap();
    file.flush().unwrap();
    file.into_inner().into_inner()
}
