//! Legacy Word 97-2003 (`.doc`) extractor.
//!
//! Text comes from the piece table: the FIB in the `WordDocument` stream
//! points at the CLX in the `0Table`/`1Table` stream, whose pieces map
//! character positions to compressed (cp1252) or UTF-16LE byte ranges.
//! Character formatting is not recovered. Table structure is rebuilt from
//! cell marks, pictures from image signatures in the `Data` stream.

use super::builder::BlockBuilder;
use super::Extractor;
use encoding_rs::WINDOWS_1252;
use pedlab_core::models::{DocumentBlock, DocumentKind, EmbeddedImage, InlineStyle};
use pedlab_core::IngestError;
use std::collections::VecDeque;
use std::io::{Cursor, Read};
use tracing::{debug, warn};

const FIB_IDENT: u16 = 0xA5EC;
const FIB_ENCRYPTED: u16 = 0x0100;
const FIB_WHICH_TABLE: u16 = 0x0200;
const FC_COMPRESSED: u32 = 0x4000_0000;
const CLX_PAIR_INDEX: usize = 33;
const MIN_RECOVERED_RUN: usize = 8;

const PNG_SIGNATURE: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

pub struct DocExtractor;

impl Extractor for DocExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Doc
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
        match parse_structure(data) {
            Ok(blocks) => Ok(blocks),
            Err(StructureError::Encrypted) => Err(IngestError::extraction(
                "encrypted DOC documents are not supported",
            )),
            Err(StructureError::Malformed(reason)) => {
                warn!(reason = %reason, "DOC structure unreadable, recovering plain text");
                let blocks = recover_text(data);
                if blocks.is_empty() {
                    Err(IngestError::extraction(format!(
                        "unreadable DOC file: {}",
                        reason
                    )))
                } else {
                    Ok(blocks)
                }
            }
        }
    }
}

#[derive(Debug)]
enum StructureError {
    Encrypted,
    Malformed(String),
}

fn malformed(reason: impl Into<String>) -> StructureError {
    StructureError::Malformed(reason.into())
}

fn u16_at(buf: &[u8], offset: usize) -> Result<u16, StructureError> {
    buf.get(offset..offset + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or_else(|| malformed(format!("truncated structure at offset {}", offset)))
}

fn u32_at(buf: &[u8], offset: usize) -> Result<u32, StructureError> {
    buf.get(offset..offset + 4)
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| malformed(format!("truncated structure at offset {}", offset)))
}

struct Fib {
    encrypted: bool,
    table_one: bool,
    ccp_text: u32,
    fc_clx: u32,
    lcb_clx: u32,
}

impl Fib {
    fn parse(word: &[u8]) -> Result<Self, StructureError> {
        if u16_at(word, 0)? != FIB_IDENT {
            return Err(malformed("bad FIB signature"));
        }
        let flags = u16_at(word, 0x0A)?;

        // FibBase, then the length-prefixed fibRgW, fibRgLw and fibRgFcLcb
        let mut pos = 0x20;
        let csw = u16_at(word, pos)? as usize;
        pos += 2 + csw * 2;
        let cslw = u16_at(word, pos)? as usize;
        pos += 2;
        if cslw < 4 {
            return Err(malformed("FIB has no ccpText"));
        }
        let ccp_text = u32_at(word, pos + 3 * 4)?;
        pos += cslw * 4;
        let cb_rg_fc_lcb = u16_at(word, pos)? as usize;
        pos += 2;
        if cb_rg_fc_lcb <= CLX_PAIR_INDEX {
            return Err(malformed("FIB has no CLX entry"));
        }
        let clx = pos + CLX_PAIR_INDEX * 8;

        Ok(Self {
            encrypted: flags & FIB_ENCRYPTED != 0,
            table_one: flags & FIB_WHICH_TABLE != 0,
            ccp_text,
            fc_clx: u32_at(word, clx)?,
            lcb_clx: u32_at(word, clx + 4)?,
        })
    }
}

fn read_stream(
    file: &mut cfb::CompoundFile<Cursor<&[u8]>>,
    path: &str,
) -> Result<Option<Vec<u8>>, StructureError> {
    if !file.exists(path) {
        return Ok(None);
    }
    let mut stream = file
        .open_stream(path)
        .map_err(|e| malformed(format!("failed to open {}: {}", path, e)))?;
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .map_err(|e| malformed(format!("failed to read {}: {}", path, e)))?;
    Ok(Some(buf))
}

fn parse_structure(data: &[u8]) -> Result<Vec<DocumentBlock>, StructureError> {
    let mut file = cfb::CompoundFile::open(Cursor::new(data))
        .map_err(|e| malformed(format!("not a compound file: {}", e)))?;
    let word = read_stream(&mut file, "/WordDocument")?
        .ok_or_else(|| malformed("missing WordDocument stream"))?;

    let fib = Fib::parse(&word)?;
    if fib.encrypted {
        return Err(StructureError::Encrypted);
    }

    let table_name = if fib.table_one { "/1Table" } else { "/0Table" };
    let table = read_stream(&mut file, table_name)?
        .ok_or_else(|| malformed(format!("missing {} stream", table_name)))?;
    let pictures = read_stream(&mut file, "/Data")?.unwrap_or_default();

    let text = read_piece_text(&word, &table, &fib)?;
    let images = scan_images(&pictures);
    debug!(
        chars = text.chars().count(),
        images = images.len(),
        "DOC piece table decoded"
    );

    Ok(build_blocks(&text, images))
}

fn read_piece_text(word: &[u8], table: &[u8], fib: &Fib) -> Result<String, StructureError> {
    let start = fib.fc_clx as usize;
    let clx = start
        .checked_add(fib.lcb_clx as usize)
        .and_then(|end| table.get(start..end))
        .ok_or_else(|| malformed("CLX outside table stream"))?;

    let mut pos = 0;
    while pos < clx.len() {
        match clx[pos] {
            // Prc: property modifiers, skipped
            0x01 => {
                let cb = u16_at(clx, pos + 1)? as i16;
                pos += 3 + cb.max(0) as usize;
            }
            // Pcdt: the piece table
            0x02 => {
                let lcb = u32_at(clx, pos + 1)? as usize;
                let plc = clx
                    .get(pos + 5..pos + 5 + lcb)
                    .ok_or_else(|| malformed("truncated piece table"))?;
                return decode_pieces(word, plc, fib.ccp_text as usize);
            }
            other => return Err(malformed(format!("unexpected CLX entry {:#04x}", other))),
        }
    }

    Err(malformed("CLX has no piece table"))
}

fn decode_pieces(word: &[u8], plc: &[u8], ccp_text: usize) -> Result<String, StructureError> {
    if plc.len() < 4 {
        return Err(malformed("empty piece table"));
    }
    let pieces = (plc.len() - 4) / 12;
    let mut text = String::new();
    let mut remaining = ccp_text;

    for i in 0..pieces {
        if remaining == 0 {
            break;
        }
        let cp_start = u32_at(plc, i * 4)?;
        let cp_end = u32_at(plc, (i + 1) * 4)?;
        let count = (cp_end.saturating_sub(cp_start) as usize).min(remaining);
        let fc = u32_at(plc, 4 * (pieces + 1) + i * 8 + 2)?;

        if fc & FC_COMPRESSED != 0 {
            let offset = ((fc & !FC_COMPRESSED) / 2) as usize;
            let bytes = word
                .get(offset..offset + count)
                .ok_or_else(|| malformed("piece outside WordDocument stream"))?;
            let (decoded, _) = WINDOWS_1252.decode_without_bom_handling(bytes);
            text.push_str(&decoded);
        } else {
            let offset = fc as usize;
            let bytes = word
                .get(offset..offset + count * 2)
                .ok_or_else(|| malformed("piece outside WordDocument stream"))?;
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            text.extend(
                char::decode_utf16(units).map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER)),
            );
        }
        remaining -= count;
    }

    Ok(text)
}

/// PNG and JPEG payloads found in the `Data` stream, in stream order.
fn scan_images(data: &[u8]) -> VecDeque<(Vec<u8>, &'static str)> {
    let mut images = VecDeque::new();
    let mut pos = 0;

    while pos < data.len() {
        let rest = &data[pos..];
        let found = if rest.starts_with(PNG_SIGNATURE) {
            png_length(rest).map(|len| (len, "image/png"))
        } else if rest.starts_with(&[0xFF, 0xD8, 0xFF]) {
            jpeg_length(rest).map(|len| (len, "image/jpeg"))
        } else {
            None
        };

        match found {
            Some((len, media_type)) => {
                images.push_back((rest[..len].to_vec(), media_type));
                pos += len;
            }
            None => pos += 1,
        }
    }

    images
}

fn png_length(data: &[u8]) -> Option<usize> {
    let iend = data.windows(4).position(|w| w == b"IEND")?;
    let len = iend + 8;
    (len <= data.len()).then_some(len)
}

/// Walk JPEG segments up to EOI so embedded thumbnails do not end the image.
fn jpeg_length(data: &[u8]) -> Option<usize> {
    let mut pos = 2;
    loop {
        while *data.get(pos)? == 0xFF && *data.get(pos + 1)? == 0xFF {
            pos += 1;
        }
        if *data.get(pos)? != 0xFF {
            return None;
        }
        let marker = *data.get(pos + 1)?;
        pos += 2;
        match marker {
            0xD9 => return Some(pos),
            0x01 | 0xD0..=0xD7 => {}
            _ => {
                let len = u16::from_be_bytes([*data.get(pos)?, *data.get(pos + 1)?]) as usize;
                pos += len;
                if marker == 0xDA {
                    loop {
                        if *data.get(pos)? == 0xFF {
                            let next = *data.get(pos + 1)?;
                            if next != 0 && !(0xD0..=0xD7).contains(&next) {
                                break;
                            }
                        }
                        pos += 1;
                    }
                }
            }
        }
    }
}

fn push_char(builder: &mut BlockBuilder, ch: char) {
    let mut buf = [0u8; 4];
    builder.push_text(ch.encode_utf8(&mut buf), InlineStyle::PLAIN);
}

/// Inside a table, `\r` continues a cell unless the row already ended.
fn paragraph_mark(builder: &mut BlockBuilder) {
    if builder.in_cell() || builder.between_cells() {
        builder.ensure_cell();
    } else if builder.in_table() {
        builder.detach_table();
    }
    builder.end_paragraph();
}

fn build_blocks(text: &str, mut images: VecDeque<(Vec<u8>, &'static str)>) -> Vec<DocumentBlock> {
    let mut builder = BlockBuilder::new();
    let mut fields: Vec<bool> = Vec::new();
    let mut previous = '\0';
    let mut image_count = 0;

    let mut place_image = |builder: &mut BlockBuilder, data: Vec<u8>, media_type: &str| {
        image_count += 1;
        builder.push_image(EmbeddedImage {
            reference_id: format!("data{}", image_count),
            data,
            media_type: media_type.to_string(),
        });
    };

    for ch in text.chars() {
        // field begin / separator / end; instructions are dropped
        match ch {
            '\u{13}' => {
                fields.push(false);
                continue;
            }
            '\u{14}' => {
                if let Some(in_result) = fields.last_mut() {
                    *in_result = true;
                }
                continue;
            }
            '\u{15}' => {
                fields.pop();
                continue;
            }
            _ => {}
        }
        if fields.iter().any(|in_result| !in_result) {
            continue;
        }

        match ch {
            '\r' | '\u{0C}' | '\u{0E}' => paragraph_mark(&mut builder),
            '\u{07}' => {
                if previous == '\u{07}' {
                    builder.end_row();
                    previous = '\0';
                    continue;
                }
                builder.ensure_cell();
                builder.end_cell();
            }
            '\u{0B}' => push_char(&mut builder, '\n'),
            '\t' => push_char(&mut builder, '\t'),
            '\u{1E}' => push_char(&mut builder, '-'),
            '\u{01}' | '\u{08}' => {
                if let Some((data, media_type)) = images.pop_front() {
                    if builder.in_table() && !builder.in_cell() && !builder.between_cells() {
                        builder.detach_table();
                    }
                    place_image(&mut builder, data, media_type);
                }
            }
            c if c < ' ' => {}
            c => push_char(&mut builder, c),
        }
        previous = ch;
    }

    if !images.is_empty() {
        debug!(count = images.len(), "Appending DOC images without anchors");
    }
    builder.end_paragraph();
    while builder.in_table() {
        builder.end_table();
    }
    while let Some((data, media_type)) = images.pop_front() {
        place_image(&mut builder, data, media_type);
    }

    builder.finish()
}

fn is_recoverable(ch: char) -> bool {
    let private_use = ('\u{E000}'..='\u{F8FF}').contains(&ch);
    ch == ' ' || !(ch.is_control() || ch == char::REPLACEMENT_CHARACTER || private_use)
}

/// Best-effort text: printable UTF-16LE or ASCII runs, whichever recovers
/// more, one paragraph per run.
fn recover_text(data: &[u8]) -> Vec<DocumentBlock> {
    let mut utf16_runs = Vec::new();
    let mut current = String::new();
    for pair in data.chunks_exact(2) {
        let unit = u16::from_le_bytes([pair[0], pair[1]]);
        match char::from_u32(unit as u32).filter(|&ch| is_recoverable(ch)) {
            Some(ch) => current.push(ch),
            None => flush_run(&mut current, &mut utf16_runs),
        }
    }
    flush_run(&mut current, &mut utf16_runs);

    let mut ascii_runs = Vec::new();
    for &byte in data {
        if (0x20..0x7F).contains(&byte) {
            current.push(byte as char);
        } else {
            flush_run(&mut current, &mut ascii_runs);
        }
    }
    flush_run(&mut current, &mut ascii_runs);

    let total = |runs: &[String]| runs.iter().map(|r| r.chars().count()).sum::<usize>();
    let runs = if total(&utf16_runs) >= total(&ascii_runs) {
        utf16_runs
    } else {
        ascii_runs
    };
    runs.into_iter().map(DocumentBlock::paragraph).collect()
}

fn flush_run(current: &mut String, runs: &mut Vec<String>) {
    let run = current.trim();
    if run.chars().count() >= MIN_RECOVERED_RUN && run.chars().any(|c| c.is_alphabetic()) {
        runs.push(run.to_string());
    }
    current.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TEXT_OFFSET: usize = 0x400;

    /// Minimal Word 97 file: FIB, one piece, optional Data stream.
    fn build_doc(text: &str, compressed: bool, flags: u16, data_stream: Option<&[u8]>) -> Vec<u8> {
        let chars = text.chars().count() as u32;
        let mut word = vec![0u8; TEXT_OFFSET];
        word[0..2].copy_from_slice(&FIB_IDENT.to_le_bytes());
        word[0x0A..0x0C].copy_from_slice(&flags.to_le_bytes());
        word[0x20..0x22].copy_from_slice(&14u16.to_le_bytes());
        let cslw_at = 0x22 + 28;
        word[cslw_at..cslw_at + 2].copy_from_slice(&22u16.to_le_bytes());
        let rg_lw = cslw_at + 2;
        word[rg_lw + 12..rg_lw + 16].copy_from_slice(&chars.to_le_bytes());
        let cb_at = rg_lw + 22 * 4;
        word[cb_at..cb_at + 2].copy_from_slice(&93u16.to_le_bytes());
        let clx_at = cb_at + 2 + CLX_PAIR_INDEX * 8;
        word[clx_at..clx_at + 4].copy_from_slice(&0u32.to_le_bytes());
        word[clx_at + 4..clx_at + 8].copy_from_slice(&21u32.to_le_bytes());

        let fc = if compressed {
            let (bytes, _, _) = WINDOWS_1252.encode(text);
            word.extend_from_slice(&bytes);
            ((TEXT_OFFSET as u32) * 2) | FC_COMPRESSED
        } else {
            for unit in text.encode_utf16() {
                word.extend_from_slice(&unit.to_le_bytes());
            }
            TEXT_OFFSET as u32
        };

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
        if let Some(data) = data_stream {
            file.create_stream("/Data").unwrap().write_all(data).unwrap();
        }
        file.flush().unwrap();
        file.into_inner().into_inner()
    }

    fn png() -> Vec<u8> {
        let mut png = PNG_SIGNATURE.to_vec();
        png.extend_from_slice(&[0, 0, 0, 0]);
        png.extend_from_slice(b"IEND");
        png.extend_from_slice(&[0xAE, 0x42, 0x60, 0x82]);
        png
    }

    #[test]
    fn reads_unicode_pieces() {
        let data = build_doc("Привет\rмир\r", false, 0, None);
        let blocks = DocExtractor.extract(&data).unwrap();
        assert_eq!(
            blocks,
            vec![
                DocumentBlock::paragraph("Привет"),
                DocumentBlock::paragraph("мир")
            ]
        );
    }

    #[test]
    fn reads_compressed_pieces_and_drops_field_instructions() {
        let data = build_doc(
            "See \u{13}HYPERLINK \"x\"\u{14}site\u{15} now\u{0B}next\r",
            true,
            0,
            None,
        );
        let blocks = DocExtractor.extract(&data).unwrap();
        assert_eq!(blocks, vec![DocumentBlock::paragraph("See site now\nnext")]);
    }

    #[test]
    fn rebuilds_tables_from_cell_marks() {
        let data = build_doc(
            "Intro\rA1\u{07}B1\u{07}\u{07}A2\u{07}B2\u{07}\u{07}Outro\r",
            false,
            0,
            None,
        );
        let blocks = DocExtractor.extract(&data).unwrap();
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], DocumentBlock::paragraph("Intro"));
        let DocumentBlock::Table(table) = &blocks[1] else {
            panic!("expected table, got {:?}", blocks[1]);
        };
        assert_eq!(table.rows.len(), 2);
        assert!(table.rows.iter().all(|row| row.cells.len() == 2));
        assert_eq!(
            table.rows[0].cells[1].blocks,
            vec![DocumentBlock::paragraph("B1")]
        );
        assert_eq!(blocks[2], DocumentBlock::paragraph("Outro"));
    }

    #[test]
    fn anchors_take_images_from_data_stream() {
        let mut data_stream = vec![0u8; 68];
        data_stream.extend_from_slice(&png());
        let data = build_doc("Before\r\u{01}\rAfter\r", false, 0, Some(&data_stream));
        let blocks = DocExtractor.extract(&data).unwrap();

        assert_eq!(blocks.len(), 3);
        let DocumentBlock::Image(image) = &blocks[1] else {
            panic!("expected image, got {:?}", blocks[1]);
        };
        assert_eq!(image.media_type, "image/png");
        assert_eq!(image.data, png());
        assert_eq!(blocks[2], DocumentBlock::paragraph("After"));
    }

    #[test]
    fn jpeg_length_skips_segments() {
        let jpeg = [
            0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x04, b'J', b'F', 0xFF, 0xDA, 0x00, 0x02, 0x12, 0x34,
            0xFF, 0xD9, 0x00,
        ];
        assert_eq!(jpeg_length(&jpeg), Some(16));
    }

    #[test]
    fn encrypted_documents_fail() {
        let data = build_doc("secret\r", false, FIB_ENCRYPTED, None);
        assert_eq!(
            DocExtractor.extract(&data).unwrap_err(),
            IngestError::extraction("encrypted DOC documents are not supported")
        );
    }

    #[test]
    fn recovers_text_when_structure_is_broken() {
        let mut data = vec![0u8; 16];
        for unit in "Recovered paragraph text".encode_utf16() {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        data.extend_from_slice(&[0u8; 16]);
        let blocks = DocExtractor.extract(&data).unwrap();
        assert_eq!(
            blocks,
            vec![DocumentBlock::paragraph("Recovered paragraph text")]
        );
    }

    #[test]
    fn unrecoverable_garbage_fails() {
        assert!(matches!(
            DocExtractor.extract(&[0u8; 64]),
            Err(IngestError::ExtractionFailed { .. })
        ));
    }
}
