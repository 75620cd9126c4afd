//! RTF extractor.
//!
//! A single-pass tokenizer over the control-word stream. Character
//! formatting is group scoped (saved on `{`, restored on `}`); paragraph
//! table membership (`\intbl`) lasts until the next `\pard`.

use super::builder::BlockBuilder;
use super::Extractor;
use encoding_rs::{Encoding, WINDOWS_1252};
use pedlab_core::models::{DocumentBlock, DocumentKind, EmbeddedImage, InlineStyle};
use pedlab_core::IngestError;
use std::collections::HashMap;

/// Destinations whose content never reaches the document body.
const SKIPPED_DESTINATIONS: &[&str] = &[
    "aftncn", "aftnsep", "aftnsepc", "annotation", "atnauthor", "atnid", "atnref", "atntime",
    "bkmkend", "bkmkstart", "colorschememapping", "colortbl", "comment", "datastore",
    "fldinst", "filetbl", "footer", "footerf", "footerl", "footerr", "footnote", "ftncn",
    "ftnsep", "ftnsepc", "generator", "header", "headerf", "headerl", "headerr", "info",
    "latentstyles", "listoverridetable", "listtable", "nonshppict", "objclass", "objdata",
    "pgdsctbl", "pntext", "pntxta", "pntxtb", "revtbl", "rsidtbl", "stylesheet", "tc",
    "template", "themedata", "xe", "xmlnstbl",
];

/// `\*` destinations that still carry body content.
const KEPT_IGNORABLE: &[&str] = &["shppict"];

pub struct RtfExtractor;

impl Extractor for RtfExtractor {
    fn kind(&self) -> DocumentKind {
        DocumentKind::Rtf
    }

    fn extract(&self, data: &[u8]) -> Result<Vec<DocumentBlock>, IngestError> {
        let start = data
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(data.len());
        if !data[start..].starts_with(b"{\\rtf") {
            return Err(IngestError::extraction("not an RTF document"));
        }
        Ok(RtfParser::new(&data[start..]).run())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Destination {
    #[default]
    Body,
    FontTable,
    Skip,
}

#[derive(Debug, Clone, Default)]
struct GroupState {
    style: InlineStyle,
    destination: Destination,
    font: Option<i32>,
    uc: usize,
}

struct Picture {
    media_type: Option<&'static str>,
    data: Vec<u8>,
    high_nibble: Option<u8>,
    depth: usize,
}

struct RtfParser<'a> {
    data: &'a [u8],
    pos: usize,
    state: GroupState,
    stack: Vec<GroupState>,
    builder: BlockBuilder,
    encoding: &'static Encoding,
    font_encodings: HashMap<i32, &'static Encoding>,
    default_font: Option<i32>,
    font_table_font: Option<i32>,
    pending_bytes: Vec<u8>,
    skip_fallback: usize,
    high_surrogate: Option<u16>,
    picture: Option<Picture>,
    picture_count: usize,
    in_table_paragraph: bool,
    group_start: bool,
    ignorable_next: bool,
}

impl<'a> RtfParser<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            state: GroupState {
                uc: 1,
                ..GroupState::default()
            },
            stack: Vec::new(),
            builder: BlockBuilder::new(),
            encoding: WINDOWS_1252,
            font_encodings: HashMap::new(),
            default_font: None,
            font_table_font: None,
            pending_bytes: Vec::new(),
            skip_fallback: 0,
            high_surrogate: None,
            picture: None,
            picture_count: 0,
            in_table_paragraph: false,
            group_start: false,
            ignorable_next: false,
        }
    }

    fn run(mut self) -> Vec<DocumentBlock> {
        while let Some(&byte) = self.data.get(self.pos) {
            match byte {
                b'{' => {
                    self.flush_bytes();
                    self.stack.push(self.state.clone());
                    self.pos += 1;
                    self.group_start = true;
                    self.ignorable_next = false;
                }
                b'}' => {
                    self.flush_bytes();
                    self.close_group();
                    self.pos += 1;
                    self.group_start = false;
                }
                b'\\' => self.control(),
                b'\r' | b'\n' => self.pos += 1,
                _ => {
                    self.group_start = false;
                    self.text_byte(byte);
                    self.pos += 1;
                }
            }
        }
        self.flush_bytes();
        self.builder.finish()
    }

    fn close_group(&mut self) {
        let closes_picture = self
            .picture
            .as_ref()
            .is_some_and(|picture| picture.depth == self.stack.len());
        if closes_picture {
            self.finish_picture();
        }
        if let Some(previous) = self.stack.pop() {
            self.state = previous;
        }
    }

    fn control(&mut self) {
        self.pos += 1;
        let Some(&c) = self.data.get(self.pos) else {
            return;
        };

        if c.is_ascii_alphabetic() {
            let start = self.pos;
            while self
                .data
                .get(self.pos)
                .is_some_and(|b| b.is_ascii_alphabetic())
            {
                self.pos += 1;
            }
            let word = String::from_utf8_lossy(&self.data[start..self.pos]).into_owned();
            let param = self.parameter();
            if self.data.get(self.pos) == Some(&b' ') {
                self.pos += 1;
            }
            self.flush_bytes();
            self.word(&word, param);
            return;
        }

        self.pos += 1;
        match c {
            b'*' => {
                self.ignorable_next = true;
                return;
            }
            b'\'' => {
                let byte = self
                    .data
                    .get(self.pos..self.pos + 2)
                    .and_then(|hex| std::str::from_utf8(hex).ok())
                    .and_then(|hex| u8::from_str_radix(hex, 16).ok());
                if let Some(byte) = byte {
                    self.pos += 2;
                    self.text_byte(byte);
                }
            }
            b'\\' | b'{' | b'}' => self.text_byte(c),
            b'~' => self.control_text("\u{a0}"),
            b'_' => self.control_text("-"),
            b'\r' | b'\n' => {
                self.flush_bytes();
                self.paragraph_break();
            }
            _ => {}
        }
        self.group_start = false;
        self.ignorable_next = false;
    }

    fn parameter(&mut self) -> Option<i32> {
        let negative = self.data.get(self.pos) == Some(&b'-')
            && self
                .data
                .get(self.pos + 1)
                .is_some_and(|b| b.is_ascii_digit());
        if negative {
            self.pos += 1;
        }
        let start = self.pos;
        while self.data.get(self.pos).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if start == self.pos {
            return None;
        }
        let value = std::str::from_utf8(&self.data[start..self.pos])
            .ok()
            .and_then(|digits| digits.parse::<i64>().ok())
            .unwrap_or(i64::from(i32::MAX))
            .min(i64::from(i32::MAX)) as i32;
        Some(if negative { -value } else { value })
    }

    fn word(&mut self, word: &str, param: Option<i32>) {
        let at_group_start = std::mem::take(&mut self.group_start);
        let ignorable = std::mem::take(&mut self.ignorable_next);

        // \binN payload must be stepped over even inside skipped groups
        if word == "bin" {
            let len = param.unwrap_or(0).max(0) as usize;
            let end = (self.pos + len).min(self.data.len());
            if self.state.destination == Destination::Body {
                if let Some(picture) = self.picture.as_mut() {
                    picture.data.extend_from_slice(&self.data[self.pos..end]);
                }
            }
            self.pos = end;
            return;
        }

        if self.state.destination == Destination::Skip {
            return;
        }
        if ignorable && !KEPT_IGNORABLE.contains(&word) {
            self.state.destination = Destination::Skip;
            return;
        }
        if at_group_start && SKIPPED_DESTINATIONS.contains(&word) {
            self.state.destination = Destination::Skip;
            return;
        }
        if at_group_start && word == "fonttbl" {
            self.state.destination = Destination::FontTable;
            return;
        }
        if self.state.destination == Destination::FontTable {
            self.font_table_word(word, param);
            return;
        }

        let on = param != Some(0);
        match word {
            "par" | "sect" | "page" => self.paragraph_break(),
            "line" => self.control_text("\n"),
            "tab" => self.control_text("\t"),
            "emdash" => self.control_text("\u{2014}"),
            "endash" => self.control_text("\u{2013}"),
            "bullet" => self.control_text("\u{2022}"),
            "lquote" => self.control_text("\u{2018}"),
            "rquote" => self.control_text("\u{2019}"),
            "ldblquote" => self.control_text("\u{201C}"),
            "rdblquote" => self.control_text("\u{201D}"),
            "emspace" | "enspace" | "qmspace" => self.control_text(" "),
            "b" => self.state.style.bold = on,
            "i" => self.state.style.italic = on,
            "ul" | "uld" | "uldash" | "uldashd" | "uldashdd" | "uldb" | "ulhwave" | "ulth"
            | "ulw" | "ulwave" => self.state.style.underline = on,
            "ulnone" => self.state.style.underline = false,
            "plain" => self.state.style = InlineStyle::PLAIN,
            "uc" => self.state.uc = param.unwrap_or(1).max(0) as usize,
            "u" => {
                if let Some(code) = param {
                    self.unicode(code);
                }
            }
            "ansicpg" => {
                if let Some(encoding) = param.and_then(encoding_for_codepage) {
                    self.encoding = encoding;
                }
            }
            "mac" => {
                if let Some(encoding) = encoding_for_codepage(10000) {
                    self.encoding = encoding;
                }
            }
            "deff" => self.default_font = param,
            "f" => self.state.font = param,
            "pard" => self.in_table_paragraph = false,
            "intbl" => self.in_table_paragraph = true,
            "cell" | "nestcell" => {
                self.builder.ensure_cell();
                self.builder.end_cell();
            }
            "row" | "nestrow" => self.builder.end_row(),
            "pict" => {
                self.picture = Some(Picture {
                    media_type: None,
                    data: Vec::new(),
                    high_nibble: None,
                    depth: self.stack.len(),
                });
            }
            "pngblip" => self.set_picture_type(Some("image/png")),
            "jpegblip" => self.set_picture_type(Some("image/jpeg")),
            "emfblip" => self.set_picture_type(Some("image/emf")),
            "wmetafile" => self.set_picture_type(Some("image/wmf")),
            "dibitmap" | "wbitmap" | "macpict" | "pmmetafile" => self.set_picture_type(None),
            _ => {}
        }
    }

    fn font_table_word(&mut self, word: &str, param: Option<i32>) {
        match (word, param) {
            ("f", Some(font)) => self.font_table_font = Some(font),
            ("fcharset", Some(charset)) => {
                let encoding = codepage_for_charset(charset).and_then(encoding_for_codepage);
                if let (Some(font), Some(encoding)) = (self.font_table_font, encoding) {
                    self.font_encodings.insert(font, encoding);
                }
            }
            _ => {}
        }
    }

    fn set_picture_type(&mut self, media_type: Option<&'static str>) {
        if let Some(picture) = self.picture.as_mut() {
            picture.media_type = media_type;
        }
    }

    fn text_byte(&mut self, byte: u8) {
        if self.state.destination != Destination::Body {
            return;
        }
        if let Some(picture) = self.picture.as_mut() {
            if let Some(value) = hex_value(byte) {
                match picture.high_nibble.take() {
                    Some(high) => picture.data.push((high << 4) | value),
                    None => picture.high_nibble = Some(value),
                }
            }
            return;
        }
        if self.skip_fallback > 0 {
            self.skip_fallback -= 1;
            return;
        }
        self.pending_bytes.push(byte);
    }

    fn unicode(&mut self, code: i32) {
        if self.state.destination != Destination::Body || self.picture.is_some() {
            return;
        }
        let unit = if code < 0 { code + 65536 } else { code } as u32;
        self.skip_fallback = self.state.uc;

        let decoded = match (self.high_surrogate.take(), unit) {
            (None, 0xD800..=0xDBFF) => {
                self.high_surrogate = Some(unit as u16);
                return;
            }
            (Some(high), 0xDC00..=0xDFFF) => {
                char::decode_utf16([high, unit as u16]).next().and_then(Result::ok)
            }
            (_, unit) => char::from_u32(unit),
        };
        if let Some(ch) = decoded {
            let mut buf = [0u8; 4];
            self.emit_text(ch.encode_utf8(&mut buf));
        }
    }

    fn control_text(&mut self, text: &str) {
        if self.state.destination != Destination::Body || self.picture.is_some() {
            return;
        }
        self.emit_text(text);
    }

    fn current_encoding(&self) -> &'static Encoding {
        self.state
            .font
            .or(self.default_font)
            .and_then(|font| self.font_encodings.get(&font).copied())
            .unwrap_or(self.encoding)
    }

    fn flush_bytes(&mut self) {
        if self.pending_bytes.is_empty() {
            return;
        }
        let bytes = std::mem::take(&mut self.pending_bytes);
        let (text, _) = self.current_encoding().decode_without_bom_handling(&bytes);
        let text = text.into_owned();
        self.emit_text(&text);
    }

    fn emit_text(&mut self, text: &str) {
        if self.in_table_paragraph {
            self.builder.ensure_cell();
        } else if self.builder.in_table() {
            if text.trim().is_empty() {
                return;
            }
            self.builder.detach_table();
        }
        self.builder.push_text(text, self.state.style);
    }

    fn paragraph_break(&mut self) {
        if self.in_table_paragraph {
            self.builder.ensure_cell();
        } else if self.builder.in_table() {
            self.builder.detach_table();
        }
        self.builder.end_paragraph();
    }

    fn finish_picture(&mut self) {
        let Some(picture) = self.picture.take() else {
            return;
        };
        match picture.media_type {
            Some(media_type) if !picture.data.is_empty() => {
                self.picture_count += 1;
                let image = EmbeddedImage {
                    reference_id: format!("pict{}", self.picture_count),
                    data: picture.data,
                    media_type: media_type.to_string(),
                };
                if self.in_table_paragraph {
                    self.builder.ensure_cell();
                } else if self.builder.in_table() {
                    self.builder.detach_table();
                }
                self.builder.push_image(image);
            }
            _ => tracing::debug!("Skipping RTF picture without a supported payload"),
        }
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

fn codepage_for_charset(charset: i32) -> Option<i32> {
    let codepage = match charset {
        0 => 1252,
        77 => 10000,
        128 => 932,
        129 => 949,
        134 => 936,
        136 => 950,
        161 => 1253,
        162 => 1254,
        163 => 1258,
        177 => 1255,
        178 => 1256,
        186 => 1257,
        204 => 1251,
        222 => 874,
        238 => 1250,
        _ => return None,
    };
    Some(codepage)
}

fn encoding_for_codepage(codepage: i32) -> Option<&'static Encoding> {
    let label = match codepage {
        65001 => "utf-8".to_string(),
        932 => "shift_jis".to_string(),
        936 => "gbk".to_string(),
        949 => "euc-kr".to_string(),
        950 => "big5".to_string(),
        866 => "ibm866".to_string(),
        10000 => "macintosh".to_string(),
        20866 => "koi8-r".to_string(),
        28595 => "iso-8859-5".to_string(),
        other => format!("windows-{}", other),
    };
    Encoding::for_label(label.as_bytes())
}
