//! Incremental construction of the block model.
//!
//! Extractors walk their source in reading order and report text, paragraph
//! ends, images and table structure; the builder decides where each block
//! lands (document root or the innermost open table cell).

use pedlab_core::models::{
    DocumentBlock, EmbeddedImage, InlineStyle, Paragraph, Table, TableCell, TableRow, TextRun,
};

#[derive(Default)]
struct TableFrame {
    rows: Vec<TableRow>,
    row: Option<Vec<TableCell>>,
    cell: Option<Vec<DocumentBlock>>,
}

impl TableFrame {
    fn close_cell(&mut self) {
        if let Some(blocks) = self.cell.take() {
            self.row
                .get_or_insert_with(Vec::new)
                .push(TableCell { blocks });
        }
    }

    fn close_row(&mut self) {
        self.close_cell();
        if let Some(cells) = self.row.take() {
            if !cells.is_empty() {
                self.rows.push(TableRow { cells });
            }
        }
    }

    fn finish(mut self) -> Option<Table> {
        self.close_row();
        if self.rows.is_empty() {
            None
        } else {
            Some(Table { rows: self.rows })
        }
    }
}

#[derive(Default)]
pub(crate) struct BlockBuilder {
    root: Vec<DocumentBlock>,
    tables: Vec<TableFrame>,
    runs: Vec<TextRun>,
}

impl BlockBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append text to the current paragraph, merging with the previous run
    /// when the style is unchanged.
    pub fn push_text(&mut self, text: &str, style: InlineStyle) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.runs.last_mut() {
            if last.style == style {
                last.text.push_str(text);
                return;
            }
        }
        self.runs.push(TextRun::styled(text, style));
    }

    /// Close the current paragraph. Blank paragraphs are dropped.
    pub fn end_paragraph(&mut self) {
        if self.runs.is_empty() {
            return;
        }
        let paragraph = Paragraph {
            runs: std::mem::take(&mut self.runs),
        };
        if paragraph.is_blank() {
            return;
        }
        self.sink().push(DocumentBlock::Paragraph(paragraph));
    }

    /// Place an image at the current position. Text before it becomes its own
    /// paragraph; text after it starts a new one.
    pub fn push_image(&mut self, image: EmbeddedImage) {
        self.end_paragraph();
        self.sink().push(DocumentBlock::Image(image));
    }

    pub fn begin_table(&mut self) {
        self.end_paragraph();
        self.tables.push(TableFrame::default());
    }

    pub fn begin_row(&mut self) {
        self.end_paragraph();
        if let Some(frame) = self.tables.last_mut() {
            frame.close_row();
            frame.row = Some(Vec::new());
        }
    }

    pub fn begin_cell(&mut self) {
        self.end_paragraph();
        if let Some(frame) = self.tables.last_mut() {
            frame.close_cell();
            frame.row.get_or_insert_with(Vec::new);
            frame.cell = Some(Vec::new());
        }
    }

    /// Close the open cell; with none open an empty cell is recorded.
    pub fn end_cell(&mut self) {
        self.end_paragraph();
        if let Some(frame) = self.tables.last_mut() {
            frame.cell.get_or_insert_with(Vec::new);
            frame.close_cell();
        }
    }

    pub fn end_row(&mut self) {
        self.end_paragraph();
        if let Some(frame) = self.tables.last_mut() {
            frame.close_row();
        }
    }

    /// Close the innermost table and place it where it started. A table that
    /// never got a cell leaves no trace.
    pub fn end_table(&mut self) {
        self.end_paragraph();
        if let Some(frame) = self.tables.pop() {
            if let Some(table) = frame.finish() {
                self.sink().push(DocumentBlock::Table(table));
            }
        }
    }

    /// Make sure a cell is open without flushing pending text, so the text
    /// accumulated so far lands in that cell.
    pub fn ensure_cell(&mut self) {
        if self.tables.is_empty() {
            self.tables.push(TableFrame::default());
        }
        if let Some(frame) = self.tables.last_mut() {
            if frame.cell.is_none() {
                frame.row.get_or_insert_with(Vec::new);
                frame.cell = Some(Vec::new());
            }
        }
    }

    /// Close the innermost table, keeping pending text for the enclosing
    /// context.
    pub fn detach_table(&mut self) {
        let runs = std::mem::take(&mut self.runs);
        self.end_table();
        self.runs = runs;
    }

    pub fn in_table(&self) -> bool {
        !self.tables.is_empty()
    }

    pub fn in_cell(&self) -> bool {
        self.tables.last().is_some_and(|frame| frame.cell.is_some())
    }

    /// True while the innermost table has a row with at least one closed cell
    /// and no open cell.
    pub fn between_cells(&self) -> bool {
        self.tables.last().is_some_and(|frame| {
            frame.cell.is_none() && frame.row.as_ref().is_some_and(|row| !row.is_empty())
        })
    }

    pub fn has_pending_text(&self) -> bool {
        !self.runs.is_empty()
    }

    pub fn finish(mut self) -> Vec<DocumentBlock> {
        self.end_paragraph();
        while self.in_table() {
            self.end_table();
        }
        self.root
    }

    fn sink(&mut self) -> &mut Vec<DocumentBlock> {
        match self.tables.last_mut() {
            Some(frame) => frame.cell.get_or_insert_with(Vec::new),
            None => &mut self.root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bold() -> InlineStyle {
        InlineStyle {
            bold: true,
            ..InlineStyle::PLAIN
        }
    }

    fn image(id: &str) -> EmbeddedImage {
        EmbeddedImage {
            reference_id: id.to_string(),
            data: vec![1, 2, 3],
            media_type: "image/png".to_string(),
        }
    }

    #[test]
    fn merges_runs_with_equal_style() {
        let mut builder = BlockBuilder::new();
        builder.push_text("Hello", InlineStyle::PLAIN);
        builder.push_text(", ", InlineStyle::PLAIN);
        builder.push_text("world", bold());
        let blocks = builder.finish();

        assert_eq!(
            blocks,
            vec![DocumentBlock::Paragraph(Paragraph {
                runs: vec![TextRun::plain("Hello, "), TextRun::styled("world", bold())]
            })]
        );
    }

    #[test]
    fn image_splits_paragraph() {
        let mut builder = BlockBuilder::new();
        builder.push_text("before", InlineStyle::PLAIN);
        builder.push_image(image("rId1"));
        builder.push_text("after", InlineStyle::PLAIN);
        builder.end_paragraph();
        let blocks = builder.finish();

        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0], DocumentBlock::paragraph("before"));
        assert!(matches!(blocks[1], DocumentBlock::Image(_)));
        assert_eq!(blocks[2], DocumentBlock::paragraph("after"));
    }

    #[test]
    fn blank_paragraphs_are_dropped() {
        let mut builder = BlockBuilder::new();
        builder.push_text("  ", InlineStyle::PLAIN);
        builder.end_paragraph();
        assert!(builder.finish().is_empty());
    }

    #[test]
    fn nested_table_lands_in_enclosing_cell() {
        let mut builder = BlockBuilder::new();
        builder.begin_table();
        builder.begin_row();
        builder.begin_cell();
        builder.begin_table();
        builder.begin_row();
        builder.begin_cell();
        builder.push_text("inner", InlineStyle::PLAIN);
        builder.end_cell();
        builder.end_row();
        builder.end_table();
        builder.end_cell();
        builder.begin_cell();
        builder.end_cell();
        builder.end_row();
        builder.end_table();
        let blocks = builder.finish();

        let DocumentBlock::Table(outer) = &blocks[0] else {
            panic!("expected table, got {:?}", blocks[0]);
        };
        assert_eq!(outer.rows.len(), 1);
        assert_eq!(outer.rows[0].cells.len(), 2);
        assert!(outer.rows[0].cells[1].blocks.is_empty());
        let DocumentBlock::Table(inner) = &outer.rows[0].cells[0].blocks[0] else {
            panic!("expected nested table");
        };
        assert_eq!(
            inner.rows[0].cells[0].blocks,
            vec![DocumentBlock::paragraph("inner")]
        );
    }

    #[test]
    fn ensure_cell_keeps_pending_text_in_cell() {
        let mut builder = BlockBuilder::new();
        builder.push_text("A", InlineStyle::PLAIN);
        builder.ensure_cell();
        builder.end_cell();
        assert!(builder.between_cells());
        builder.push_text("B", InlineStyle::PLAIN);
        builder.ensure_cell();
        builder.end_cell();
        builder.end_row();
        let blocks = builder.finish();

        let DocumentBlock::Table(table) = &blocks[0] else {
            panic!("expected table");
        };
        assert_eq!(table.rows.len(), 1);
        assert_eq!(
            table.rows[0].cells[0].blocks,
            vec![DocumentBlock::paragraph("A")]
        );
        assert_eq!(
            table.rows[0].cells[1].blocks,
            vec![DocumentBlock::paragraph("B")]
        );
    }

    #[test]
    fn detach_table_moves_pending_text_out() {
        let mut builder = BlockBuilder::new();
        builder.push_text("cell", InlineStyle::PLAIN);
        builder.ensure_cell();
        builder.end_cell();
        builder.end_row();
        builder.push_text("outside", InlineStyle::PLAIN);
        assert!(builder.in_table() && !builder.in_cell());
        builder.detach_table();
        builder.end_paragraph();
        let blocks = builder.finish();

        assert_eq!(blocks.len(), 2);
        assert!(matches!(blocks[0], DocumentBlock::Table(_)));
        assert_eq!(blocks[1], DocumentBlock::paragraph("outside"));
    }

    #[test]
    fn empty_table_leaves_no_block() {
        let mut builder = BlockBuilder::new();
        builder.begin_table();
        builder.begin_row();
        builder.end_row();
        builder.end_table();
        assert!(builder.finish().is_empty());
    }
}
