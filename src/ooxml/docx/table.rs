//! Word tables (`<w:tbl>`).
use crate::common::xml::attr;
use crate::ooxml::docx::body::{Paragraph, XmlReader, parse_paragraph};
use crate::ooxml::error::Result;
use quick_xml::events::Event;

/// Vertical merge state of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VMerge {
    Restart,
    Continue,
}

/// A `<w:tc>` cell.
#[derive(Debug, Clone, Default)]
pub struct Cell {
    paragraphs: Vec<Paragraph>,
    tables: Vec<Table>,
    grid_span: u32,
    v_merge: Option<VMerge>,
}

impl Cell {
    #[inline]
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// Tables nested in this cell.
    #[inline]
    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    /// Number of grid columns the cell covers.
    #[inline]
    pub fn grid_span(&self) -> u32 {
        self.grid_span.max(1)
    }

    #[inline]
    pub fn v_merge(&self) -> Option<VMerge> {
        self.v_merge
    }

    /// Paragraph texts joined by newlines.
    pub fn text(&self) -> String {
        self.paragraphs
            .iter()
            .map(Paragraph::text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A `<w:tr>` row.
#[derive(Debug, Clone, Default)]
pub struct Row {
    grid_before: u32,
    cells: Vec<Cell>,
}

impl Row {
    #[inline]
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }
}

/// Upper bound on grid columns, used when `w:tblGrid` is absent. Word allows 63.
const MAX_GRID_COLUMNS: usize = 64;

/// A table with its rows as written in the XML.
#[derive(Debug, Clone, Default)]
pub struct Table {
    grid_columns: usize,
    rows: Vec<Row>,
}

impl Table {
    #[inline]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of `w:gridCol` entries in `w:tblGrid`.
    #[inline]
    pub fn grid_columns(&self) -> usize {
        self.grid_columns
    }

    fn width(&self) -> usize {
        match self.grid_columns {
            0 => MAX_GRID_COLUMNS,
            n => n.min(MAX_GRID_COLUMNS),
        }
    }

    /// Cell text laid out on the table grid.
    ///
    /// A cell spanning several grid columns repeats its text in each of
    /// them, and a vertically merged continuation repeats the text above it.
    /// Spans and leading `gridBefore` columns stop at the table width; every
    /// cell still gets at least one column.
    pub fn grid(&self) -> Vec<Vec<String>> {
        let width = self.width();
        let mut grid: Vec<Vec<String>> = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut out = vec![String::new(); (row.grid_before as usize).min(width)];
            for cell in &row.cells {
                let column = out.len();
                let text = match cell.v_merge {
                    Some(VMerge::Continue) => grid
                        .last()
                        .and_then(|above| above.get(column))
                        .cloned()
                        .unwrap_or_default(),
                    _ => cell.text(),
                };
                let span = (cell.grid_span() as usize).min(width.saturating_sub(column)).max(1);
                for _ in 0..span {
                    out.push(text.clone());
                }
            }
            grid.push(out);
        }
        grid
    }

    /// This table followed by every table nested in it, depth first.
    pub fn collect_into<'a>(&'a self, out: &mut Vec<&'a Table>) {
        out.push(self);
        for cell in self.rows.iter().flat_map(|r| r.cells.iter()) {
            for table in &cell.tables {
                table.collect_into(out);
            }
        }
    }

    /// Every paragraph in the table, including nested tables.
    pub fn paragraphs_into<'a>(&'a self, out: &mut Vec<&'a Paragraph>) {
        for cell in self.rows.iter().flat_map(|r| r.cells.iter()) {
            out.extend(cell.paragraphs.iter());
            for table in &cell.tables {
                table.paragraphs_into(out);
            }
        }
    }
}

/// Parse a table; the reader is positioned after `<w:tbl>`.
pub(crate) fn parse_table(reader: &mut XmlReader<'_>) -> Result<Table> {
    let mut table = Table::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"tr" => table.rows.push(Row::default()),
                b"gridCol" => table.grid_columns += 1,
                b"tc" => {
                    let cell = parse_cell(reader)?;
                    if let Some(row) = table.rows.last_mut() {
                        row.cells.push(cell);
                    }
                },
                b"Fallback" | b"del" => {
                    reader.read_to_end(e.name())?;
                },
                _ => {},
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"gridCol" => table.grid_columns += 1,
                b"gridBefore" => {
                    if let Some(row) = table.rows.last_mut() {
                        row.grid_before = attr(&e, b"val").and_then(|v| v.parse().ok()).unwrap_or(0);
                    }
                },
                _ => {},
            },
            Event::End(e) if e.local_name().as_ref() == b"tbl" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(table)
}

fn parse_cell(reader: &mut XmlReader<'_>) -> Result<Cell> {
    let mut cell = Cell::default();
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"p" => cell.paragraphs.push(parse_paragraph(reader)?),
                b"tbl" => cell.tables.push(parse_table(reader)?),
                b"vMerge" => cell.v_merge = Some(v_merge(attr(&e, b"val").as_deref())),
                _ => {},
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"gridSpan" => cell.grid_span = attr(&e, b"val").and_then(|v| v.parse().ok()).unwrap_or(1),
                b"vMerge" => cell.v_merge = Some(v_merge(attr(&e, b"val").as_deref())),
                b"p" => cell.paragraphs.push(Paragraph::default()),
                _ => {},
            },
            Event::End(e) if e.local_name().as_ref() == b"tc" => break,
            Event::Eof => break,
            _ => {},
        }
    }
    Ok(cell)
}

fn v_merge(val: Option<&str>) -> VMerge {
    match val {
        Some("restart") => VMerge::Restart,
        _ => VMerge::Continue,
    }
}
