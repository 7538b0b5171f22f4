//! Lightweight scanning of SpreadsheetML parts
//!
//! Only what is needed to turn a worksheet into rows of cell text:
//! shared strings, the sheet list and its relationships, and `<row>`
//! elements. Elements are matched by local name, so `<x:row>` reads the
//! same as `<row>`. Worksheets are pulled event by event, so memory stays
//! at one row plus the reader buffer regardless of sheet size.

use crate::column::column_to_index;
use crate::error::{ExcelError, Result};
use crate::types::Row;
use indexmap::IndexMap;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::io::BufRead;

/// Parse `xl/sharedStrings.xml` into its string table
///
/// Rich-text runs are concatenated; phonetic hints (`<rPh>`) are dropped.
pub(crate) fn parse_shared_strings(xml: &str) -> Result<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    let mut sst = Vec::new();
    let mut current: Option<TextRuns> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == b"si" {
                    current = Some(TextRuns::default());
                } else if let Some(runs) = current.as_mut() {
                    runs.start(name.as_ref());
                }
            }
            Event::Empty(e) if e.local_name().as_ref() == b"si" => sst.push(String::new()),
            Event::End(e) => {
                let name = e.local_name();
                if name.as_ref() == b"si" {
                    if let Some(runs) = current.take() {
                        sst.push(runs.text);
                    }
                } else if let Some(runs) = current.as_mut() {
                    runs.end(name.as_ref());
                }
            }
            Event::Text(e) => {
                if let Some(runs) = current.as_mut().filter(|r| r.accepts_text()) {
                    runs.push(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(runs) = current.as_mut().filter(|r| r.accepts_text()) {
                    runs.push(cdata_text(&e)?);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sst)
}

/// Sheet `(name, relationship id)` pairs in workbook order
pub(crate) fn parse_workbook_sheets(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                // `r:id` is the only attribute with local name `id`
                if let (Some(name), Some(rid)) = (attribute(&e, b"name")?, attribute(&e, b"id")?) {
                    sheets.push((name, rid));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(sheets)
}

/// Relationship id to archive path, from `xl/_rels/workbook.xml.rels`
pub(crate) fn parse_relationships(xml: &str) -> Result<IndexMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = IndexMap::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?) {
                    rels.insert(id, resolve_target(&target));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(rels)
}

/// Targets are relative to `xl/` unless absolute within the package
fn resolve_target(target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        absolute.to_string()
    } else {
        format!("xl/{}", target.trim_start_matches("./"))
    }
}

/// Unescaped value of the first attribute whose local name is `name`
fn attribute(e: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn cdata_text(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes)
        .map_err(|e| ExcelError::ReadError(format!("CDATA is not valid UTF-8: {}", e)))
}

/// Text collected from `<t>` runs, skipping phonetic `<rPh>` blocks
#[derive(Debug, Default)]
struct TextRuns {
    text: String,
    in_run: bool,
    phonetic: usize,
}

impl TextRuns {
    fn start(&mut self, name: &[u8]) {
        match name {
            b"rPh" => self.phonetic += 1,
            b"t" if self.phonetic == 0 => self.in_run = true,
            _ => {}
        }
    }

    fn end(&mut self, name: &[u8]) {
        match name {
            b"rPh" => self.phonetic = self.phonetic.saturating_sub(1),
            b"t" => self.in_run = false,
            _ => {}
        }
    }

    fn accepts_text(&self) -> bool {
        self.in_run
    }

    fn push(&mut self, text: &str) {
        self.text.push_str(text);
    }
}

/// One `<c>` element being read
#[derive(Debug)]
struct CellState {
    column: usize,
    kind: String,
    value: String,
    in_value: bool,
    inline: TextRuns,
}

impl CellState {
    /// Without an `r` reference the cell takes the next free column
    fn open(e: &BytesStart<'_>, next_column: usize) -> Result<Self> {
        let mut column = next_column;
        let mut kind = String::from("n");

        for attr in e.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            match attr.key.local_name().as_ref() {
                b"r" => {
                    let reference = attr.unescape_value()?;
                    let letters: String = reference
                        .chars()
                        .take_while(|c| c.is_ascii_alphabetic())
                        .collect();
                    if let Some(idx) = column_to_index(&letters) {
                        column = idx;
                    }
                }
                b"t" => kind = attr.unescape_value()?.into_owned(),
                _ => {}
            }
        }

        Ok(CellState {
            column,
            kind,
            value: String::new(),
            in_value: false,
            inline: TextRuns::default(),
        })
    }

    fn start(&mut self, name: &[u8]) {
        if name == b"v" {
            self.in_value = true;
        } else {
            self.inline.start(name);
        }
    }

    fn end(&mut self, name: &[u8]) {
        if name == b"v" {
            self.in_value = false;
        } else {
            self.inline.end(name);
        }
    }

    fn accepts_text(&self) -> bool {
        self.in_value || self.inline.accepts_text()
    }

    fn push(&mut self, text: &str) {
        if self.in_value {
            self.value.push_str(text);
        } else {
            self.inline.push(text);
        }
    }

    /// Resolve the stored value to the text a spreadsheet app would show
    fn into_text(self, sst: &[String]) -> Result<String> {
        match self.kind.as_str() {
            "inlineStr" => Ok(self.inline.text),
            "s" => {
                let raw = self.value.trim();
                if raw.is_empty() {
                    return Ok(String::new());
                }
                let idx: usize = raw.parse().map_err(|_| {
                    ExcelError::ReadError(format!("invalid shared string index {:?}", raw))
                })?;
                sst.get(idx).cloned().ok_or_else(|| {
                    ExcelError::ReadError(format!(
                        "shared string index {} out of range ({} strings)",
                        idx,
                        sst.len()
                    ))
                })
            }
            "b" => Ok(match self.value.trim() {
                "1" => "TRUE".to_string(),
                "0" => "FALSE".to_string(),
                other => other.to_string(),
            }),
            _ => Ok(self.value),
        }
    }
}

/// One `<row>` element being read
///
/// Missing cells between stored ones become empty strings, so cell `n` of
/// the finished row is column `n` of the sheet.
#[derive(Debug)]
struct RowState {
    index: u32,
    cells: Vec<String>,
    cell: Option<CellState>,
}

impl RowState {
    fn open(e: &BytesStart<'_>, fallback_index: u32) -> Result<Self> {
        let index = attribute(e, b"r")?
            .and_then(|r| r.trim().parse::<u32>().ok())
            .unwrap_or(fallback_index);
        Ok(RowState {
            index,
            cells: Vec::new(),
            cell: None,
        })
    }

    fn start(&mut self, e: &BytesStart<'_>) -> Result<()> {
        let name = e.local_name();
        if name.as_ref() == b"c" {
            self.cell = Some(CellState::open(e, self.cells.len())?);
        } else if let Some(cell) = self.cell.as_mut() {
            cell.start(name.as_ref());
        }
        Ok(())
    }

    /// Self-closing child; only `<c/>` matters
    fn empty(&mut self, e: &BytesStart<'_>, sst: &[String]) -> Result<()> {
        if e.local_name().as_ref() == b"c" {
            let cell = CellState::open(e, self.cells.len())?;
            self.place(cell, sst)?;
        }
        Ok(())
    }

    fn end(&mut self, name: &[u8], sst: &[String]) -> Result<()> {
        if name == b"c" {
            if let Some(cell) = self.cell.take() {
                self.place(cell, sst)?;
            }
        } else if let Some(cell) = self.cell.as_mut() {
            cell.end(name);
        }
        Ok(())
    }

    fn accepts_text(&self) -> bool {
        self.cell.as_ref().is_some_and(CellState::accepts_text)
    }

    fn push(&mut self, text: &str) {
        if let Some(cell) = self.cell.as_mut() {
            cell.push(text);
        }
    }

    fn place(&mut self, cell: CellState, sst: &[String]) -> Result<()> {
        let column = cell.column;
        let value = cell.into_text(sst)?;
        if column < self.cells.len() {
            self.cells[column] = value;
        } else {
            self.cells.resize(column, String::new());
            self.cells.push(value);
        }
        Ok(())
    }

    fn finish(self) -> Row {
        Row::new(self.index, self.cells)
    }
}

/// Streaming iterator over `<row>` elements of one worksheet
///
/// Ends after the first error.
pub(crate) struct XmlRows<'a, R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    sst: &'a [String],
    row: Option<RowState>,
    last_index: u32,
    done: bool,
}

impl<'a, R: BufRead> XmlRows<'a, R> {
    pub(crate) fn new(reader: R, sst: &'a [String]) -> Self {
        XmlRows {
            reader: Reader::from_reader(reader),
            buf: Vec::new(),
            sst,
            row: None,
            last_index: 0,
            done: false,
        }
    }

    fn next_row(&mut self) -> Result<Option<Row>> {
        loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    if e.local_name().as_ref() == b"row" {
                        self.row = Some(RowState::open(&e, self.last_index + 1)?);
                    } else if let Some(row) = self.row.as_mut() {
                        row.start(&e)?;
                    }
                }
                Event::Empty(e) => {
                    if e.local_name().as_ref() == b"row" {
                        let row = RowState::open(&e, self.last_index + 1)?.finish();
                        self.last_index = row.index;
                        return Ok(Some(row));
                    } else if let Some(row) = self.row.as_mut() {
                        row.empty(&e, self.sst)?;
                    }
                }
                Event::End(e) => {
                    let name = e.local_name();
                    if name.as_ref() == b"row" {
                        if let Some(state) = self.row.take() {
                            let row = state.finish();
                            self.last_index = row.index;
                            return Ok(Some(row));
                        }
                    } else if let Some(row) = self.row.as_mut() {
                        row.end(name.as_ref(), self.sst)?;
                    }
                }
                Event::Text(e) => {
                    if let Some(row) = self.row.as_mut().filter(|r| r.accepts_text()) {
                        row.push(&e.unescape()?);
                    }
                }
                Event::CData(e) => {
                    if let Some(row) = self.row.as_mut().filter(|r| r.accepts_text()) {
                        row.push(cdata_text(&e)?);
                    }
                }
                Event::Eof => {
                    if let Some(row) = &self.row {
                        return Err(ExcelError::ReadError(format!(
                            "worksheet ends inside row {}",
                            row.index
                        )));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl<'a, R: BufRead> Iterator for XmlRows<'a, R> {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_row() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}
