//! Paged decoding of worksheet rows into records
//!
//! A [`SheetReader`] locates the header row, compiles the record's
//! bindings once and then fills caller-owned pages of records:
//!
//! ```text
//! open ──> HeaderLocated ──read──> Streaming ──next──> ... ──> Exhausted
//!                │                     │
//!                └──── any error ──────┴──> Failed
//! ```
//!
//! # Examples
//!
//! ```
//! use excelbind::{Document, ReadOptions, Record, SchemaBuilder, SheetReader};
//!
//! #[derive(Debug, Default)]
//! struct Item {
//!     id: u32,
//!     label: String,
//! }
//!
//! impl Record for Item {
//!     fn describe(schema: &mut SchemaBuilder<Self>) {
//!         schema
//!             .field("id", "ID,required", |r: &mut Self, v| r.id = v)
//!             .field("label", "Label", |r: &mut Self, v| r.label = v);
//!     }
//! }
//!
//! let mut doc = Document::new();
//! doc.append_row("Sheet1", ["ID", "Label"])?;
//! for i in 1..=3 {
//!     doc.append_row("Sheet1", [i.to_string(), format!("item {}", i)])?;
//! }
//!
//! let mut page = Vec::new();
//! let mut reader = SheetReader::<Item>::open(&mut doc, "Sheet1", ReadOptions::new().limit(2))?;
//! reader.read(&mut page)?;
//! assert_eq!(page.len(), 2);
//! while reader.is_next() {
//!     reader.next(&mut page)?;
//! }
//! assert_eq!(page[0].label, "item 3");
//! # Ok::<(), excelbind::ExcelError>(())
//! ```

use crate::binding::{compile, BindingRule, HeaderIndex};
use crate::cursor::RowCursor;
use crate::document::Document;
use crate::error::{ExcelError, Result};
use crate::schema::{Record, Schema};
use crate::types::{ReadOptions, Row};
use std::sync::Arc;

/// Rows pulled from the cursor per decode batch
const BATCH: usize = if cfg!(feature = "parallel") { 512 } else { 1 };

/// Where a read session stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadState {
    /// Header found and bindings compiled; `read` has not run yet
    HeaderLocated,
    /// A page was delivered and more rows follow
    Streaming,
    /// The last page was delivered
    Exhausted,
    /// A page failed; the session accepts no further reads
    Failed,
}

/// A read session decoding one worksheet into records of type `T`
pub struct SheetReader<'d, T: Record> {
    cursor: RowCursor<'d>,
    schema: Arc<Schema<T>>,
    headers: HeaderIndex,
    rules: Vec<BindingRule>,
    options: ReadOptions,
    state: ReadState,
    is_next: bool,
    records_read: usize,
    last_error: Option<String>,
}

impl<'d, T: Record> SheetReader<'d, T> {
    /// Start a session: find the header row and compile `T`'s bindings
    ///
    /// Fails with `NotFound` for an unknown sheet, `EmptySheet` when the
    /// sheet ends before the header row, `InvalidTarget` for an unusable
    /// record type and `Schema` when a binding cannot be resolved.
    pub fn open(doc: &'d mut Document, sheet: &str, options: ReadOptions) -> Result<Self> {
        doc.sheet_index(sheet)?;
        let schema = doc.schemas_mut().get_or_build::<T>();
        let mut cursor = doc.row_cursor(sheet)?;

        let header_row = options.effective_header_row();
        for _ in 0..header_row {
            if !cursor.advance()? {
                return Err(ExcelError::EmptySheet {
                    sheet: cursor.sheet().to_string(),
                    header_row,
                });
            }
        }
        let headers = HeaderIndex::from_row(&cursor.current_row().cells);

        let schema = schema?;
        let rules = compile(&schema, &headers)?;

        if let Some(start) = options.data_start_row {
            if start <= header_row {
                log::warn!(
                    "data start row {} is not after header row {}; reading from row {}",
                    start,
                    header_row,
                    options.first_data_row()
                );
            }
        }
        log::debug!(
            "sheet '{}': header at row {} ({} labels), {} bindings for {}",
            cursor.sheet(),
            header_row,
            headers.len(),
            rules.len(),
            std::any::type_name::<T>()
        );

        Ok(SheetReader {
            cursor,
            schema,
            headers,
            rules,
            options,
            state: ReadState::HeaderLocated,
            is_next: false,
            records_read: 0,
            last_error: None,
        })
    }

    /// Decode the first page into `out`
    ///
    /// `out` is cleared first. On a row error the records decoded before
    /// the failing row stay in `out`.
    pub fn read(&mut self, out: &mut Vec<T>) -> Result<()> {
        match self.state {
            ReadState::HeaderLocated => self.page(out),
            state => Err(ExcelError::Session(format!(
                "read called in state {:?}; use next to continue",
                state
            ))),
        }
    }

    /// Decode the following page into `out`
    pub fn next(&mut self, out: &mut Vec<T>) -> Result<()> {
        match self.state {
            ReadState::Streaming => self.page(out),
            ReadState::Exhausted => Err(ExcelError::NoMoreRows),
            ReadState::HeaderLocated => {
                Err(ExcelError::Session("next called before read".to_string()))
            }
            ReadState::Failed => Err(ExcelError::Session(format!(
                "session failed earlier: {}",
                self.last_error.as_deref().unwrap_or("unknown error")
            ))),
        }
    }

    /// Whether rows remain after the last page
    pub fn is_next(&self) -> bool {
        self.is_next
    }

    pub fn state(&self) -> ReadState {
        self.state
    }

    /// Records delivered so far across all pages
    pub fn records_read(&self) -> usize {
        self.records_read
    }

    /// Message of the error that failed the session
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Compiled bindings, in field declaration order
    pub fn rules(&self) -> &[BindingRule] {
        &self.rules
    }

    pub fn headers(&self) -> &HeaderIndex {
        &self.headers
    }

    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }

    /// End the session and release the worksheet stream
    pub fn close(self) {
        log::debug!(
            "closing read session on '{}' after {} records",
            self.cursor.sheet(),
            self.records_read
        );
        self.cursor.close();
    }

    fn page(&mut self, out: &mut Vec<T>) -> Result<()> {
        match self.fill_page(out) {
            Ok(()) => {
                self.records_read += out.len();
                self.state = if self.is_next {
                    ReadState::Streaming
                } else {
                    ReadState::Exhausted
                };
                log::debug!(
                    "sheet '{}': page of {} records, more rows: {}",
                    self.cursor.sheet(),
                    out.len(),
                    self.is_next
                );
                Ok(())
            }
            Err(e) => {
                self.records_read += out.len();
                self.state = ReadState::Failed;
                self.is_next = false;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    fn fill_page(&mut self, out: &mut Vec<T>) -> Result<()> {
        out.clear();
        let first_data_row = self.options.first_data_row();
        let limit = self.options.limit;
        let room = |filled: usize| limit == 0 || filled < limit;

        let mut batch: Vec<Row> = Vec::with_capacity(BATCH);
        let mut ended = false;
        while !ended && room(out.len()) {
            batch.clear();
            // A stream error is raised only after the rows before it are decoded
            let mut stream_error = None;
            while batch.len() < BATCH && room(out.len() + batch.len()) {
                match self.cursor.advance() {
                    Ok(true) => {}
                    Ok(false) => {
                        ended = true;
                        break;
                    }
                    Err(e) => {
                        stream_error = Some(e);
                        break;
                    }
                }
                let row = self.cursor.take_row();
                if row.index >= first_data_row {
                    batch.push(row);
                }
            }

            for record in decode_batch(&self.schema, &self.rules, &batch) {
                out.push(record?);
            }
            if let Some(e) = stream_error {
                return Err(e);
            }
        }

        self.is_next = !ended && self.cursor.has_next()?;
        Ok(())
    }
}

impl<T: Record> std::fmt::Debug for SheetReader<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SheetReader")
            .field("sheet", &self.cursor.sheet())
            .field("state", &self.state)
            .field("is_next", &self.is_next)
            .field("records_read", &self.records_read)
            .field("rules", &self.rules.len())
            .finish()
    }
}

/// Decode one row into a fresh record
fn decode_row<T: Record>(schema: &Schema<T>, rules: &[BindingRule], row: &Row) -> Result<T> {
    let mut record = T::default();

    for rule in rules {
        let raw = row.text(rule.column);
        if raw.is_empty() {
            if rule.required {
                return Err(ExcelError::RequiredFieldMissing {
                    row: row.index,
                    column: rule.column_name(),
                    header: rule.header.clone(),
                });
            }
            continue;
        }

        let def = schema.def(rule.field);
        (def.setter)(&mut record, raw, rule.layout.as_deref()).map_err(|cause| {
            ExcelError::Parse {
                row: row.index,
                column: rule.column_name(),
                header: rule.header.clone(),
                cause,
            }
        })?;
    }

    Ok(record)
}

#[cfg(feature = "parallel")]
fn decode_batch<T: Record>(schema: &Schema<T>, rules: &[BindingRule], rows: &[Row]) -> Vec<Result<T>> {
    use rayon::prelude::*;

    rows.par_iter()
        .map(|row| decode_row(schema, rules, row))
        .collect()
}

#[cfg(not(feature = "parallel"))]
fn decode_batch<T: Record>(schema: &Schema<T>, rules: &[BindingRule], rows: &[Row]) -> Vec<Result<T>> {
    rows.iter().map(|row| decode_row(schema, rules, row)).collect()
}

impl Document {
    /// Open a read session on `sheet` and decode its first page into `out`
    ///
    /// The returned session continues with [`SheetReader::next`]. If the
    /// first page fails, the session is dropped and only the error comes
    /// back; records decoded before the failure stay in `out`. Use
    /// [`SheetReader::open`] followed by [`SheetReader::read`] to keep the
    /// failed session for [`SheetReader::last_error`] and
    /// [`SheetReader::records_read`].
    pub fn read<T: Record>(
        &mut self,
        out: &mut Vec<T>,
        sheet: &str,
        options: ReadOptions,
    ) -> Result<SheetReader<'_, T>> {
        let mut reader = SheetReader::open(self, sheet, options)?;
        reader.read(out)?;
        Ok(reader)
    }
}
