//! Forward-only worksheet row cursor

use crate::error::Result;
use crate::types::Row;

type RowSource<'a> = Box<dyn Iterator<Item = Result<Row>> + 'a>;

/// Forward-only cursor over the rows of one worksheet
///
/// Rows absent from the file (sparse sheets) are produced as empty rows,
/// so `advance` steps through physical row numbers one at a time. One row
/// of lookahead backs [`RowCursor::has_next`].
///
/// The cursor borrows its document; dropping it (or calling
/// [`RowCursor::close`]) releases the underlying worksheet stream.
pub struct RowCursor<'a> {
    sheet: String,
    source: RowSource<'a>,
    pending: Option<Row>,
    current: Row,
    next_index: u32,
    finished: bool,
}

impl<'a> RowCursor<'a> {
    pub(crate) fn new(sheet: &str, source: RowSource<'a>) -> Self {
        RowCursor {
            sheet: sheet.to_string(),
            source,
            pending: None,
            current: Row::default(),
            next_index: 1,
            finished: false,
        }
    }

    /// Name of the worksheet being read
    pub fn sheet(&self) -> &str {
        &self.sheet
    }

    /// Move to the next row; `false` once the sheet is exhausted
    pub fn advance(&mut self) -> Result<bool> {
        match self.pull()? {
            Some(row) => {
                self.current = row;
                Ok(true)
            }
            None => {
                self.current = Row::default();
                Ok(false)
            }
        }
    }

    /// Cells of the row the cursor is on
    pub fn current_row(&self) -> &Row {
        &self.current
    }

    /// Take the current row out of the cursor
    pub(crate) fn take_row(&mut self) -> Row {
        std::mem::take(&mut self.current)
    }

    /// Whether another row follows, without moving the cursor
    pub fn has_next(&mut self) -> Result<bool> {
        self.fill_pending()?;
        Ok(self.pending.is_some())
    }

    /// Release the worksheet stream
    pub fn close(self) {
        log::debug!("closing row cursor on sheet '{}'", self.sheet);
    }

    fn fill_pending(&mut self) -> Result<()> {
        if self.pending.is_none() && !self.finished {
            match self.source.next() {
                Some(row) => self.pending = Some(row?),
                None => self.finished = true,
            }
        }
        Ok(())
    }

    fn pull(&mut self) -> Result<Option<Row>> {
        self.fill_pending()?;
        let Some(row) = self.pending.take() else {
            return Ok(None);
        };

        if row.index > self.next_index {
            let blank = Row::new(self.next_index, Vec::new());
            self.next_index += 1;
            self.pending = Some(row);
            return Ok(Some(blank));
        }

        self.next_index = self.next_index.max(row.index.saturating_add(1));
        Ok(Some(row))
    }
}

impl std::fmt::Debug for RowCursor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowCursor")
            .field("sheet", &self.sheet)
            .field("current", &self.current.index)
            .field("finished", &(self.finished && self.pending.is_none()))
            .finish()
    }
}
