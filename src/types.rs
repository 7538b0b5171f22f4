//! Type definitions for worksheet rows and read settings

use crate::column::cell_reference;

/// One physical worksheet row as cell texts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Row number (1-based, as shown in the spreadsheet)
    pub index: u32,
    /// Cell texts from column A up to the last stored cell
    pub cells: Vec<String>,
}

impl Row {
    /// Create a new row
    pub fn new(index: u32, cells: Vec<String>) -> Self {
        Row { index, cells }
    }

    /// Get cell text at a 0-based column
    pub fn get(&self, col: usize) -> Option<&str> {
        self.cells.get(col).map(String::as_str)
    }

    /// Trimmed cell text at a 0-based column, empty past the row's end
    pub fn text(&self, col: usize) -> &str {
        self.get(col).map(str::trim).unwrap_or("")
    }

    /// Get number of cells
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if row has no text at all
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(|c| c.trim().is_empty())
    }

    /// A1-style reference of a cell in this row
    pub fn reference(&self, col: usize) -> String {
        cell_reference(col, self.index)
    }
}

/// Where the header sits, where data starts and how many records a page holds
///
/// # Examples
///
/// ```
/// use excelbind::ReadOptions;
///
/// let opts = ReadOptions::new().header_row(3).limit(500);
/// assert_eq!(opts.first_data_row(), 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ReadOptions {
    /// 1-based row holding the header labels (default 1)
    pub header_row: u32,
    /// 1-based first data row (default: the row after the header)
    pub data_start_row: Option<u32>,
    /// Maximum records per page, 0 for no limit
    pub limit: usize,
}

impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            header_row: 1,
            data_start_row: None,
            limit: 0,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the header row; 0 is treated as 1
    pub fn header_row(mut self, row: u32) -> Self {
        self.header_row = row.max(1);
        self
    }

    /// Set the first data row
    pub fn data_start_row(mut self, row: u32) -> Self {
        self.data_start_row = Some(row);
        self
    }

    /// Set the page size; 0 reads everything in one page
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Effective header row (never 0)
    pub fn effective_header_row(&self) -> u32 {
        self.header_row.max(1)
    }

    /// Effective first data row, always after the header
    pub fn first_data_row(&self) -> u32 {
        let after_header = self.effective_header_row() + 1;
        match self.data_start_row {
            Some(row) if row >= after_header => row,
            _ => after_header,
        }
    }
}
