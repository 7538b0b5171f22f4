//! Error types for workbook access and record decoding

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ExcelError>;

/// Errors raised while opening a workbook or decoding its rows into records
#[derive(Debug, Error)]
pub enum ExcelError {
    /// Underlying file or stream failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The workbook container could not be read
    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A workbook part is not well-formed XML
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// The workbook parts are malformed or missing
    #[error("Read error: {0}")]
    ReadError(String),

    /// The requested worksheet does not exist
    #[error("sheet '{sheet}' not found (available: {available:?})")]
    NotFound {
        sheet: String,
        available: Vec<String>,
    },

    /// A sheet with this name already exists
    #[error("sheet '{0}' already exists")]
    SheetExists(String),

    /// The document cannot perform the operation (e.g. editing a file-backed workbook)
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The worksheet ended before the header row was reached
    #[error("sheet '{sheet}' is empty: header row {header_row} not reached")]
    EmptySheet { sheet: String, header_row: u32 },

    /// The record type does not describe a usable shape
    #[error("invalid target record: {0}")]
    InvalidTarget(String),

    /// A field binding cannot be resolved against the header row
    #[error("field '{field}': {reason}")]
    Schema { field: String, reason: String },

    /// A required cell is empty
    #[error("row {row} col {column} ({header}) is required")]
    RequiredFieldMissing {
        row: u32,
        column: String,
        header: String,
    },

    /// A cell value could not be converted to the field type
    #[error("row {row} col {column} ({header}): {cause}")]
    Parse {
        row: u32,
        column: String,
        header: String,
        #[source]
        cause: CoerceError,
    },

    /// A continuation was requested after the last page
    #[error("no more rows to read")]
    NoMoreRows,

    /// The read session was used out of order or after a failure
    #[error("read session: {0}")]
    Session(String),
}

/// Failure converting one cell's text into a field value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot parse {raw:?} as {kind}: {reason}")]
pub struct CoerceError {
    /// Target kind name (`i32`, `bool`, `timestamp`, ...)
    pub kind: &'static str,
    /// The offending cell text
    pub raw: String,
    /// Why the conversion failed
    pub reason: String,
}

impl CoerceError {
    pub fn new(kind: &'static str, raw: &str, reason: impl Into<String>) -> Self {
        CoerceError {
            kind,
            raw: raw.to_string(),
            reason: reason.into(),
        }
    }
}
