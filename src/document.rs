//! Workbook access: XLSX files, byte buffers and in-memory workbooks
//!
//! A [`Document`] knows its sheet names and hands out forward-only
//! [`RowCursor`]s. XLSX parts are read straight from the ZIP container;
//! only the shared string table is held in memory, worksheet XML is
//! streamed row by row.

use crate::cursor::RowCursor;
use crate::error::{ExcelError, Result};
use crate::schema::SchemaCache;
use crate::sheet_xml::{parse_relationships, parse_shared_strings, parse_workbook_sheets, XmlRows};
use crate::types::Row;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

trait ReadSeek: Read + Seek {}

impl<R: Read + Seek> ReadSeek for R {}

type Archive = ZipArchive<Box<dyn ReadSeek + Send>>;

enum Source {
    Xlsx {
        archive: Archive,
        sst: Vec<String>,
        sheet_paths: Vec<String>,
    },
    Memory {
        sheets: Vec<Vec<Row>>,
    },
}

/// An open workbook
///
/// # Examples
///
/// ```
/// use excelbind::Document;
///
/// let mut doc = Document::new();
/// doc.append_row("Sheet1", ["ID", "Name"])?;
/// doc.append_row("Sheet1", ["1", "Alice"])?;
///
/// let mut cursor = doc.row_cursor("Sheet1")?;
/// assert!(cursor.advance()?);
/// assert_eq!(cursor.current_row().cells, vec!["ID", "Name"]);
/// # Ok::<(), excelbind::ExcelError>(())
/// ```
pub struct Document {
    sheet_names: Vec<String>,
    source: Source,
    schemas: SchemaCache,
}

impl Document {
    /// Open an XLSX file from disk
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use excelbind::Document;
    ///
    /// let doc = Document::open("customers.xlsx")?;
    /// println!("sheets: {:?}", doc.sheet_names());
    /// # Ok::<(), excelbind::ExcelError>(())
    /// ```
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        log::debug!("opening workbook {}", path.display());
        let file = std::fs::File::open(path)?;
        Self::from_archive(Box::new(file))
    }

    /// Open an XLSX workbook held in memory
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::from_archive(Box::new(Cursor::new(bytes)))
    }

    /// Open an XLSX workbook from any byte stream (uploads, network bodies)
    ///
    /// The stream is read to the end first; ZIP needs random access.
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(bytes)
    }

    /// A new in-memory workbook holding one empty sheet, `Sheet1`
    pub fn new() -> Self {
        Document {
            sheet_names: vec!["Sheet1".to_string()],
            source: Source::Memory {
                sheets: vec![Vec::new()],
            },
            schemas: SchemaCache::new(),
        }
    }

    fn from_archive(reader: Box<dyn ReadSeek + Send>) -> Result<Self> {
        let mut archive = ZipArchive::new(reader)?;

        let sst = match read_part(&mut archive, "xl/sharedStrings.xml")? {
            Some(xml) => parse_shared_strings(&xml)?,
            None => Vec::new(),
        };

        let workbook = read_part(&mut archive, "xl/workbook.xml")?
            .ok_or_else(|| ExcelError::ReadError("missing xl/workbook.xml".to_string()))?;
        let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?.ok_or_else(|| {
            ExcelError::ReadError("missing xl/_rels/workbook.xml.rels".to_string())
        })?;
        let rels = parse_relationships(&rels)?;

        let mut sheet_names = Vec::new();
        let mut sheet_paths = Vec::new();
        for (name, rid) in parse_workbook_sheets(&workbook)? {
            let path = rels.get(&rid).ok_or_else(|| {
                ExcelError::ReadError(format!(
                    "sheet '{}' refers to unknown relationship {}",
                    name, rid
                ))
            })?;
            sheet_names.push(name);
            sheet_paths.push(path.clone());
        }

        log::debug!(
            "workbook loaded: {} sheets {:?}, {} shared strings",
            sheet_names.len(),
            sheet_names,
            sst.len()
        );

        Ok(Document {
            sheet_names,
            source: Source::Xlsx {
                archive,
                sst,
                sheet_paths,
            },
            schemas: SchemaCache::new(),
        })
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> &[String] {
        &self.sheet_names
    }

    /// Position of a sheet; names match case-insensitively
    pub fn sheet_index(&self, name: &str) -> Result<usize> {
        self.sheet_names
            .iter()
            .position(|s| same_sheet(s, name))
            .ok_or_else(|| ExcelError::NotFound {
                sheet: name.to_string(),
                available: self.sheet_names.clone(),
            })
    }

    /// Open a forward-only cursor over a sheet's rows
    pub fn row_cursor(&mut self, name: &str) -> Result<RowCursor<'_>> {
        let index = self.sheet_index(name)?;
        let sheet = self.sheet_names[index].as_str();

        match &mut self.source {
            Source::Xlsx {
                archive,
                sst,
                sheet_paths,
            } => {
                let file = archive.by_name(&sheet_paths[index]).map_err(|e| {
                    ExcelError::ReadError(format!("failed to open sheet '{}': {}", sheet, e))
                })?;
                let rows = XmlRows::new(BufReader::new(file), sst.as_slice());
                Ok(RowCursor::new(sheet, Box::new(rows)))
            }
            Source::Memory { sheets } => {
                let rows = sheets[index].iter().cloned().map(Ok::<Row, ExcelError>);
                Ok(RowCursor::new(sheet, Box::new(rows)))
            }
        }
    }

    /// Add an empty sheet to an in-memory workbook; returns its position
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        let Source::Memory { sheets } = &mut self.source else {
            return Err(ExcelError::Unsupported(
                "sheets cannot be added to a workbook read from XLSX".to_string(),
            ));
        };
        if self.sheet_names.iter().any(|s| same_sheet(s, name)) {
            return Err(ExcelError::SheetExists(name.to_string()));
        }

        self.sheet_names.push(name.to_string());
        sheets.push(Vec::new());
        Ok(self.sheet_names.len() - 1)
    }

    /// Append a row of cell texts to a sheet of an in-memory workbook
    ///
    /// Returns the 1-based number of the new row.
    pub fn append_row<I>(&mut self, sheet: &str, cells: I) -> Result<u32>
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let index = self.sheet_index(sheet)?;
        let Source::Memory { sheets } = &mut self.source else {
            return Err(ExcelError::Unsupported(
                "rows cannot be appended to a workbook read from XLSX".to_string(),
            ));
        };

        let rows = &mut sheets[index];
        let number = u32::try_from(rows.len() + 1)
            .map_err(|_| ExcelError::Unsupported("sheet row limit reached".to_string()))?;
        rows.push(Row::new(number, cells.into_iter().map(Into::into).collect()));
        Ok(number)
    }

    /// Schemas built for record types decoded from this document
    pub fn schemas(&self) -> &SchemaCache {
        &self.schemas
    }

    pub(crate) fn schemas_mut(&mut self) -> &mut SchemaCache {
        &mut self.schemas
    }

    /// Release the workbook and everything cached for it
    pub fn close(self) {
        log::debug!(
            "closing workbook ({} sheets, {} cached schemas)",
            self.sheet_names.len(),
            self.schemas.len()
        );
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.source {
            Source::Xlsx { .. } => "xlsx",
            Source::Memory { .. } => "memory",
        };
        f.debug_struct("Document")
            .field("kind", &kind)
            .field("sheets", &self.sheet_names)
            .field("schemas", &self.schemas)
            .finish()
    }
}

fn same_sheet(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Read a whole archive part as text; `None` when the part is absent
fn read_part(archive: &mut Archive, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(zip::result::ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| ExcelError::ReadError(format!("failed to read {}: {}", name, e)))?;
    Ok(Some(xml))
}
