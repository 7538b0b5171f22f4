//! Minimal XLSX writer for test fixtures

#![allow(dead_code)]

use std::fmt::Write as _;
use std::io::{Cursor, Write};
use tempfile::NamedTempFile;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One stored cell
#[derive(Debug, Clone)]
pub enum Cell {
    /// Shared string (`t="s"`)
    Text(String),
    /// Inline string (`t="inlineStr"`)
    Inline(String),
    /// Number stored as its raw text
    Number(String),
    Bool(bool),
    /// Formula with a cached string result (`t="str"`)
    Formula(String, String),
    /// No `<c>` element at all
    Missing,
}

pub fn text(s: &str) -> Cell {
    Cell::Text(s.to_string())
}

pub fn num(n: impl ToString) -> Cell {
    Cell::Number(n.to_string())
}

/// Row of shared strings
pub fn texts(cells: &[&str]) -> Vec<Cell> {
    cells.iter().map(|c| text(c)).collect()
}

struct FixtureSheet {
    name: String,
    rows: Vec<(u32, Vec<Cell>)>,
}

/// Builds small workbooks shaped like the ones spreadsheet apps write
#[derive(Default)]
pub struct Fixture {
    sheets: Vec<FixtureSheet>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheet(mut self, name: &str) -> Self {
        self.sheets.push(FixtureSheet {
            name: name.to_string(),
            rows: Vec::new(),
        });
        self
    }

    /// Append a row right after the previous one
    pub fn row(self, cells: Vec<Cell>) -> Self {
        let next = self
            .sheets
            .last()
            .and_then(|s| s.rows.last())
            .map_or(1, |(r, _)| r + 1);
        self.row_at(next, cells)
    }

    /// Add a row at an explicit row number, leaving a gap if it skips ahead
    pub fn row_at(mut self, number: u32, cells: Vec<Cell>) -> Self {
        if self.sheets.is_empty() {
            self = self.sheet("Sheet1");
        }
        if let Some(sheet) = self.sheets.last_mut() {
            sheet.rows.push((number, cells));
        }
        self
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut sst: Vec<String> = Vec::new();
        let mut sheet_xml = Vec::new();
        for sheet in &self.sheets {
            sheet_xml.push(worksheet_xml(&sheet.rows, &mut sst));
        }

        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), self.content_types()),
            ("_rels/.rels".to_string(), ROOT_RELS.to_string()),
            ("xl/workbook.xml".to_string(), self.workbook_xml()),
            ("xl/_rels/workbook.xml.rels".to_string(), self.workbook_rels()),
            ("xl/sharedStrings.xml".to_string(), shared_strings_xml(&sst)),
        ];
        for (i, xml) in sheet_xml.into_iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml));
        }

        for (name, body) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    /// Write the workbook to a temporary `.xlsx` file
    pub fn save(&self) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".xlsx").tempfile().unwrap();
        file.write_all(&self.to_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
<Default Extension="xml" ContentType="application/xml"/>
<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>
"#,
        );
        for i in 1..=self.sheets.len() {
            let _ = writeln!(
                xml,
                r#"<Override PartName="/xl/worksheets/sheet{}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
                i
            );
        }
        xml.push_str("</Types>");
        xml
    }

    fn workbook_xml(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>"#,
        );
        for (i, sheet) in self.sheets.iter().enumerate() {
            let _ = write!(
                xml,
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape(&sheet.name),
                i + 1,
                i + 1
            );
        }
        xml.push_str("</sheets></workbook>");
        xml
    }

    fn workbook_rels(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for i in 1..=self.sheets.len() {
            let _ = write!(
                xml,
                r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{}.xml"/>"#,
                i, i
            );
        }
        xml.push_str("</Relationships>");
        xml
    }
}

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

fn worksheet_xml(rows: &[(u32, Vec<Cell>)], sst: &mut Vec<String>) -> String {
    let mut xml = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    for (number, cells) in rows {
        if cells.iter().all(|c| matches!(c, Cell::Missing)) {
            let _ = write!(xml, r#"<row r="{}"/>"#, number);
            continue;
        }
        let _ = write!(xml, r#"<row r="{}">"#, number);
        for (col, cell) in cells.iter().enumerate() {
            let r = excelbind::cell_reference(col, *number);
            match cell {
                Cell::Text(s) => {
                    let idx = match sst.iter().position(|x| x == s) {
                        Some(i) => i,
                        None => {
                            sst.push(s.clone());
                            sst.len() - 1
                        }
                    };
                    let _ = write!(xml, r#"<c r="{}" t="s"><v>{}</v></c>"#, r, idx);
                }
                Cell::Inline(s) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
                        r,
                        escape(s)
                    );
                }
                Cell::Number(n) => {
                    let _ = write!(xml, r#"<c r="{}"><v>{}</v></c>"#, r, n);
                }
                Cell::Bool(b) => {
                    let _ = write!(xml, r#"<c r="{}" t="b"><v>{}</v></c>"#, r, u8::from(*b));
                }
                Cell::Formula(f, v) => {
                    let _ = write!(
                        xml,
                        r#"<c r="{}" t="str"><f>{}</f><v>{}</v></c>"#,
                        r,
                        escape(f),
                        escape(v)
                    );
                }
                Cell::Missing => {}
            }
        }
        xml.push_str("</row>");
    }

    xml.push_str("</sheetData></worksheet>");
    xml
}

fn shared_strings_xml(sst: &[String]) -> String {
    let mut xml = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
        sst.len(),
        sst.len()
    );
    for s in sst {
        if s.starts_with(' ') || s.ends_with(' ') {
            let _ = write!(xml, r#"<si><t xml:space="preserve">{}</t></si>"#, escape(s));
        } else {
            let _ = write!(xml, "<si><t>{}</t></si>", escape(s));
        }
    }
    xml.push_str("</sst>");
    xml
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
