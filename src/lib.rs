//! # excelbind
//!
//! Decode XLSX worksheet rows into typed Rust records.
//!
//! A record type declares, once, which column feeds each of its fields
//! (by header label or by fixed column letter), whether the cell is
//! required and how timestamps are laid out. Rows are then streamed from
//! the worksheet and decoded page by page into a caller-owned `Vec`.
//!
//! ## Binding tags
//!
//! | Tag                         | Meaning                                   |
//! |-----------------------------|-------------------------------------------|
//! | `"Name"`                    | column whose header reads `Name`          |
//! | `"col=C"`                   | column C, whatever its header             |
//! | `"ID,required"`             | empty cells are an error                  |
//! | `"Date,layout=%d.%m.%Y"`    | timestamp layout tried before the defaults|
//! | `""` or `"-"`               | field is not read                         |
//!
//! ## Quick start
//!
//! ```no_run
//! use excelbind::{Document, ReadOptions, Record, SchemaBuilder};
//! use chrono::NaiveDate;
//!
//! #[derive(Debug, Default)]
//! struct Order {
//!     id: u64,
//!     customer: String,
//!     total: f64,
//!     shipped: Option<NaiveDate>,
//! }
//!
//! impl Record for Order {
//!     fn describe(schema: &mut SchemaBuilder<Self>) {
//!         schema
//!             .field("id", "Order ID,required", |r: &mut Self, v| r.id = v)
//!             .field("customer", "col=B", |r: &mut Self, v| r.customer = v)
//!             .field("total", "Total", |r: &mut Self, v| r.total = v)
//!             .field("shipped", "Shipped,layout=%d/%m/%Y", |r: &mut Self, v| r.shipped = v);
//!     }
//! }
//!
//! let mut doc = Document::open("orders.xlsx")?;
//! let mut page = Vec::new();
//! let mut reader = doc.read::<Order>(&mut page, "Orders", ReadOptions::new().limit(1000))?;
//! loop {
//!     for order in &page {
//!         println!("{:?}", order);
//!     }
//!     if !reader.is_next() {
//!         break;
//!     }
//!     reader.next(&mut page)?;
//! }
//! # Ok::<(), excelbind::ExcelError>(())
//! ```
//!
//! ## Features
//!
//! - `parallel`: decode rows in batches on the rayon thread pool
//! - `serde`: (de)serialize [`ReadOptions`] and [`BindingDirective`]

pub mod binding;
pub mod coerce;
pub mod column;
pub mod cursor;
pub mod document;
pub mod error;
pub mod reader;
pub mod schema;
pub mod tag;
pub mod types;

mod sheet_xml;

pub use binding::{compile, BindingRule, HeaderIndex};
pub use coerce::{FieldKind, FieldValue};
pub use column::{cell_reference, column_to_index, index_to_column};
pub use cursor::RowCursor;
pub use document::Document;
pub use error::{CoerceError, ExcelError, Result};
pub use reader::{ReadState, SheetReader};
pub use schema::{FieldPath, Record, Schema, SchemaBuilder, SchemaCache};
pub use tag::BindingDirective;
pub use types::{ReadOptions, Row};
