//! Resolving record schemas against a worksheet header row

use crate::column::{column_to_index, index_to_column};
use crate::error::{ExcelError, Result};
use crate::schema::{FieldPath, Schema};
use crate::tag::{is_skip, BindingDirective};
use indexmap::IndexMap;

/// Header labels of a worksheet, by trimmed text and by position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    labels: Vec<String>,
    positions: IndexMap<String, usize>,
}

impl HeaderIndex {
    /// Build the index from the header row's cell texts
    ///
    /// Labels are trimmed. When a label repeats, the later column wins.
    pub fn from_row<S: AsRef<str>>(cells: &[S]) -> Self {
        let labels: Vec<String> = cells.iter().map(|c| c.as_ref().trim().to_string()).collect();
        let mut positions = IndexMap::with_capacity(labels.len());
        for (idx, label) in labels.iter().enumerate() {
            positions.insert(label.clone(), idx);
        }
        HeaderIndex { labels, positions }
    }

    /// 0-based column of a header label
    pub fn position(&self, label: &str) -> Option<usize> {
        self.positions.get(label).copied()
    }

    /// Header text found at a 0-based column, if the header row reaches it
    pub fn label_at(&self, column: usize) -> Option<&str> {
        self.labels.get(column).map(String::as_str)
    }

    /// Distinct non-empty labels in first-seen order
    pub fn labels(&self) -> impl Iterator<Item = &str> + '_ {
        self.positions.keys().map(String::as_str).filter(|l| !l.is_empty())
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A field binding resolved to a physical column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRule {
    /// Position of the field in the flattened schema
    pub field: usize,
    /// Full path of the field, for diagnostics
    pub path: FieldPath,
    /// 0-based column index
    pub column: usize,
    /// Header label at that column (empty when the column has none)
    pub header: String,
    pub required: bool,
    pub layout: Option<String>,
}

impl BindingRule {
    /// Column letters of the bound column
    pub fn column_name(&self) -> String {
        index_to_column(self.column)
    }
}

/// Compile the bindings of `schema` against a header row
///
/// Rules come out in field declaration order, embedded fields spliced at
/// their embedding position. Fields with a skip tag produce no rule.
pub fn compile<T>(schema: &Schema<T>, headers: &HeaderIndex) -> Result<Vec<BindingRule>> {
    let mut rules = Vec::with_capacity(schema.len());

    for (field, def) in schema.defs().iter().enumerate() {
        if is_skip(&def.tag) {
            continue;
        }

        let directive = BindingDirective::parse(&def.tag);
        let (column, header) = match (&directive.column, &directive.header) {
            (Some(letters), _) => {
                let column = column_to_index(letters).ok_or_else(|| ExcelError::Schema {
                    field: def.path.to_string(),
                    reason: format!("invalid column letter {:?}", letters),
                })?;
                let header = headers.label_at(column).unwrap_or_default().to_string();
                (column, header)
            }
            (None, Some(name)) => {
                let column = headers.position(name).ok_or_else(|| ExcelError::Schema {
                    field: def.path.to_string(),
                    reason: format!(
                        "header {:?} not found (available: {:?})",
                        name,
                        headers.labels().collect::<Vec<_>>()
                    ),
                })?;
                (column, name.clone())
            }
            (None, None) => {
                return Err(ExcelError::Schema {
                    field: def.path.to_string(),
                    reason: format!("tag {:?} must specify a header or col=", def.tag),
                })
            }
        };

        rules.push(BindingRule {
            field,
            path: def.path.clone(),
            column,
            header,
            required: directive.required,
            layout: directive.layout,
        });
    }

    Ok(rules)
}
