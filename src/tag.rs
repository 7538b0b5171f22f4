//! Binding tag parsing
//!
//! A binding tag tells the decoder where a field's value lives:
//!
//! ```text
//! "Name"                       match the header labelled `Name`
//! "Amount,required"            header match, empty cell is an error
//! "col=C"                      fixed column C, header ignored
//! "Paid On,layout=%d.%m.%Y"    header match with a preferred date layout
//! "-" or ""                    skip the field
//! ```

/// Parsed form of one field's binding tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BindingDirective {
    /// Header label to match (compared against trimmed header text)
    pub header: Option<String>,
    /// Fixed column letters, upper-cased; wins over `header`
    pub column: Option<String>,
    /// Empty cells are rejected
    pub required: bool,
    /// Preferred timestamp layout in `strftime` syntax
    pub layout: Option<String>,
}

/// True when the tag means "this field is not bound to any column"
pub fn is_skip(tag: &str) -> bool {
    let tag = tag.trim();
    tag.is_empty() || tag == "-"
}

impl BindingDirective {
    /// Parse a comma-separated binding tag
    ///
    /// Unknown options are ignored. Callers filter skip tags with
    /// [`is_skip`] first.
    pub fn parse(tag: &str) -> Self {
        let mut parts = tag.split(',').map(str::trim);
        let mut directive = BindingDirective::default();

        if let Some(first) = parts.next() {
            if let Some(letters) = strip_col_prefix(first) {
                directive.column = Some(letters.trim().to_ascii_uppercase());
            } else if !first.is_empty() {
                directive.header = Some(first.to_string());
            }
        }

        for opt in parts {
            if opt == "required" {
                directive.required = true;
            } else if let Some(layout) = opt.strip_prefix("layout=") {
                directive.layout = Some(layout.to_string());
            } else if let Some(letters) = strip_col_prefix(opt) {
                directive.column = Some(letters.trim().to_ascii_uppercase());
            }
        }

        directive
    }
}

fn strip_col_prefix(part: &str) -> Option<&str> {
    match part.get(..4) {
        Some(prefix) if prefix.eq_ignore_ascii_case("col=") => Some(&part[4..]),
        _ => None,
    }
}
