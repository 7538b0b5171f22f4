//! Cell text to typed value conversion
//!
//! Spreadsheet exports mix human formatted numbers and dates with the raw
//! values stored in the file (a date cell reads back as its serial day
//! count). Each [`FieldValue`] implementation accepts both forms where that
//! is unambiguous and fails loudly otherwise.

use crate::error::CoerceError;
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};
use std::fmt;

/// Layouts tried after the field's own layout, before serial numbers
const DEFAULT_LAYOUTS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d", "%d/%m/%Y"];

/// Kind tag of a bindable field, kept for diagnostics
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Signed(u32),
    Unsigned(u32),
    Float(u32),
    Timestamp,
    Date,
    Optional(Box<FieldKind>),
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldKind::String => write!(f, "string"),
            FieldKind::Bool => write!(f, "bool"),
            FieldKind::Signed(bits) => write!(f, "i{}", bits),
            FieldKind::Unsigned(bits) => write!(f, "u{}", bits),
            FieldKind::Float(bits) => write!(f, "f{}", bits),
            FieldKind::Timestamp => write!(f, "timestamp"),
            FieldKind::Date => write!(f, "date"),
            FieldKind::Optional(inner) => write!(f, "optional {}", inner),
        }
    }
}

/// A type that can be decoded from one cell's text
///
/// `raw` is already trimmed and never empty: empty, non-required cells
/// leave the field at its default without calling `coerce`.
pub trait FieldValue: Sized + Send + 'static {
    fn kind() -> FieldKind;

    fn coerce(raw: &str, layout: Option<&str>) -> Result<Self, CoerceError>;
}

impl FieldValue for String {
    fn kind() -> FieldKind {
        FieldKind::String
    }

    fn coerce(raw: &str, _layout: Option<&str>) -> Result<Self, CoerceError> {
        Ok(raw.to_string())
    }
}

impl FieldValue for bool {
    fn kind() -> FieldKind {
        FieldKind::Bool
    }

    fn coerce(raw: &str, _layout: Option<&str>) -> Result<Self, CoerceError> {
        match raw {
            "1" => return Ok(true),
            "0" => return Ok(false),
            _ => {}
        }
        match raw.to_lowercase().as_str() {
            "true" | "yes" => Ok(true),
            "false" | "no" => Ok(false),
            _ => Err(CoerceError::new(
                "bool",
                raw,
                "expected true/false, yes/no or 1/0",
            )),
        }
    }
}

macro_rules! impl_integer {
    ($kind:ident; $($t:ty),*) => {
        $(
            impl FieldValue for $t {
                fn kind() -> FieldKind {
                    FieldKind::$kind(<$t>::BITS)
                }

                fn coerce(raw: &str, _layout: Option<&str>) -> Result<Self, CoerceError> {
                    clean_integer(raw)
                        .parse::<$t>()
                        .map_err(|e| CoerceError::new(stringify!($t), raw, e.to_string()))
                }
            }
        )*
    };
}

impl_integer!(Signed; i8, i16, i32, i64, i128, isize);
impl_integer!(Unsigned; u8, u16, u32, u64, u128, usize);

macro_rules! impl_float {
    ($($t:ty => $bits:expr),*) => {
        $(
            impl FieldValue for $t {
                fn kind() -> FieldKind {
                    FieldKind::Float($bits)
                }

                fn coerce(raw: &str, _layout: Option<&str>) -> Result<Self, CoerceError> {
                    let value = normalize_decimal(raw)
                        .parse::<$t>()
                        .map_err(|e| CoerceError::new(stringify!($t), raw, e.to_string()))?;
                    if !value.is_finite() {
                        return Err(CoerceError::new(stringify!($t), raw, "value is not finite"));
                    }
                    Ok(value)
                }
            }
        )*
    };
}

impl_float!(f32 => 32, f64 => 64);

impl FieldValue for NaiveDateTime {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn coerce(raw: &str, layout: Option<&str>) -> Result<Self, CoerceError> {
        parse_timestamp(raw, layout)
    }
}

impl FieldValue for DateTime<Utc> {
    fn kind() -> FieldKind {
        FieldKind::Timestamp
    }

    fn coerce(raw: &str, layout: Option<&str>) -> Result<Self, CoerceError> {
        parse_timestamp(raw, layout).map(|naive| naive.and_utc())
    }
}

impl FieldValue for NaiveDate {
    fn kind() -> FieldKind {
        FieldKind::Date
    }

    fn coerce(raw: &str, layout: Option<&str>) -> Result<Self, CoerceError> {
        parse_timestamp(raw, layout).map(|naive| naive.date())
    }
}

impl<V: FieldValue> FieldValue for Option<V> {
    fn kind() -> FieldKind {
        FieldKind::Optional(Box::new(V::kind()))
    }

    fn coerce(raw: &str, layout: Option<&str>) -> Result<Self, CoerceError> {
        V::coerce(raw, layout).map(Some)
    }
}

/// Strip thousands separators and surrounding whitespace
fn clean_integer(raw: &str) -> String {
    if !raw.contains(',') {
        return raw.trim().to_string();
    }
    raw.chars().filter(|&c| c != ',').collect::<String>().trim().to_string()
}

/// Normalize a decimal number to use `.` as the only separator
///
/// - `1,5` -> `1.5` (a lone comma is a decimal comma)
/// - `1,234,567` -> `1234567`
/// - `1,234.50` -> `1234.50`, `1.234,50` -> `1234.50` (the last separator
///   is the decimal one)
fn normalize_decimal(raw: &str) -> String {
    let s: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let last_comma = match s.rfind(',') {
        Some(pos) => pos,
        None => return s,
    };

    match s.rfind('.') {
        Some(last_dot) if last_dot > last_comma => s.replace(',', ""),
        Some(_) => s.replace('.', "").replace(',', "."),
        None if s.matches(',').count() == 1 => s.replace(',', "."),
        None => s.replace(',', ""),
    }
}

/// Parse a timestamp, trying in order: the field layout, the common
/// layouts, then a spreadsheet serial day count
///
/// Offset-aware inputs are converted to UTC; inputs without an offset are
/// taken as UTC.
pub fn parse_timestamp(raw: &str, layout: Option<&str>) -> Result<NaiveDateTime, CoerceError> {
    if let Some(layout) = layout.filter(|l| !l.is_empty()) {
        if let Some(ts) = parse_with_layout(raw, layout) {
            return Ok(ts);
        }
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.naive_utc());
    }
    for layout in DEFAULT_LAYOUTS {
        if let Some(ts) = parse_with_layout(raw, layout) {
            return Ok(ts);
        }
    }

    if let Ok(serial) = raw.parse::<f64>() {
        return from_serial(serial).ok_or_else(|| {
            CoerceError::new("timestamp", raw, "serial day count out of range")
        });
    }

    Err(CoerceError::new(
        "timestamp",
        raw,
        "no layout matched and not a serial day count",
    ))
}

fn parse_with_layout(raw: &str, layout: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_str(raw, layout) {
        return Some(ts.naive_utc());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, layout) {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, layout)
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Convert a spreadsheet serial (days since 1899-12-30) to a timestamp
///
/// The 1899-12-30 base already absorbs the 1900 leap-year bug for every
/// serial from 61 (1900-03-01) on.
pub fn from_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let seconds = (serial * 86_400.0).round();
    if seconds.abs() > i64::MAX as f64 / 2.0 {
        return None;
    }
    let base = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    base.checked_add_signed(Duration::try_seconds(seconds as i64)?)
}
