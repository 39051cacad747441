use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Display format for date cells (day first, as the source reports use).
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// A raw cell value as read from a sheet.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum CellValue {
    #[default]
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(CellValue::Empty)
    }
}

/// Canonicalize a raw cell value into a comparable string.
///
/// Integral numbers lose their fractional part (`8204.0` → `"8204"`), dates
/// render as `DD/MM/YYYY`, text is trimmed. Never fails.
pub fn normalize(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format_number(*n),
        CellValue::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        CellValue::DateTime(dt) => dt.format(DATE_FORMAT).to_string(),
        CellValue::Text(s) => s.trim().to_string(),
    }
}

fn format_number(n: f64) -> String {
    // i64 cast is exact below 2^53; larger integral values keep f64 Display,
    // which never uses exponent notation either.
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}
