use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A loosely typed cell value as returned by the source of record.
///
/// Raw result sets carry whatever the driver handed back: text, a native
/// numeric, or a native temporal. Materialization rewrites these into the
/// planned column kinds; until then every variant may appear in any column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Value {
    Text(String),
    Integer(i64),
    Float(f64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Renders the value in an invariant, locale-independent textual form.
    ///
    /// This is the only string rendering used on the export path, so a cell
    /// reads identically regardless of the host locale.
    pub fn as_invariant(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            Value::Integer(i) => i.to_string(),
            Value::Float(f) => {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    (*f as i64).to_string()
                } else {
                    f.to_string()
                }
            }
            Value::Decimal(d) => d.to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Date(d) => d.format("%Y-%m-%d").to_string(),
            Value::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, Value::Date(_) | Value::DateTime(_))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Integer(_) | Value::Float(_) | Value::Decimal(_))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_invariant())
    }
}

/// True when the cell is null or renders to an empty/whitespace-only string.
pub fn is_blank(cell: &Option<Value>) -> bool {
    match cell {
        None => true,
        Some(value) => value.as_invariant().trim().is_empty(),
    }
}
