//! Tabular models flowing through the export pipeline.
//!
//! A [`RawTable`] is the loosely typed result set as loaded from the source
//! of record; a [`TypedTable`] is the same data after materialization, where
//! every column carries exactly one logical [`ColumnKind`] and every cell is
//! either a value of that kind or null.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Final logical type of an export column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Decimal,
    DateTime,
}

impl ColumnKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnKind::Text => "TEXT",
            ColumnKind::Decimal => "DECIMAL",
            ColumnKind::DateTime => "DATETIME",
        }
    }
}

/// A raw result-set column: display name plus the optional system name the
/// descriptor keys its field metadata by. When the source supplies no system
/// name the display name doubles as one.
#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub system_name: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_name: None,
        }
    }

    pub fn with_system_name(name: impl Into<String>, system_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system_name: Some(system_name.into()),
        }
    }

    /// System name used for descriptor lookups, falling back to the display name.
    pub fn effective_system_name(&self) -> &str {
        self.system_name.as_deref().unwrap_or(&self.name)
    }
}

/// Loosely typed result set; column order is load order.
#[derive(Debug, Clone)]
pub struct RawTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl RawTable {
    pub fn new(name: impl Into<String>, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Option<Value>>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Iterates the non-null values of one column, in row order.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &Value> {
        self.rows
            .iter()
            .filter_map(move |row| row.get(index).and_then(|cell| cell.as_ref()))
    }
}

/// A materialized column: display name, system name, and its resolved kind.
#[derive(Debug, Clone)]
pub struct TypedColumn {
    pub name: String,
    pub system_name: Option<String>,
    pub kind: ColumnKind,
}

/// Strongly typed export table. Every cell in column `i` is either null or a
/// [`Value`] variant matching `columns[i].kind`.
#[derive(Debug, Clone)]
pub struct TypedTable {
    pub name: String,
    pub columns: Vec<TypedColumn>,
    pub rows: Vec<Vec<Option<Value>>>,
}

impl TypedTable {
    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }
}
