//! Empty-column elision for export tables.

use log::debug;

use crate::{table::TypedTable, value};

/// Removes columns whose every cell is null or blank after invariant text
/// conversion.
///
/// Row count and row order are untouched. When every column is empty the
/// original table is returned unchanged; a zero-column table is never
/// produced.
pub fn drop_empty_columns(table: TypedTable) -> TypedTable {
    let keep: Vec<bool> = (0..table.columns.len())
        .map(|index| {
            table
                .rows
                .iter()
                .any(|row| !value::is_blank(&row[index]))
        })
        .collect();

    let kept = keep.iter().filter(|k| **k).count();
    if kept == table.columns.len() {
        return table;
    }
    if kept == 0 {
        debug!(
            "All {} column(s) of '{}' are empty; keeping table unchanged",
            table.columns.len(),
            table.name
        );
        return table;
    }
    debug!(
        "Dropping {} empty column(s) from '{}'",
        table.columns.len() - kept,
        table.name
    );

    let columns = table
        .columns
        .into_iter()
        .zip(keep.iter())
        .filter_map(|(column, keep)| keep.then_some(column))
        .collect();
    let rows = table
        .rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(keep.iter())
                .filter_map(|(cell, keep)| keep.then_some(cell))
                .collect()
        })
        .collect();

    TypedTable {
        name: table.name,
        columns,
        rows,
    }
}
