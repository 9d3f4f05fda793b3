//! Export pipeline orchestration and the delimited-text fallback writer.
//!
//! One invocation owns its tables exclusively: plan, materialize, localize,
//! and filter are pure synchronous stages, so the only coordination point is
//! the cancellation check between whole tables. Cell-level failures never
//! cancel anything; they already degraded to null inside materialization.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use chrono::Local;
use csv::QuoteStyle;
use log::{info, warn};

use crate::{
    descriptor::DescriptorMeta,
    error::ExportError,
    filter, localize, materialize, plan,
    table::{Column, RawTable, TypedTable},
    value::Value,
};

/// Cooperative cancellation flag shared between an export operation and the
/// caller that may abort it.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PipelineOptions {
    /// Rename columns from descriptor captions.
    pub localize_captions: bool,
    /// Drop columns that are empty across the whole row set.
    pub drop_empty_columns: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            localize_captions: true,
            drop_empty_columns: true,
        }
    }
}

/// Runs the full typing pipeline for one table.
pub fn prepare_table(
    raw: &RawTable,
    meta: Option<&DescriptorMeta>,
    options: &PipelineOptions,
) -> TypedTable {
    let typing = plan::build(raw, meta);
    let mut typed = materialize::materialize(raw, &typing);
    if options.localize_captions {
        typed = localize::apply(typed, meta);
    }
    if options.drop_empty_columns {
        typed = filter::drop_empty_columns(typed);
    }
    typed
}

/// Runs the pipeline over several tables, checking for cancellation between
/// tables (never inside a per-cell loop).
pub fn prepare_tables(
    tables: &[RawTable],
    meta: Option<&DescriptorMeta>,
    options: &PipelineOptions,
    cancel: &CancelToken,
) -> Result<Vec<TypedTable>, ExportError> {
    let mut prepared = Vec::with_capacity(tables.len());
    for raw in tables {
        if cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        prepared.push(prepare_table(raw, meta, options));
    }
    Ok(prepared)
}

/// Destination seam for typed tables. Writers receive the per-column logical
/// kind through [`TypedTable::columns`] and are expected to render TEXT as
/// literal strings, DECIMAL fixed-point, and DATETIME with a fixed format.
pub trait TableSink {
    fn write_table(&mut self, table: &TypedTable) -> Result<(), ExportError>;
}

/// Delimited-text fallback sink over any [`Write`].
///
/// Values are rendered in invariant text form; quoting is delegated to the
/// csv writer, which quotes fields containing the delimiter, quote, or line
/// breaks and doubles internal quotes.
pub struct DelimitedSink<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> DelimitedSink<W> {
    pub fn new(inner: W, delimiter: u8) -> Self {
        let writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .quote_style(QuoteStyle::Necessary)
            .double_quote(true)
            .from_writer(inner);
        Self { writer }
    }

    pub fn into_inner(self) -> Result<W, ExportError> {
        self.writer.into_inner().map_err(|err| {
            ExportError::Delimited(csv::Error::from(std::io::Error::other(err.to_string())))
        })
    }
}

impl<W: Write> TableSink for DelimitedSink<W> {
    fn write_table(&mut self, table: &TypedTable) -> Result<(), ExportError> {
        self.writer.write_record(table.column_names())?;
        for row in &table.rows {
            self.writer
                .write_record(row.iter().map(|cell| render_cell(cell)))?;
        }
        self.writer.flush().map_err(csv::Error::from)?;
        Ok(())
    }
}

fn render_cell(cell: &Option<Value>) -> String {
    cell.as_ref().map(Value::as_invariant).unwrap_or_default()
}

/// Writes `table` to `path` as delimited text, returning the path actually
/// written.
///
/// A busy or unwritable destination is retried once under a timestamped
/// alternate name before the writer failure is surfaced as retryable.
pub fn write_delimited(
    table: &TypedTable,
    path: &Path,
    delimiter: u8,
) -> Result<PathBuf, ExportError> {
    match try_write(table, path, delimiter) {
        Ok(()) => Ok(path.to_path_buf()),
        Err(first) => {
            let alternate = alternate_path(path);
            warn!(
                "Cannot write {path:?} ({first}); retrying as {alternate:?}"
            );
            try_write(table, &alternate, delimiter).map_err(|source| ExportError::Writer {
                path: alternate.clone(),
                source,
            })?;
            Ok(alternate)
        }
    }
}

fn try_write(table: &TypedTable, path: &Path, delimiter: u8) -> Result<(), std::io::Error> {
    let file = File::create(path)?;
    let mut sink = DelimitedSink::new(BufWriter::new(file), delimiter);
    sink.write_table(table).map_err(std::io::Error::other)?;
    let writer = sink.into_inner().map_err(std::io::Error::other)?;
    writer
        .into_inner()
        .map(|_| ())
        .map_err(|err| err.into_error())
}

fn alternate_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("export");
    let extension = path.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    path.with_file_name(format!("{stem}_{stamp}.{extension}"))
}

/// Reads a raw table from a delimited dump; every cell arrives as text and
/// empty fields become null, matching what a driver-level text result set
/// looks like.
pub fn read_raw_table(
    path: &Path,
    delimiter: u8,
    table_name: &str,
) -> Result<RawTable, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_path(path)?;
    let columns = reader
        .headers()?
        .iter()
        .map(Column::new)
        .collect::<Vec<_>>();
    let mut table = RawTable::new(table_name, columns);
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    None
                } else {
                    Some(Value::Text(field.to_string()))
                }
            })
            .collect();
        table.push_row(row);
    }
    info!(
        "Loaded {} row(s), {} column(s) from {path:?}",
        table.rows.len(),
        table.columns.len()
    );
    Ok(table)
}
