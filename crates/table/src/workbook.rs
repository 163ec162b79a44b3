//! Spreadsheet ingestion.
//!
//! Workbook bytes are handed to calamine, which sniffs the format
//! (xlsx, xlsm, xlsb, xls, ods). Only the first sheet is read. The first row
//! of its used range is the header and every value is coerced to text.

use crate::dataset::{Cell, TableError, TabularDataset};
use calamine::{open_workbook_auto_from_rs, CellErrorType, Data, Range, Reader};
use std::collections::HashSet;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Errors raised while reading a workbook.
#[derive(Debug, Error)]
pub enum WorkbookError {
    #[error("Failed to open workbook: {0}")]
    Open(#[source] calamine::Error),

    #[error("Workbook contains no sheets")]
    NoSheets,

    #[error("Failed to read sheet '{sheet}': {source}")]
    Sheet {
        sheet: String,
        #[source]
        source: calamine::Error,
    },

    #[error(transparent)]
    Shape(#[from] TableError),
}

/// Parse workbook bytes into a dataset built from the first sheet.
pub fn read_first_sheet(bytes: impl AsRef<[u8]>) -> Result<TabularDataset, WorkbookError> {
    let cursor = Cursor::new(bytes.as_ref());
    let mut workbook = open_workbook_auto_from_rs(cursor).map_err(WorkbookError::Open)?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or(WorkbookError::NoSheets)?;

    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|source| WorkbookError::Sheet {
            sheet: sheet.clone(),
            source,
        })?;

    let dataset = dataset_from_range(&range)?;

    debug!(
        "Read sheet '{}': {} columns, {} rows",
        sheet,
        dataset.column_count(),
        dataset.row_count()
    );

    Ok(dataset)
}

/// Build a dataset from a cell range whose first non-blank row is the header.
///
/// Columns are anchored at sheet column A, so empty leading columns of the
/// used range come back as `Unnamed: {index}` columns. Rows with no value in
/// any cell are skipped.
pub fn dataset_from_range(range: &Range<Data>) -> Result<TabularDataset, TableError> {
    let leading = range.start().map_or(0, |(_, col)| col as usize);

    let mut rows = range.rows().filter_map(|row| {
        let cells: Vec<Cell> = std::iter::repeat(Cell::Empty)
            .take(leading)
            .chain(row.iter().map(cell_from_data))
            .collect();
        if cells.iter().all(|c| *c == Cell::Empty) {
            None
        } else {
            Some(cells)
        }
    });

    let Some(header_row) = rows.next() else {
        return TabularDataset::new(Vec::new());
    };

    let headers = column_names(&header_row);
    TabularDataset::from_rows(headers, rows.collect())
}

/// Coerce a spreadsheet value to a text cell.
pub fn cell_from_data(value: &Data) -> Cell {
    match value {
        Data::Empty => Cell::Empty,
        Data::String(s) if s.is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Text(i.to_string()),
        Data::Float(f) => Cell::Text(format_float(*f)),
        Data::Bool(b) => Cell::Text(if *b { "True" } else { "False" }.to_string()),
        Data::DateTime(dt) => {
            if dt.is_duration() {
                Cell::Text(format_float(dt.as_f64()))
            } else {
                match dt.as_datetime() {
                    Some(naive) => Cell::Text(naive.format("%Y-%m-%d %H:%M:%S").to_string()),
                    None => Cell::Text(format_float(dt.as_f64())),
                }
            }
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(CellErrorType::NA) => Cell::Empty,
        Data::Error(e) => Cell::Text(e.to_string()),
    }
}

/// Integral floats print without a fractional part ("3", not "3.0").
fn format_float(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{}", f as i64)
    } else {
        f.to_string()
    }
}

/// Header names: empty cells become `Unnamed: {index}` and repeats get a
/// `.1`, `.2`, ... suffix so every name is unique.
fn column_names(header_row: &[Cell]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(header_row.len());
    let mut names = Vec::with_capacity(header_row.len());

    for (index, cell) in header_row.iter().enumerate() {
        let base = match cell {
            Cell::Text(s) if !s.is_empty() => s.clone(),
            _ => format!("Unnamed: {index}"),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{base}.{suffix}");
            suffix += 1;
        }

        seen.insert(name.clone());
        names.push(name);
    }

    names
}
