//! In-memory tabular dataset.

use std::collections::HashSet;
use thiserror::Error;

/// A single cell value. Spreadsheet values are coerced to text at ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cell {
    Text(String),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    /// Text content, with `Empty` as the empty string.
    pub fn as_str(&self) -> &str {
        match self {
            Cell::Text(s) => s,
            Cell::Empty => "",
        }
    }
}

/// A named column of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            cells,
        }
    }
}

/// Errors raised when a dataset would break its shape invariants.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TableError {
    #[error("Column '{name}' has {actual} rows, expected {expected}")]
    RaggedColumn {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("Duplicate column name '{0}'")]
    DuplicateColumn(String),

    #[error("Row {row} has {actual} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },
}

/// Ordered named columns of equal length.
///
/// Column names are unique and keep the order of the source sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TabularDataset {
    columns: Vec<Column>,
}

impl TabularDataset {
    /// Build a dataset, checking that column names are unique and that every
    /// column has the same number of rows.
    pub fn new(columns: Vec<Column>) -> Result<Self, TableError> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(TableError::DuplicateColumn(column.name.clone()));
            }
        }

        if let Some(first) = columns.first() {
            let expected = first.cells.len();
            if let Some(bad) = columns.iter().find(|c| c.cells.len() != expected) {
                return Err(TableError::RaggedColumn {
                    name: bad.name.clone(),
                    expected,
                    actual: bad.cells.len(),
                });
            }
        }

        Ok(Self { columns })
    }

    /// Build a dataset from a header and row-major records.
    pub fn from_rows(headers: Vec<String>, rows: Vec<Vec<Cell>>) -> Result<Self, TableError> {
        let width = headers.len();
        let mut columns: Vec<Column> = headers
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();

        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(TableError::RaggedRow {
                    row: index,
                    expected: width,
                    actual: row.len(),
                });
            }
            for (column, cell) in columns.iter_mut().zip(row) {
                column.cells.push(cell);
            }
        }

        Self::new(columns)
    }

    /// Apply `f` to every cell, keeping column names and shape.
    pub fn map_cells(self, mut f: impl FnMut(Cell) -> Cell) -> Self {
        let columns = self
            .columns
            .into_iter()
            .map(|column| Column {
                name: column.name,
                cells: column.cells.into_iter().map(&mut f).collect(),
            })
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, |c| c.cells.len())
    }

    /// Iterate the dataset row by row.
    pub fn rows(&self) -> impl Iterator<Item = Vec<&Cell>> + '_ {
        (0..self.row_count()).map(move |i| self.columns.iter().map(|c| &c.cells[i]).collect())
    }
}
