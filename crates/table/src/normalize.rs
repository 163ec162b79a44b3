//! Text cleanup applied between ingestion and encoding.

use crate::dataset::{Cell, TabularDataset};

/// U+00A0, which spreadsheet exports use for visual alignment.
pub const NO_BREAK_SPACE: char = '\u{a0}';

/// Replace every no-break space in a text cell with an ordinary space.
///
/// `Empty` cells and column names are left untouched. The replacement is one
/// character for one, so each cell keeps its character count.
pub fn normalize(dataset: TabularDataset) -> TabularDataset {
    dataset.map_cells(normalize_cell)
}

fn normalize_cell(cell: Cell) -> Cell {
    match cell {
        Cell::Text(s) if s.contains(NO_BREAK_SPACE) => Cell::Text(s.replace(NO_BREAK_SPACE, " ")),
        other => other,
    }
}
