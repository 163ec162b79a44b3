//! CSV encoding of a dataset.
//!
//! Output is UTF-8 with a byte-order mark so that Excel detects the encoding
//! instead of falling back to a legacy code page. Records end in CRLF.

use crate::dataset::{Cell, TabularDataset};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use thiserror::Error;
use tracing::debug;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// MIME type of the encoded output.
pub const CSV_CONTENT_TYPE: &str = "text/csv";

/// Errors that can occur while encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Failed to flush CSV output: {0}")]
    Flush(String),
}

/// Encode `dataset` as BOM-prefixed, comma-delimited CSV with a header row.
///
/// Fields are quoted only when they contain a comma, a quote, CR or LF.
/// `Empty` cells become empty fields. A dataset without columns encodes to
/// the BOM alone.
pub fn encode_csv(dataset: &TabularDataset) -> Result<Vec<u8>, EncodeError> {
    let mut buffer = Vec::with_capacity(estimate_size(dataset));
    buffer.extend_from_slice(UTF8_BOM);

    if dataset.column_count() == 0 {
        return Ok(buffer);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(b',')
        .quote_style(QuoteStyle::Necessary)
        .terminator(Terminator::CRLF)
        .from_writer(buffer);

    writer.write_record(dataset.column_names())?;
    for row in dataset.rows() {
        writer.write_record(row.into_iter().map(Cell::as_str))?;
    }

    writer.flush().map_err(csv::Error::from)?;
    let bytes = writer
        .into_inner()
        .map_err(|e| EncodeError::Flush(e.to_string()))?;

    debug!(
        "Encoded {} rows x {} columns into {} bytes",
        dataset.row_count(),
        dataset.column_count(),
        bytes.len()
    );

    Ok(bytes)
}

fn estimate_size(dataset: &TabularDataset) -> usize {
    let cells: usize = dataset
        .columns()
        .iter()
        .flat_map(|c| c.cells.iter())
        .map(|cell| cell.as_str().len() + 1)
        .sum();
    UTF8_BOM.len() + cells + dataset.row_count() * 2
}
