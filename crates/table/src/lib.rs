//! Tabular data for sheet-relay.
//!
//! This crate holds the in-memory dataset and the three pure stages of the
//! relay pipeline that operate on it.
//!
//! # Modules
//!
//! - [`workbook`] - spreadsheet bytes → [`TabularDataset`] (first sheet, text cells)
//! - [`normalize`] - no-break spaces → ordinary spaces
//! - [`encode`] - [`TabularDataset`] → UTF-8-with-BOM CSV bytes
//!
//! # Example
//!
//! ```ignore
//! use sheet_relay_table::{encode_csv, normalize, read_first_sheet};
//!
//! let dataset = read_first_sheet(&bytes)?;
//! let csv = encode_csv(&normalize(dataset))?;
//! ```

mod dataset;
pub mod encode;
pub mod normalize;
pub mod workbook;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use dataset::{Cell, Column, TableError, TabularDataset};
pub use encode::{encode_csv, EncodeError, CSV_CONTENT_TYPE, UTF8_BOM};
pub use normalize::normalize;
pub use workbook::{read_first_sheet, WorkbookError};
