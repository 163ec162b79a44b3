//! Source download for sheet-relay
//!
//! The relay accepts a caller-supplied URL and downloads the spreadsheet behind
//! it with a plain GET. No credentials are attached to the request.
//!
//! # Example
//!
//! ```ignore
//! use sheet_relay_fetch::HttpFetcher;
//! use std::time::Duration;
//!
//! let fetcher = HttpFetcher::new(Duration::from_secs(30))?;
//! let fetched = fetcher.fetch("https://example.com/products.xlsx").await?;
//! println!("{} bytes", fetched.bytes.len());
//! ```

mod http;

pub use http::{FetchError, FetchedFile, HttpFetcher};
