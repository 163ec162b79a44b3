//! Fetch → parse → normalize → encode → deliver.

use crate::error::RelayError;
use sheet_relay_fetch::HttpFetcher;
use sheet_relay_graph::{GraphPublisher, UploadResult};
use sheet_relay_table::{encode_csv, normalize, read_first_sheet};
use std::fmt;
use tracing::{debug, info};

/// What happens to the encoded CSV.
#[derive(Debug, Clone)]
pub enum Delivery {
    /// Return the CSV to the caller as a file download
    Attachment,
    /// Upload the CSV to the configured drive path
    Upload(GraphPublisher),
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delivery::Attachment => write!(f, "attachment"),
            Delivery::Upload(publisher) => write!(f, "upload to {}", publisher.upload_url()),
        }
    }
}

/// Read-only state shared by every request.
#[derive(Debug, Clone)]
pub struct RelayState {
    pub fetcher: HttpFetcher,
    pub delivery: Delivery,
}

impl RelayState {
    pub fn new(fetcher: HttpFetcher, delivery: Delivery) -> Self {
        Self { fetcher, delivery }
    }
}

/// Download `file_url` and convert it to CSV.
pub async fn fetch_and_convert(
    fetcher: &HttpFetcher,
    file_url: &str,
) -> Result<Vec<u8>, RelayError> {
    debug!("Fetching {}", file_url);
    let fetched = fetcher.fetch(file_url).await?;

    let bytes = fetched.bytes;
    let csv = tokio::task::spawn_blocking(move || convert(&bytes))
        .await
        .map_err(RelayError::from_join)??;

    info!("Converted {} into {} CSV bytes", file_url, csv.len());
    Ok(csv)
}

/// Parse the first sheet, normalize its text and encode it as CSV.
pub fn convert(workbook: &[u8]) -> Result<Vec<u8>, RelayError> {
    let dataset = read_first_sheet(workbook)?;
    debug!(
        "Parsed {} columns x {} rows",
        dataset.column_count(),
        dataset.row_count()
    );

    let dataset = normalize(dataset);
    Ok(encode_csv(&dataset)?)
}

/// Upload `csv`, turning a non-200/201 answer into an error.
pub async fn publish(publisher: &GraphPublisher, csv: Vec<u8>) -> Result<(), RelayError> {
    match publisher.publish(csv).await? {
        UploadResult::Success { .. } => Ok(()),
        UploadResult::Failure { status, body } => Err(RelayError::UploadRejected { status, body }),
    }
}
