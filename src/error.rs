//! Error taxonomy of the relay pipeline and its mapping to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sheet_relay_fetch::FetchError;
use sheet_relay_graph::PublishError;
use sheet_relay_table::{EncodeError, WorkbookError};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

/// Every way a request can fail, one variant per pipeline stage.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Request must be JSON")]
    UnsupportedMediaType,

    /// Missing or malformed request field
    #[error("{0}")]
    Input(String),

    #[error("Failed to fetch file: {0}")]
    Fetch(#[from] FetchError),

    #[error("Failed to parse spreadsheet: {0}")]
    Parse(#[from] WorkbookError),

    #[error("Failed to encode CSV: {0}")]
    Encode(#[from] EncodeError),

    /// Token acquisition or transport failure during upload
    #[error("{0}")]
    Publish(#[from] PublishError),

    /// The drive answered with something other than 200/201
    #[error("Upload failed with status {}: {body}", status.as_u16())]
    UploadRejected { status: StatusCode, body: String },

    /// Panics and cancelled tasks
    #[error("{0}")]
    Unhandled(String),
}

impl RelayError {
    /// HTTP status returned to the caller.
    ///
    /// Upload-stage failures are reported with 200 and an `error` body; the
    /// caller inspects the JSON rather than the status.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RelayError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            RelayError::Input(_) | RelayError::Fetch(_) => StatusCode::BAD_REQUEST,
            RelayError::Parse(_) | RelayError::Encode(_) | RelayError::Unhandled(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            RelayError::Publish(_) | RelayError::UploadRejected { .. } => StatusCode::OK,
        }
    }

    /// Convert a failed task into an error carrying the panic message.
    pub fn from_join(err: JoinError) -> Self {
        if !err.is_panic() {
            return RelayError::Unhandled(err.to_string());
        }

        let payload = err.into_panic();
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "Unexpected internal error".to_string());
        RelayError::Unhandled(message)
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = self.to_string();

        match &self {
            RelayError::UnsupportedMediaType | RelayError::Input(_) | RelayError::Fetch(_) => {
                warn!("Rejected request ({}): {}", status.as_u16(), message)
            }
            _ => error!("Request failed ({}): {}", status.as_u16(), message),
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
