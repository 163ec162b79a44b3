//! Drive upload through Microsoft Graph.

use crate::auth::{AccessToken, AuthError, TokenProvider};
use crate::credentials::{CredentialSet, GraphEndpoints};
use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Content type sent with the uploaded file.
pub const UPLOAD_CONTENT_TYPE: &str = "text/csv";

/// Outcome of a completed upload request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadResult {
    /// Drive answered 200 (replaced) or 201 (created)
    Success { status: StatusCode },
    /// Any other status, with the response body as returned
    Failure { status: StatusCode, body: String },
}

impl UploadResult {
    pub fn is_success(&self) -> bool {
        matches!(self, UploadResult::Success { .. })
    }
}

/// Errors that prevent an upload from completing.
#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("Failed to obtain access token: {0}")]
    Auth(#[source] AuthError),

    #[error("Upload request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

impl From<AuthError> for PublishError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Client(source) => PublishError::Client(source),
            other => PublishError::Auth(other),
        }
    }
}

/// Deadlines for the two outbound calls of a publish.
#[derive(Debug, Clone, Copy)]
pub struct PublishTimeouts {
    pub token: Duration,
    pub upload: Duration,
}

impl Default for PublishTimeouts {
    fn default() -> Self {
        Self {
            token: Duration::from_secs(10),
            upload: Duration::from_secs(60),
        }
    }
}

/// Uploads CSV bytes to a fixed drive path, overwriting what is there.
#[derive(Debug, Clone)]
pub struct GraphPublisher {
    client: reqwest::Client,
    tokens: TokenProvider,
    upload_url: String,
}

impl GraphPublisher {
    pub fn new(
        credentials: Arc<CredentialSet>,
        endpoints: GraphEndpoints,
        timeouts: PublishTimeouts,
    ) -> Result<Self, PublishError> {
        let upload_url = endpoints.upload_url(&credentials.upload_path);
        let tokens = TokenProvider::new(credentials, endpoints, timeouts.token)?;
        let client = reqwest::Client::builder()
            .timeout(timeouts.upload)
            .build()
            .map_err(PublishError::Client)?;

        Ok(Self {
            client,
            tokens,
            upload_url,
        })
    }

    /// Target URL of the PUT request.
    pub fn upload_url(&self) -> &str {
        &self.upload_url
    }

    /// Acquire a fresh token, then upload `csv`.
    pub async fn publish(&self, csv: Vec<u8>) -> Result<UploadResult, PublishError> {
        let token = self.tokens.acquire().await?;
        self.upload(&token, csv).await
    }

    /// PUT `csv` to the drive path with `token` as bearer.
    ///
    /// No retry and no read-back of the written content.
    pub async fn upload(
        &self,
        token: &AccessToken,
        csv: Vec<u8>,
    ) -> Result<UploadResult, PublishError> {
        let size = csv.len();

        let response = self
            .client
            .put(&self.upload_url)
            .bearer_auth(token.secret())
            .header(CONTENT_TYPE, UPLOAD_CONTENT_TYPE)
            .body(csv)
            .send()
            .await
            .map_err(|source| PublishError::Request {
                url: self.upload_url.clone(),
                source,
            })?;

        let status = response.status();
        if status == StatusCode::OK || status == StatusCode::CREATED {
            info!("Uploaded {} bytes to {} (status {})", size, self.upload_url, status);
            return Ok(UploadResult::Success { status });
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to read upload response from {}: {}", self.upload_url, e);
                format!("<failed to read response body: {e}>")
            }
        };
        warn!(
            "Upload to {} failed with status {}: {}",
            self.upload_url, status, body
        );
        Ok(UploadResult::Failure { status, body })
    }
}
