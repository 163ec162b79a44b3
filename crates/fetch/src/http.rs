//! HTTP/HTTPS fetcher implementation

use bytes::Bytes;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while downloading a source file.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The URL could not be parsed or uses an unsupported scheme.
    #[error("Invalid file URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The request never produced a response (DNS, connect, TLS, timeout, body read).
    #[error("Failed to fetch {url}: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The upstream server answered with a non-2xx status.
    #[error("Upstream returned status {} for {url}", status.as_u16())]
    Status { status: StatusCode, url: String },
}

impl FetchError {
    /// Upstream status code, when the server answered at all.
    pub fn upstream_status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::Request { source, .. } => source.status(),
            _ => None,
        }
    }
}

/// A successfully downloaded file.
#[derive(Debug, Clone)]
pub struct FetchedFile {
    /// Status of the upstream response (always 2xx)
    pub status: StatusCode,
    /// Raw response body
    pub bytes: Bytes,
}

/// Downloads files over HTTP/HTTPS with a fixed per-request deadline.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Create a fetcher whose requests are abandoned after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// GET `url` and return the body of a 2xx response.
    ///
    /// # Arguments
    /// * `url` - HTTP or HTTPS URL to fetch
    ///
    /// # Example
    /// ```ignore
    /// let fetched = fetcher.fetch("https://example.com/data.xlsx").await?;
    /// assert!(fetched.status.is_success());
    /// ```
    pub async fn fetch(&self, url: &str) -> Result<FetchedFile, FetchError> {
        let parsed = parse_source_url(url)?;

        let response = self
            .client
            .get(parsed)
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status,
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;

        tracing::debug!("Fetched {} bytes from: {}", bytes.len(), url);

        Ok(FetchedFile { status, bytes })
    }
}

/// Parse a caller-supplied URL, accepting only `http` and `https`.
pub(crate) fn parse_source_url(url: &str) -> Result<Url, FetchError> {
    let parsed = Url::parse(url.trim()).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(FetchError::InvalidUrl {
            url: url.to_string(),
            reason: format!("unsupported scheme '{other}'"),
        }),
    }
}
