//! OAuth 2.0 client-credentials token exchange.

use crate::credentials::{CredentialSet, GraphEndpoints};
use reqwest::StatusCode;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Longest slice of a non-JSON token response kept in an error.
const MAX_REASON_LEN: usize = 512;

/// Bearer token for a single upload. Never cached.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw bearer value.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken(<redacted>)")
    }
}

/// Token acquisition failures.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    /// The token endpoint could not be reached at all.
    #[error("Token endpoint unreachable ({url}): {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered without an access token.
    #[error("Token request rejected with status {}: {reason}", status.as_u16())]
    Rejected { status: StatusCode, reason: String },
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    expires_in: Option<u64>,
}

/// Exchanges the static client credentials for a bearer token.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    client: reqwest::Client,
    credentials: Arc<CredentialSet>,
    endpoints: GraphEndpoints,
}

impl TokenProvider {
    pub fn new(
        credentials: Arc<CredentialSet>,
        endpoints: GraphEndpoints,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AuthError::Client)?;
        Ok(Self {
            client,
            credentials,
            endpoints,
        })
    }

    /// Request a fresh token with the `client_credentials` grant.
    pub async fn acquire(&self) -> Result<AccessToken, AuthError> {
        let url = self.endpoints.token_url(&self.credentials.tenant_id);
        let scope = self.endpoints.scope();

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        debug!("Requesting access token from {}", url);

        let response = self
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(|source| AuthError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| AuthError::Request {
                url: url.clone(),
                source,
            })?;

        let result = parse_token_response(status, &body);
        match &result {
            Ok(_) => debug!("Access token acquired (status {})", status),
            Err(e) => warn!("{}", e),
        }
        result
    }
}

/// Extract the access token, or explain why the response has none.
fn parse_token_response(status: StatusCode, body: &str) -> Result<AccessToken, AuthError> {
    match serde_json::from_str::<TokenResponse>(body) {
        Ok(TokenResponse {
            access_token: Some(token),
            expires_in,
            ..
        }) if !token.is_empty() => {
            if let Some(secs) = expires_in {
                debug!("Token valid for {}s", secs);
            }
            Ok(AccessToken(token))
        }
        Ok(response) => Err(AuthError::Rejected {
            status,
            reason: response
                .error_description
                .or(response.error)
                .unwrap_or_else(|| "response did not contain an access_token".to_string()),
        }),
        Err(_) => Err(AuthError::Rejected {
            status,
            reason: truncate(body.trim(), MAX_REASON_LEN),
        }),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &s[..end])
}
