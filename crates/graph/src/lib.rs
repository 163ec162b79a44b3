//! Microsoft Graph publishing for sheet-relay
//!
//! Converts static app-registration credentials into a bearer token with the
//! OAuth 2.0 client-credentials grant, then PUTs the CSV into a drive path.
//! A fresh token is requested for every upload.
//!
//! # Example
//!
//! ```ignore
//! use sheet_relay_graph::{CredentialSet, GraphEndpoints, GraphPublisher, PublishTimeouts};
//! use std::sync::Arc;
//!
//! let credentials = Arc::new(CredentialSet::new(id, secret, tenant, "/import_product.csv"));
//! let publisher = GraphPublisher::new(credentials, GraphEndpoints::default(), PublishTimeouts::default())?;
//! let result = publisher.publish(csv_bytes).await?;
//! ```

mod auth;
mod credentials;
mod upload;

pub use auth::{AccessToken, AuthError, TokenProvider};
pub use credentials::{
    CredentialSet, GraphEndpoints, DEFAULT_AUTHORITY_HOST, DEFAULT_GRAPH_HOST, DEFAULT_UPLOAD_PATH,
};
pub use upload::{GraphPublisher, PublishError, PublishTimeouts, UploadResult, UPLOAD_CONTENT_TYPE};
