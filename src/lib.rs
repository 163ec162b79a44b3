//! sheet-relay library
//!
//! Turns a remote spreadsheet into UTF-8 CSV and either hands it back to the
//! caller or publishes it to a OneDrive / SharePoint drive through Microsoft
//! Graph.
//!
//! # Pipeline
//!
//! 1. Fetch the workbook from the caller-supplied URL (`sheet_relay_fetch`)
//! 2. Read the first sheet with every cell as text (`sheet_relay_table::workbook`)
//! 3. Replace no-break spaces with ordinary spaces (`sheet_relay_table::normalize`)
//! 4. Encode as BOM-prefixed CSV (`sheet_relay_table::encode`)
//! 5. Deliver as an attachment, or upload with a client-credentials token
//!    (`sheet_relay_graph`)
//!
//! # CLI Usage
//!
//! ```bash
//! # Serve POST /process_excel, returning the CSV as a download
//! sheet-relay serve --listen 0.0.0.0:10000
//!
//! # Serve and publish every converted file to OneDrive
//! CLIENT_ID=... CLIENT_SECRET=... TENANT_ID=... \
//!   sheet-relay serve --delivery upload --upload-path /Imports/import_product.csv
//!
//! # Convert a single file once
//! sheet-relay convert --file-url https://example.com/products.xlsx -o products.csv
//! ```

use anyhow::Context;
use clap::{Args, ValueEnum};
use sheet_relay_fetch::HttpFetcher;
use sheet_relay_graph::{
    CredentialSet, GraphEndpoints, GraphPublisher, PublishTimeouts, DEFAULT_AUTHORITY_HOST,
    DEFAULT_GRAPH_HOST, DEFAULT_UPLOAD_PATH,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;

pub use error::RelayError;
pub use pipeline::{Delivery, RelayState};

use config::parse_timeout;

/// How converted files leave the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeliveryMode {
    /// Return the CSV in the HTTP response
    Attachment,
    /// Upload the CSV to the configured drive path
    Upload,
}

impl std::fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attachment => write!(f, "attachment"),
            Self::Upload => write!(f, "upload"),
        }
    }
}

/// App registration and drive target for uploads.
#[derive(Args, Clone)]
pub struct GraphOpts {
    /// Application (client) ID of the app registration
    #[arg(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,

    /// Client secret of the app registration
    #[arg(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Directory (tenant) ID
    #[arg(long, env = "TENANT_ID")]
    pub tenant_id: Option<String>,

    /// Drive path the CSV is written to (overwritten on every upload)
    #[arg(long, env = "UPLOAD_PATH", default_value = DEFAULT_UPLOAD_PATH)]
    pub upload_path: String,

    /// Identity platform host
    #[arg(long, env = "GRAPH_AUTHORITY_HOST", default_value = DEFAULT_AUTHORITY_HOST)]
    pub authority_host: String,

    /// Microsoft Graph host
    #[arg(long, env = "GRAPH_HOST", default_value = DEFAULT_GRAPH_HOST)]
    pub graph_host: String,

    /// Upload into this user's drive instead of /me
    #[arg(long, env = "GRAPH_DRIVE_USER")]
    pub drive_user: Option<String>,
}

impl GraphOpts {
    /// Collect the credential set, naming every missing value.
    pub fn credentials(&self) -> anyhow::Result<CredentialSet> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }

        let client_id = present(&self.client_id);
        let client_secret = present(&self.client_secret);
        let tenant_id = present(&self.tenant_id);

        match (client_id, client_secret, tenant_id) {
            (Some(id), Some(secret), Some(tenant)) => Ok(CredentialSet::new(
                id,
                secret,
                tenant,
                self.upload_path.as_str(),
            )),
            _ => {
                let missing: Vec<&str> = [
                    ("CLIENT_ID", client_id),
                    ("CLIENT_SECRET", client_secret),
                    ("TENANT_ID", tenant_id),
                ]
                .into_iter()
                .filter(|(_, v)| v.is_none())
                .map(|(name, _)| name)
                .collect();
                anyhow::bail!("Upload delivery requires {}", missing.join(", "))
            }
        }
    }

    pub fn endpoints(&self) -> GraphEndpoints {
        GraphEndpoints {
            authority_host: self.authority_host.clone(),
            graph_host: self.graph_host.clone(),
            drive_user: self.drive_user.clone().filter(|u| !u.trim().is_empty()),
        }
    }

    pub fn publisher(&self, timeouts: &TimeoutOpts) -> anyhow::Result<GraphPublisher> {
        let credentials = Arc::new(self.credentials()?);
        GraphPublisher::new(credentials, self.endpoints(), timeouts.publish())
            .context("Failed to create Graph publisher")
    }
}

/// Deadlines for the three outbound calls.
#[derive(Args, Clone, Debug)]
pub struct TimeoutOpts {
    /// Timeout for downloading the source spreadsheet (e.g. "30s", "2m")
    #[arg(long, env = "FETCH_TIMEOUT", default_value = "30s", value_parser = parse_timeout)]
    pub fetch_timeout: Duration,

    /// Timeout for the OAuth token request
    #[arg(long, env = "TOKEN_TIMEOUT", default_value = "10s", value_parser = parse_timeout)]
    pub token_timeout: Duration,

    /// Timeout for the drive upload
    #[arg(long, env = "UPLOAD_TIMEOUT", default_value = "60s", value_parser = parse_timeout)]
    pub upload_timeout: Duration,
}

impl TimeoutOpts {
    pub fn publish(&self) -> PublishTimeouts {
        PublishTimeouts {
            token: self.token_timeout,
            upload: self.upload_timeout,
        }
    }

    pub fn fetcher(&self) -> anyhow::Result<HttpFetcher> {
        HttpFetcher::new(self.fetch_timeout).context("Failed to create HTTP fetcher")
    }
}

/// Options for `sheet-relay serve`.
#[derive(Args, Clone)]
pub struct ServeOpts {
    /// Address to listen on
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:10000")]
    pub listen: SocketAddr,

    /// What to do with the converted CSV
    #[arg(long, value_enum, env = "DELIVERY_MODE", default_value = "attachment")]
    pub delivery: DeliveryMode,

    #[command(flatten)]
    pub graph: GraphOpts,

    #[command(flatten)]
    pub timeouts: TimeoutOpts,
}

impl ServeOpts {
    /// Build the shared request state. Upload mode fails here when
    /// credentials are incomplete.
    pub fn build_state(&self) -> anyhow::Result<RelayState> {
        let fetcher = self.timeouts.fetcher()?;
        let delivery = match self.delivery {
            DeliveryMode::Attachment => Delivery::Attachment,
            DeliveryMode::Upload => Delivery::Upload(self.graph.publisher(&self.timeouts)?),
        };
        Ok(RelayState::new(fetcher, delivery))
    }
}

/// Options for `sheet-relay convert`.
#[derive(Args, Clone)]
pub struct ConvertOpts {
    /// URL of the spreadsheet to convert
    #[arg(long)]
    pub file_url: String,

    /// Where to write the CSV
    #[arg(long, short = 'o', default_value = server::ATTACHMENT_FILENAME)]
    pub output: PathBuf,

    /// Upload to the drive instead of writing a local file
    #[arg(long)]
    pub publish: bool,

    #[command(flatten)]
    pub graph: GraphOpts,

    #[command(flatten)]
    pub timeouts: TimeoutOpts,
}

/// Run the pipeline once for a single URL.
pub async fn convert(opts: &ConvertOpts) -> anyhow::Result<()> {
    let fetcher = opts.timeouts.fetcher()?;
    let csv = pipeline::fetch_and_convert(&fetcher, &opts.file_url).await?;

    if opts.publish {
        let publisher = opts.graph.publisher(&opts.timeouts)?;
        pipeline::publish(&publisher, csv).await?;
        info!("Uploaded {} to {}", opts.file_url, publisher.upload_url());
    } else {
        tokio::fs::write(&opts.output, &csv)
            .await
            .with_context(|| format!("Failed to write {}", opts.output.display()))?;
        info!(
            "Wrote {} bytes to {}",
            csv.len(),
            opts.output.display()
        );
    }

    Ok(())
}
