//! Command-line interface for sheet-relay
//!
//! # Usage Examples
//!
//! ## Serve
//! ```bash
//! # Return converted CSV files as downloads
//! sheet-relay serve
//!
//! # Publish converted CSV files to OneDrive
//! sheet-relay serve --delivery upload \
//!   --client-id 00000000-0000-0000-0000-000000000000 \
//!   --tenant-id contoso.onmicrosoft.com \
//!   --upload-path /Imports/import_product.csv
//! ```
//!
//! ## One-off conversion
//! ```bash
//! sheet-relay convert --file-url https://example.com/products.xlsx --output products.csv
//! ```
//!
//! Logging verbosity follows `RUST_LOG`, e.g. `RUST_LOG=sheet_relay=debug`.

use clap::{Parser, Subcommand};
use sheet_relay::{ConvertOpts, ServeOpts};

#[derive(Parser)]
#[command(name = "sheet-relay")]
#[command(about = "Convert remote spreadsheets to UTF-8 CSV and deliver or publish them")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve POST /process_excel
    Serve(ServeOpts),

    /// Convert a single spreadsheet URL and exit
    Convert(ConvertOpts),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve(opts) => {
            let state = opts.build_state()?;
            sheet_relay::server::serve(opts.listen, state).await?;
        }
        Commands::Convert(opts) => {
            sheet_relay::convert(&opts).await?;
        }
    }

    Ok(())
}
