//! HTTP surface: a single `POST /process_excel` route.

use crate::error::RelayError;
use crate::pipeline::{fetch_and_convert, publish, Delivery, RelayState};
use anyhow::Context;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use sheet_relay_table::CSV_CONTENT_TYPE;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

pub const PROCESS_ROUTE: &str = "/process_excel";

/// Filename offered to the caller in attachment mode.
pub const ATTACHMENT_FILENAME: &str = "import_product.csv";

const ATTACHMENT_DISPOSITION: &str = "attachment; filename=\"import_product.csv\"";

pub const UPLOAD_SUCCESS_MESSAGE: &str = "File uploaded successfully";

pub fn router(state: Arc<RelayState>) -> Router {
    Router::new()
        .route(PROCESS_ROUTE, post(process_excel))
        .with_state(state)
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: RelayState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    info!(
        "Listening on {} (delivery: {})",
        listener.local_addr()?,
        state.delivery
    );

    axum::serve(listener, router(Arc::new(state)))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn process_excel(
    State(state): State<Arc<RelayState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    guarded(async move {
        match handle(&state, &headers, &body).await {
            Ok(response) => response,
            Err(e) => e.into_response(),
        }
    })
    .await
}

/// Run a request in its own task so a panic in any stage still produces a
/// JSON 500 and leaves the server running.
async fn guarded<F>(request: F) -> Response
where
    F: Future<Output = Response> + Send + 'static,
{
    match tokio::spawn(request).await {
        Ok(response) => response,
        Err(e) => RelayError::from_join(e).into_response(),
    }
}

async fn handle(
    state: &RelayState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<Response, RelayError> {
    let file_url = extract_file_url(headers, body)?;
    let csv = fetch_and_convert(&state.fetcher, &file_url).await?;

    match &state.delivery {
        Delivery::Attachment => Ok(attachment_response(csv)),
        Delivery::Upload(publisher) => {
            publish(publisher, csv).await?;
            Ok((
                StatusCode::OK,
                Json(json!({ "success": UPLOAD_SUCCESS_MESSAGE })),
            )
                .into_response())
        }
    }
}

/// Validate the request envelope and pull out a non-empty `file_url`.
pub fn extract_file_url(headers: &HeaderMap, body: &[u8]) -> Result<String, RelayError> {
    if !is_json(headers) {
        return Err(RelayError::UnsupportedMediaType);
    }

    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| RelayError::Input(format!("Invalid JSON body: {e}")))?;

    let file_url = payload
        .get("file_url")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| RelayError::Input("No file URL provided".to_string()))?;

    debug!("Accepted request for {}", file_url);
    Ok(file_url.to_string())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case("application/json"))
}

fn attachment_response(csv: Vec<u8>) -> Response {
    let headers = [
        (CONTENT_TYPE, HeaderValue::from_static(CSV_CONTENT_TYPE)),
        (CONTENT_DISPOSITION, HeaderValue::from_static(ATTACHMENT_DISPOSITION)),
    ];
    (StatusCode::OK, headers, csv).into_response()
}
