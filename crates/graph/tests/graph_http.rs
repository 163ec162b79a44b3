//! Integration tests for token acquisition and drive upload
//!
//! A local axum server plays both the identity platform and the Graph drive.

use axum::{
    body::Bytes,
    extract::{Form, Path, State},
    http::{HeaderMap, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use sheet_relay_graph::{
    AccessToken, AuthError, CredentialSet, GraphEndpoints, GraphPublisher, PublishError,
    PublishTimeouts, TokenProvider, UploadResult,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
struct RecordedRequest {
    method: Method,
    path: String,
    authorization: Option<String>,
    content_type: Option<String>,
    body: Vec<u8>,
}

/// Canned responses and a log of what the server received
struct MockGraph {
    token_status: StatusCode,
    token_body: String,
    upload_status: StatusCode,
    upload_body: String,
    token_forms: Mutex<Vec<(String, HashMap<String, String>)>>,
    uploads: Mutex<Vec<RecordedRequest>>,
}

impl MockGraph {
    fn new(token_status: StatusCode, token_body: &str, upload_status: StatusCode) -> Self {
        Self {
            token_status,
            token_body: token_body.to_string(),
            upload_status,
            upload_body: r#"{"error":{"code":"accessDenied","message":"Access denied"}}"#
                .to_string(),
            token_forms: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }
}

async fn token(
    State(mock): State<Arc<MockGraph>>,
    Path(tenant): Path<String>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    mock.token_forms.lock().unwrap().push((tenant, form));
    (
        mock.token_status,
        [("Content-Type", "application/json")],
        mock.token_body.clone(),
    )
        .into_response()
}

async fn drive(
    State(mock): State<Arc<MockGraph>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    mock.uploads.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        authorization: header("authorization"),
        content_type: header("content-type"),
        body: body.to_vec(),
    });

    if mock.upload_status.is_success() {
        (mock.upload_status, r#"{"id":"01ABC","name":"import_product.csv"}"#).into_response()
    } else {
        (mock.upload_status, mock.upload_body.clone()).into_response()
    }
}

async fn start_mock(mock: Arc<MockGraph>) -> (GraphEndpoints, tokio::task::JoinHandle<()>) {
    let app = Router::new()
        .route("/:tenant/oauth2/v2.0/token", post(token))
        .fallback(drive)
        .with_state(mock);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let base = format!("http://{addr}");
    let endpoints = GraphEndpoints {
        authority_host: base.clone(),
        graph_host: base,
        drive_user: None,
    };
    (endpoints, handle)
}

fn credentials() -> Arc<CredentialSet> {
    Arc::new(CredentialSet::new(
        "client-123",
        "s3cr3t",
        "tenant-abc",
        "/Products/import_product.csv",
    ))
}

#[tokio::test]
async fn test_publish_sends_bearer_token_and_csv() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("debug")
        .try_init();

    let mock = Arc::new(MockGraph::new(
        StatusCode::OK,
        r#"{"token_type":"Bearer","expires_in":3599,"access_token":"T"}"#,
        StatusCode::CREATED,
    ));
    let (endpoints, server) = start_mock(mock.clone()).await;

    let publisher =
        GraphPublisher::new(credentials(), endpoints.clone(), PublishTimeouts::default()).unwrap();
    let csv = b"\xEF\xBB\xBFSKU,Name\r\nA1,Foo Bar\r\n".to_vec();

    let result = publisher.publish(csv.clone()).await.unwrap();
    assert_eq!(
        result,
        UploadResult::Success {
            status: StatusCode::CREATED
        }
    );

    let forms = mock.token_forms.lock().unwrap().clone();
    assert_eq!(forms.len(), 1);
    let (tenant, form) = &forms[0];
    assert_eq!(tenant, "tenant-abc");
    assert_eq!(form["grant_type"], "client_credentials");
    assert_eq!(form["client_id"], "client-123");
    assert_eq!(form["client_secret"], "s3cr3t");
    assert_eq!(form["scope"], endpoints.scope());

    let uploads = mock.uploads.lock().unwrap().clone();
    assert_eq!(uploads.len(), 1);
    let upload = &uploads[0];
    assert_eq!(upload.method, Method::PUT);
    assert_eq!(
        upload.path,
        "/v1.0/me/drive/root:/Products/import_product.csv:/content"
    );
    assert_eq!(upload.authorization.as_deref(), Some("Bearer T"));
    assert_eq!(upload.content_type.as_deref(), Some("text/csv"));
    assert_eq!(upload.body, csv);

    server.abort();
}

#[tokio::test]
async fn test_upload_replaced_file_is_success() {
    let mock = Arc::new(MockGraph::new(
        StatusCode::OK,
        r#"{"access_token":"T"}"#,
        StatusCode::OK,
    ));
    let (endpoints, server) = start_mock(mock).await;

    let publisher =
        GraphPublisher::new(credentials(), endpoints, PublishTimeouts::default()).unwrap();
    let result = publisher
        .upload(&AccessToken::new("T"), b"a\r\n".to_vec())
        .await
        .unwrap();
    assert!(result.is_success());

    server.abort();
}

#[tokio::test]
async fn test_upload_failure_captures_status_and_body() {
    let mock = Arc::new(MockGraph::new(
        StatusCode::OK,
        r#"{"access_token":"T"}"#,
        StatusCode::FORBIDDEN,
    ));
    let (endpoints, server) = start_mock(mock).await;

    let publisher =
        GraphPublisher::new(credentials(), endpoints, PublishTimeouts::default()).unwrap();
    let result = publisher.publish(b"a\r\n".to_vec()).await.unwrap();

    match result {
        UploadResult::Failure { status, body } => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert!(body.contains("accessDenied"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    server.abort();
}

#[tokio::test]
async fn test_accepted_is_not_success() {
    let mock = Arc::new(MockGraph::new(
        StatusCode::OK,
        r#"{"access_token":"T"}"#,
        StatusCode::ACCEPTED,
    ));
    let (endpoints, server) = start_mock(mock).await;

    let publisher =
        GraphPublisher::new(credentials(), endpoints, PublishTimeouts::default()).unwrap();
    let result = publisher.publish(b"a\r\n".to_vec()).await.unwrap();
    assert!(matches!(
        result,
        UploadResult::Failure {
            status: StatusCode::ACCEPTED,
            ..
        }
    ));

    server.abort();
}

#[tokio::test]
async fn test_rejected_credentials_skip_upload() {
    let mock = Arc::new(MockGraph::new(
        StatusCode::UNAUTHORIZED,
        r#"{"error":"invalid_client","error_description":"AADSTS7000215: Invalid client secret provided."}"#,
        StatusCode::CREATED,
    ));
    let (endpoints, server) = start_mock(mock.clone()).await;

    let publisher =
        GraphPublisher::new(credentials(), endpoints, PublishTimeouts::default()).unwrap();
    let err = publisher.publish(b"a\r\n".to_vec()).await.unwrap_err();

    match err {
        PublishError::Auth(AuthError::Rejected { status, reason }) => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert!(reason.contains("AADSTS7000215"));
        }
        other => panic!("expected auth rejection, got {other:?}"),
    }
    assert!(mock.uploads.lock().unwrap().is_empty());

    server.abort();
}

#[tokio::test]
async fn test_unreachable_token_endpoint_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let endpoints = GraphEndpoints {
        authority_host: format!("http://{addr}"),
        graph_host: format!("http://{addr}"),
        drive_user: None,
    };
    let provider = TokenProvider::new(credentials(), endpoints, Duration::from_secs(2)).unwrap();

    let err = provider.acquire().await.unwrap_err();
    assert!(matches!(err, AuthError::Request { .. }));
}

async fn slow_token() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    (StatusCode::OK, r#"{"access_token":"T"}"#).into_response()
}

async fn fast_token() -> Response {
    (
        StatusCode::OK,
        [("Content-Type", "application/json")],
        r#"{"access_token":"T"}"#,
    )
        .into_response()
}

async fn slow_drive() -> Response {
    tokio::time::sleep(Duration::from_secs(5)).await;
    (StatusCode::CREATED, "{}").into_response()
}

async fn start_router(app: Router) -> (GraphEndpoints, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let base = format!("http://{addr}");
    let endpoints = GraphEndpoints {
        authority_host: base.clone(),
        graph_host: base,
        drive_user: None,
    };
    (endpoints, handle)
}

#[tokio::test]
async fn test_slow_token_endpoint_times_out() {
    let app = Router::new().route("/:tenant/oauth2/v2.0/token", post(slow_token));
    let (endpoints, server) = start_router(app).await;

    let provider =
        TokenProvider::new(credentials(), endpoints, Duration::from_millis(200)).unwrap();
    let err = provider.acquire().await.unwrap_err();

    match err {
        AuthError::Request { source, .. } => assert!(source.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }

    server.abort();
}

#[tokio::test]
async fn test_slow_drive_upload_times_out() {
    let app = Router::new()
        .route("/:tenant/oauth2/v2.0/token", post(fast_token))
        .fallback(slow_drive);
    let (endpoints, server) = start_router(app).await;

    let timeouts = PublishTimeouts {
        token: Duration::from_secs(5),
        upload: Duration::from_millis(200),
    };
    let publisher = GraphPublisher::new(credentials(), endpoints, timeouts).unwrap();
    let err = publisher.publish(b"a\r\n".to_vec()).await.unwrap_err();

    match err {
        PublishError::Request { source, .. } => assert!(source.is_timeout()),
        other => panic!("expected timeout, got {other:?}"),
    }

    server.abort();
}

/// Reads one HTTP request, then answers 403 with a body shorter than its
/// declared length and closes the connection.
async fn truncated_drive(listener: TcpListener) {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    let (mut socket, _) = listener.accept().await.unwrap();
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        request.extend_from_slice(&buf[..n]);

        let text = String::from_utf8_lossy(&request).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .filter_map(|line| line.split_once(':'))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
                .and_then(|(_, value)| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
    }

    socket
        .write_all(b"HTTP/1.1 403 Forbidden\r\nContent-Length: 100\r\n\r\npartial")
        .await
        .unwrap();
    socket.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unreadable_failure_body_is_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(truncated_drive(listener));

    let endpoints = GraphEndpoints {
        authority_host: format!("http://{addr}"),
        graph_host: format!("http://{addr}"),
        drive_user: None,
    };
    let publisher =
        GraphPublisher::new(credentials(), endpoints, PublishTimeouts::default()).unwrap();
    let result = publisher
        .upload(&AccessToken::new("T"), b"a\r\n".to_vec())
        .await
        .unwrap();

    match result {
        UploadResult::Failure { status, body } => {
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert!(body.starts_with("<failed to read response body"));
        }
        other => panic!("expected failure, got {other:?}"),
    }

    server.await.unwrap();
}
