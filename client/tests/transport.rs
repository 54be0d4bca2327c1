//! HttpTransport against a local axum server.

use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tandem_client::{ApiConfig, Connectivity, HttpTransport, NetworkState, RemoteApi};
use tandem_engine::{DeviceRecord, DeviceStatus, RecordType, Resolution, SyncRecord};

// =============================================================================
// Mock server
// =============================================================================

#[derive(Debug, Clone)]
struct Seen {
    method: Method,
    path: String,
    query: Option<String>,
    api_key: Option<String>,
    authorization: Option<String>,
    body: Value,
}

#[derive(Clone, Default)]
struct MockServer {
    seen: Arc<Mutex<Vec<Seen>>>,
    /// Requests answered with 503 before the server recovers
    failures: Arc<AtomicUsize>,
}

impl MockServer {
    fn requests(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

async fn handle(
    State(server): State<MockServer>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> Response {
    let path = uri.path().to_string();
    server.seen.lock().unwrap().push(Seen {
        method,
        path: path.clone(),
        query: uri.query().map(str::to_owned),
        api_key: header(&headers, "x-api-key"),
        authorization: header(&headers, "authorization"),
        body: serde_json::from_str(&body).unwrap_or(Value::Null),
    });

    let remaining = server.failures.load(Ordering::SeqCst);
    if remaining > 0 {
        server.failures.store(remaining - 1, Ordering::SeqCst);
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({ "message": "maintenance" })),
        )
            .into_response();
    }

    match path.as_str() {
        "/devices/connected" => Json(json!([{
            "id": "phone",
            "displayName": "Pixel",
            "platform": "android",
            "osVersion": "14",
            "lastSyncTime": null,
            "isOnline": true
        }]))
        .into_response(),
        "/sync/stats/unknown" => (StatusCode::NOT_FOUND, "no such device").into_response(),
        "/user/preferences" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            Json(json!({ "theme": "dark" })).into_response()
        }
        p if p.starts_with("/sync/download/") => {
            let record = SyncRecord::new("r-1", RecordType::Memory, json!({"note": "milk"}), 10, "phone");
            Json(json!([record])).into_response()
        }
        "/health" => Json(json!({ "status": "ok" })).into_response(),
        _ => StatusCode::OK.into_response(),
    }
}

async fn start_server() -> (String, MockServer) {
    let server = MockServer::default();
    let app = Router::new().fallback(handle).with_state(server.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), server)
}

fn transport(base_url: &str, max_retries: u32, token: Option<&str>) -> HttpTransport {
    HttpTransport::new(
        ApiConfig::new(base_url, "test-key"),
        max_retries,
        Connectivity::new(NetworkState::wifi()),
    )
    .unwrap()
    .with_auth_token(token.map(str::to_owned))
}

// =============================================================================
// Requests
// =============================================================================

#[tokio::test]
async fn sends_api_key_and_bearer_token() {
    let (url, server) = start_server().await;
    let transport = transport(&url, 0, Some("secret-token"));

    let response = transport.connected_devices().await;
    assert!(response.success);
    let devices = response.data.unwrap();
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0].display_name, "Pixel");

    let seen = server.requests();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].method, Method::GET);
    assert_eq!(seen[0].path, "/devices/connected");
    assert_eq!(seen[0].api_key.as_deref(), Some("test-key"));
    assert_eq!(seen[0].authorization.as_deref(), Some("Bearer secret-token"));
}

#[tokio::test]
async fn no_bearer_without_token() {
    let (url, server) = start_server().await;
    let transport = transport(&url, 0, None);

    assert!(transport.health_check().await);
    assert_eq!(server.requests()[0].authorization, None);
}

#[tokio::test]
async fn upload_wraps_records() {
    let (url, server) = start_server().await;
    let transport = transport(&url, 0, None);
    let record = SyncRecord::new("r-1", RecordType::Settings, json!({"theme": "dark"}), 1, "laptop");

    assert!(transport.upload(std::slice::from_ref(&record)).await.success);

    let seen = server.requests();
    assert_eq!(seen[0].method, Method::POST);
    assert_eq!(seen[0].path, "/sync/upload");
    assert_eq!(seen[0].body["data"][0]["id"], "r-1");
    assert_eq!(seen[0].body["data"][0]["recordType"], "settings");
    assert_eq!(seen[0].body["data"][0]["checksum"], record.checksum.as_str());
}

#[tokio::test]
async fn download_passes_since_as_rfc3339() {
    let (url, server) = start_server().await;
    let transport = transport(&url, 0, None);

    let response = transport.download("laptop", Some(1_706_745_600_000)).await;
    assert!(response.success);
    assert_eq!(response.data.unwrap()[0].id, "r-1");

    let response = transport.download("laptop", None).await;
    assert!(response.success);

    let seen = server.requests();
    assert_eq!(seen[0].path, "/sync/download/laptop");
    let query = seen[0].query.clone().unwrap().replace("%3A", ":");
    assert_eq!(query, "since=2024-02-01T00:00:00.000Z");
    assert_eq!(seen[1].query, None);
}

#[tokio::test]
async fn status_and_resolution_bodies() {
    let (url, server) = start_server().await;
    let transport = transport(&url, 0, None);

    let status = DeviceStatus::synced(true, 5_000);
    assert!(transport.update_device_status("laptop", &status).await.success);
    assert!(transport.resolve_conflict("c-1", Resolution::Merge).await.success);
    let device = DeviceRecord::new("laptop", "Work laptop", "linux", "6.8");
    assert!(transport.register_device(&device).await.success);

    let seen = server.requests();
    assert_eq!(seen[0].method, Method::PUT);
    assert_eq!(seen[0].path, "/devices/laptop/status");
    assert_eq!(seen[0].body, json!({"isOnline": true, "lastSyncTime": 5000}));

    assert_eq!(seen[1].path, "/sync/conflicts/c-1/resolve");
    assert_eq!(seen[1].body, json!({"resolution": "merge"}));

    assert_eq!(seen[2].path, "/devices/register");
    assert_eq!(seen[2].body["displayName"], "Work laptop");
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn error_message_comes_from_body() {
    let (url, server) = start_server().await;
    server.failures.store(1, Ordering::SeqCst);
    let transport = transport(&url, 0, None);

    let response = transport.conflicts("laptop").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("maintenance"));
}

#[tokio::test]
async fn error_message_falls_back_to_status() {
    let (url, _server) = start_server().await;
    let transport = transport(&url, 0, None);

    let response = transport.sync_stats("unknown").await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("HTTP 404"));
}

#[tokio::test]
async fn offline_never_reaches_the_server() {
    let (url, server) = start_server().await;
    let connectivity = Connectivity::new(NetworkState::offline());
    let transport =
        HttpTransport::new(ApiConfig::new(&url, "test-key"), 3, connectivity.clone()).unwrap();

    let started = Instant::now();
    let response = transport.upload(&[]).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("No internet connection"));
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(server.requests().is_empty());

    connectivity.set(NetworkState::wifi());
    assert!(transport.upload(&[]).await.success);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn retries_until_the_server_recovers() {
    let (url, server) = start_server().await;
    server.failures.store(1, Ordering::SeqCst);
    let transport = transport(&url, 1, None);

    let started = Instant::now();
    let response = transport.health_check().await;

    assert!(response);
    assert_eq!(server.requests().len(), 2);
    assert!(started.elapsed() >= Duration::from_secs(1));
}

#[tokio::test]
async fn retry_budget_can_be_lowered() {
    let (url, server) = start_server().await;
    server.failures.store(5, Ordering::SeqCst);
    let transport = transport(&url, 3, None);
    transport.set_max_retries(0);

    assert!(!transport.sync_stats("laptop").await.success);
    assert_eq!(server.requests().len(), 1);
}

#[tokio::test]
async fn slow_responses_time_out() {
    let (url, _server) = start_server().await;
    let transport = HttpTransport::new(
        ApiConfig::new(&url, "test-key").with_timeout(Duration::from_millis(100)),
        0,
        Connectivity::new(NetworkState::wifi()),
    )
    .unwrap();

    let started = Instant::now();
    let response = transport.user_preferences().await;
    assert!(!response.success);
    assert!(started.elapsed() < Duration::from_secs(2));
}
