//! HTTP implementation of [`RemoteApi`].

use super::{retry::with_backoff, AnalyticsEvent, ApiResponse, RemoteApi};
use crate::{ApiConfig, Connectivity, Error, Result};
use reqwest::Method;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::RwLock;
use tandem_engine::{DeviceRecord, DeviceStatus, Resolution, SyncRecord, Timestamp};

/// One logical request, replayed on every attempt.
struct Request<'a> {
    method: Method,
    path: String,
    query: Vec<(&'static str, String)>,
    body: Option<&'a Value>,
}

impl<'a> Request<'a> {
    fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    fn send(method: Method, path: impl Into<String>, body: &'a Value) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    fn query(mut self, key: &'static str, value: String) -> Self {
        self.query.push((key, value));
        self
    }
}

/// Authenticated HTTP client for the remote authority.
///
/// Requests carry `X-API-Key` and, when a token is set, a bearer token. Each
/// attempt is bounded by the configured timeout; failed attempts are retried
/// with exponential backoff while the device stays online.
#[derive(Debug)]
pub struct HttpTransport {
    client: reqwest::Client,
    config: ApiConfig,
    max_retries: AtomicU32,
    connectivity: Connectivity,
    auth_token: RwLock<Option<String>>,
}

impl HttpTransport {
    pub fn new(config: ApiConfig, max_retries: u32, connectivity: Connectivity) -> Result<Self> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            config,
            max_retries: AtomicU32::new(max_retries),
            connectivity,
            auth_token: RwLock::new(None),
        })
    }

    pub fn with_auth_token(self, token: Option<String>) -> Self {
        self.set_auth_token(token);
        self
    }

    /// Replace the bearer token used for subsequent requests.
    pub fn set_auth_token(&self, token: Option<String>) {
        let mut guard = self
            .auth_token
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *guard = token;
    }

    fn auth_token(&self) -> Option<String> {
        self.auth_token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    async fn request<T: DeserializeOwned>(&self, request: Request<'_>) -> ApiResponse<T> {
        let max_retries = self.max_retries.load(Ordering::Relaxed);
        let result = with_backoff(max_retries, |attempt| self.attempt(&request, attempt)).await;

        match result {
            Ok(data) => ApiResponse::ok(data),
            Err(err) => {
                tracing::warn!(
                    method = %request.method,
                    path = %request.path,
                    error = %err,
                    "API request failed"
                );
                ApiResponse::failure(err.to_string())
            }
        }
    }

    async fn attempt<T: DeserializeOwned>(&self, request: &Request<'_>, attempt: u32) -> Result<T> {
        if !self.connectivity.is_online() {
            return Err(Error::Offline);
        }

        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), request.path);
        tracing::debug!(method = %request.method, %url, attempt = attempt + 1, "Sending request");

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header("X-API-Key", &self.config.api_key)
            .timeout(self.config.timeout);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = self.auth_token() {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .and_then(|body| body.get("message")?.as_str().map(str::to_owned))
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            return Err(Error::Status {
                status: status.as_u16(),
                message,
            });
        }

        if bytes.is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn execute(&self, request: Request<'_>) -> ApiResponse<()> {
        self.request::<IgnoredAny>(request).await.map(|_| ())
    }
}

fn since_param(since: Timestamp) -> Option<String> {
    let millis = i64::try_from(since).ok()?;
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|t| t.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
}

impl RemoteApi for HttpTransport {
    async fn register_device(&self, device: &DeviceRecord) -> ApiResponse<()> {
        let body = match serde_json::to_value(device) {
            Ok(body) => body,
            Err(e) => return ApiResponse::failure(e.to_string()),
        };
        self.execute(Request::send(Method::POST, "/devices/register", &body))
            .await
    }

    async fn update_device_status(&self, device_id: &str, status: &DeviceStatus) -> ApiResponse<()> {
        let body = match serde_json::to_value(status) {
            Ok(body) => body,
            Err(e) => return ApiResponse::failure(e.to_string()),
        };
        let path = format!("/devices/{device_id}/status");
        self.execute(Request::send(Method::PUT, path, &body)).await
    }

    async fn connected_devices(&self) -> ApiResponse<Vec<DeviceRecord>> {
        self.request(Request::get("/devices/connected")).await
    }

    async fn upload(&self, records: &[SyncRecord]) -> ApiResponse<()> {
        let body = json!({ "data": records });
        self.execute(Request::send(Method::POST, "/sync/upload", &body))
            .await
    }

    async fn download(
        &self,
        device_id: &str,
        since: Option<Timestamp>,
    ) -> ApiResponse<Vec<SyncRecord>> {
        let mut request = Request::get(format!("/sync/download/{device_id}"));
        if let Some(since) = since.and_then(since_param) {
            request = request.query("since", since);
        }
        self.request(request).await
    }

    async fn conflicts(&self, device_id: &str) -> ApiResponse<Vec<SyncRecord>> {
        self.request(Request::get(format!("/sync/conflicts/{device_id}")))
            .await
    }

    async fn resolve_conflict(&self, conflict_id: &str, resolution: Resolution) -> ApiResponse<()> {
        let body = json!({ "resolution": resolution });
        let path = format!("/sync/conflicts/{conflict_id}/resolve");
        self.execute(Request::send(Method::POST, path, &body)).await
    }

    async fn user_preferences(&self) -> ApiResponse<Value> {
        self.request(Request::get("/user/preferences")).await
    }

    async fn update_user_preferences(&self, preferences: &Value) -> ApiResponse<()> {
        self.execute(Request::send(Method::PUT, "/user/preferences", preferences))
            .await
    }

    async fn send_analytics(&self, event: &AnalyticsEvent) -> ApiResponse<()> {
        let body = match serde_json::to_value(event) {
            Ok(body) => body,
            Err(e) => return ApiResponse::failure(e.to_string()),
        };
        self.execute(Request::send(Method::POST, "/analytics/track", &body))
            .await
    }

    async fn sync_stats(&self, device_id: &str) -> ApiResponse<Value> {
        self.request(Request::get(format!("/sync/stats/{device_id}")))
            .await
    }

    async fn health_check(&self) -> bool {
        self.execute(Request::get("/health")).await.success
    }

    fn set_max_retries(&self, max_retries: u32) {
        self.max_retries.store(max_retries, Ordering::Relaxed);
    }
}
