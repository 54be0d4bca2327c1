//! Remote authority access.
//!
//! [`RemoteApi`] is the logical RPC surface the sync components depend on;
//! [`HttpTransport`] implements it over HTTP. Every operation resolves to a
//! normalized [`ApiResponse`] and never returns an error or panics, so
//! callers only ever branch on `success`.

mod http;
mod retry;

pub use http::HttpTransport;
pub use retry::{backoff_delay, with_backoff};

use crate::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use tandem_engine::{DeviceRecord, DeviceStatus, Resolution, SyncRecord, Timestamp};

/// Normalized result of a remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When the response was produced (milliseconds since epoch)
    pub timestamp: Timestamp,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: now_millis(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            timestamp: now_millis(),
        }
    }

    /// Transform the payload, keeping status and timestamp.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ApiResponse<U> {
        ApiResponse {
            success: self.success,
            data: self.data.map(f),
            error: self.error,
            timestamp: self.timestamp,
        }
    }

    /// The payload on success, the error message otherwise.
    pub fn into_result(self) -> Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_else(|| "Unknown error".to_string()))
        }
    }
}

impl ApiResponse<()> {
    /// Successful call with no payload.
    pub fn done() -> Self {
        Self::ok(())
    }
}

/// Body of an analytics event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsEvent {
    pub event: String,
    pub data: Value,
    pub timestamp: Timestamp,
    pub device_id: String,
}

/// Operations offered by the remote authority.
pub trait RemoteApi: Send + Sync + 'static {
    fn register_device(
        &self,
        device: &DeviceRecord,
    ) -> impl Future<Output = ApiResponse<()>> + Send;

    fn update_device_status(
        &self,
        device_id: &str,
        status: &DeviceStatus,
    ) -> impl Future<Output = ApiResponse<()>> + Send;

    fn connected_devices(&self) -> impl Future<Output = ApiResponse<Vec<DeviceRecord>>> + Send;

    fn upload(&self, records: &[SyncRecord]) -> impl Future<Output = ApiResponse<()>> + Send;

    /// Records created after `since` (everything when `None`) for a device.
    fn download(
        &self,
        device_id: &str,
        since: Option<Timestamp>,
    ) -> impl Future<Output = ApiResponse<Vec<SyncRecord>>> + Send;

    fn conflicts(
        &self,
        device_id: &str,
    ) -> impl Future<Output = ApiResponse<Vec<SyncRecord>>> + Send;

    fn resolve_conflict(
        &self,
        conflict_id: &str,
        resolution: Resolution,
    ) -> impl Future<Output = ApiResponse<()>> + Send;

    fn user_preferences(&self) -> impl Future<Output = ApiResponse<Value>> + Send;

    fn update_user_preferences(
        &self,
        preferences: &Value,
    ) -> impl Future<Output = ApiResponse<()>> + Send;

    fn send_analytics(
        &self,
        event: &AnalyticsEvent,
    ) -> impl Future<Output = ApiResponse<()>> + Send;

    fn sync_stats(&self, device_id: &str) -> impl Future<Output = ApiResponse<Value>> + Send;

    /// True when the remote answers its health endpoint.
    fn health_check(&self) -> impl Future<Output = bool> + Send;

    /// Change how many times failed calls are retried.
    fn set_max_retries(&self, _max_retries: u32) {}
}
