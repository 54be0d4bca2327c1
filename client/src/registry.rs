//! Known devices, cached locally and refreshed from the remote authority.

use crate::{LocalStore, RemoteApi};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tandem_engine::{DeviceCache, DeviceId, DeviceRecord, DeviceStatus, Timestamp};

/// Device cache backed by the local store.
///
/// Every operation returns a value; remote failures only mean the cache is
/// served as-is.
pub struct DeviceRegistry<R> {
    remote: Arc<R>,
    store: Arc<LocalStore>,
    cache: Mutex<DeviceCache>,
    device_id: DeviceId,
}

impl<R: RemoteApi> DeviceRegistry<R> {
    /// Load the cached devices from `store`.
    pub fn new(remote: Arc<R>, store: Arc<LocalStore>, device_id: DeviceId) -> Self {
        let cache = store.load_devices();
        Self {
            remote,
            store,
            cache: Mutex::new(cache),
            device_id,
        }
    }

    fn cache(&self) -> MutexGuard<'_, DeviceCache> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The record describing this installation.
    pub fn local_device(
        &self,
        display_name: impl Into<String>,
        platform: impl Into<String>,
        os_version: impl Into<String>,
    ) -> DeviceRecord {
        let mut device = DeviceRecord::new(
            self.device_id.clone(),
            display_name,
            platform,
            os_version,
        );
        device.is_online = true;
        device
    }

    /// Register a device remotely and cache it whatever the outcome.
    ///
    /// Returns whether the remote accepted the registration.
    pub async fn register_device(&self, device: DeviceRecord) -> bool {
        let response = self.remote.register_device(&device).await;
        if response.success {
            tracing::info!(device_id = %device.id, "Device registered");
        } else {
            tracing::warn!(
                device_id = %device.id,
                error = response.error.as_deref().unwrap_or_default(),
                "Device registration failed, caching locally"
            );
        }

        let snapshot = {
            let mut cache = self.cache();
            cache.upsert(device);
            cache.clone()
        };
        self.store.save_devices(&snapshot);
        response.success
    }

    /// Refresh the cache from the remote; on failure serve the cache.
    pub async fn list_devices(&self) -> Vec<DeviceRecord> {
        let response = self.remote.connected_devices().await;
        match response.into_result() {
            Ok(devices) => {
                let devices = devices.unwrap_or_default();
                tracing::debug!(count = devices.len(), "Device list refreshed");
                let snapshot = {
                    let mut cache = self.cache();
                    cache.replace_all(devices);
                    cache.clone()
                };
                self.store.save_devices(&snapshot);
                snapshot.list()
            }
            Err(error) => {
                tracing::warn!(%error, "Failed to list devices, using cache");
                self.cached()
            }
        }
    }

    /// Report this device's status and mirror it into the cache.
    pub async fn update_status(&self, online: bool, now: Timestamp) -> bool {
        let status = DeviceStatus::synced(online, now);
        let response = self
            .remote
            .update_device_status(&self.device_id, &status)
            .await;
        if !response.success {
            tracing::warn!(
                device_id = %self.device_id,
                error = response.error.as_deref().unwrap_or_default(),
                "Failed to update device status"
            );
        }

        let snapshot = {
            let mut cache = self.cache();
            cache
                .apply_status(&self.device_id, &status)
                .then(|| cache.clone())
        };
        if let Some(snapshot) = snapshot {
            self.store.save_devices(&snapshot);
        }
        response.success
    }

    /// Cached devices without contacting the remote.
    pub fn cached(&self) -> Vec<DeviceRecord> {
        self.cache().list()
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}
