//! Device records and the local device cache.

use crate::{DeviceId, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One known installation of the account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceRecord {
    pub id: DeviceId,
    pub display_name: String,
    pub platform: String,
    pub os_version: String,
    /// Last successful sync cycle (milliseconds since epoch)
    pub last_sync_time: Option<Timestamp>,
    pub is_online: bool,
}

impl DeviceRecord {
    pub fn new(
        id: impl Into<DeviceId>,
        display_name: impl Into<String>,
        platform: impl Into<String>,
        os_version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            platform: platform.into(),
            os_version: os_version.into(),
            last_sync_time: None,
            is_online: false,
        }
    }

    /// Apply a partial status update.
    pub fn apply_status(&mut self, status: &DeviceStatus) {
        if let Some(online) = status.is_online {
            self.is_online = online;
        }
        if let Some(time) = status.last_sync_time {
            self.last_sync_time = Some(time);
        }
    }
}

/// Partial device update pushed after each sync cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_online: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_sync_time: Option<Timestamp>,
}

impl DeviceStatus {
    /// Status reported at the end of a successful cycle.
    pub fn synced(online: bool, now: Timestamp) -> Self {
        Self {
            is_online: Some(online),
            last_sync_time: Some(now),
        }
    }
}

/// Local cache of known devices, keyed by id.
///
/// Uses BTreeMap so the listing order is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceCache {
    devices: BTreeMap<DeviceId, DeviceRecord>,
}

impl DeviceCache {
    pub fn new() -> Self {
        Self {
            devices: BTreeMap::new(),
        }
    }

    pub fn from_devices(devices: impl IntoIterator<Item = DeviceRecord>) -> Self {
        Self {
            devices: devices.into_iter().map(|d| (d.id.clone(), d)).collect(),
        }
    }

    /// Insert a device, replacing any entry with the same id.
    ///
    /// Returns true if the device was not known before.
    pub fn upsert(&mut self, device: DeviceRecord) -> bool {
        self.devices.insert(device.id.clone(), device).is_none()
    }

    /// Replace the whole cache with an authoritative list.
    pub fn replace_all(&mut self, devices: impl IntoIterator<Item = DeviceRecord>) {
        self.devices = devices.into_iter().map(|d| (d.id.clone(), d)).collect();
    }

    /// Apply a status update to a cached device. Unknown ids are ignored.
    pub fn apply_status(&mut self, id: &str, status: &DeviceStatus) -> bool {
        match self.devices.get_mut(id) {
            Some(device) => {
                device.apply_status(status);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &str) -> Option<&DeviceRecord> {
        self.devices.get(id)
    }

    pub fn list(&self) -> Vec<DeviceRecord> {
        self.devices.values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}
