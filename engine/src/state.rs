//! Process-wide sync state.

use crate::{DeviceRecord, SyncRecord, Timestamp};
use serde::{Deserialize, Serialize};

/// Observable state of the sync engine.
///
/// `is_syncing` is runtime-only and never persisted, so a restored state
/// always starts idle. Every other field defaults when missing, which lets
/// older snapshots load after fields are added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    #[serde(skip)]
    pub is_syncing: bool,
    #[serde(default)]
    pub last_sync_time: Option<Timestamp>,
    #[serde(default)]
    pub pending_change_count: usize,
    #[serde(default)]
    pub conflicts: Vec<SyncRecord>,
    #[serde(default)]
    pub connected_devices: Vec<DeviceRecord>,
}

impl SyncState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an open conflict by record id.
    pub fn conflict(&self, id: &str) -> Option<&SyncRecord> {
        self.conflicts.iter().find(|c| c.id == id)
    }

    /// Remove and return an open conflict.
    pub fn take_conflict(&mut self, id: &str) -> Option<SyncRecord> {
        let index = self.conflicts.iter().position(|c| c.id == id)?;
        Some(self.conflicts.remove(index))
    }
}
