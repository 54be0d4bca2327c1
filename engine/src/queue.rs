//! Change queue - local mutations awaiting upload.
//!
//! The queue is append-only from the producer side. Records leave it only
//! through [`ChangeQueue::clear_uploaded`], once the remote authority has
//! confirmed them, so a failed upload never loses data.

use crate::{DeviceId, RecordId, RecordType, SyncRecord, Timestamp, Version};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Ordered collection of pending local records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeQueue {
    records: Vec<SyncRecord>,
}

impl ChangeQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Rebuild a queue from previously persisted records.
    pub fn from_records(records: Vec<SyncRecord>) -> Self {
        Self { records }
    }

    /// Mint a record at version 1 and append it.
    pub fn enqueue(
        &mut self,
        id: impl Into<RecordId>,
        record_type: RecordType,
        payload: serde_json::Value,
        now: Timestamp,
        origin: impl Into<DeviceId>,
    ) -> SyncRecord {
        self.enqueue_versioned(id, record_type, payload, now, origin, 1)
    }

    /// Mint a record with an explicit version and append it.
    pub fn enqueue_versioned(
        &mut self,
        id: impl Into<RecordId>,
        record_type: RecordType,
        payload: serde_json::Value,
        now: Timestamp,
        origin: impl Into<DeviceId>,
        version: Version,
    ) -> SyncRecord {
        let record = SyncRecord::new(id, record_type, payload, now, origin).with_version(version);
        self.records.push(record.clone());
        record
    }

    /// Current contents, oldest first. Nothing is removed.
    pub fn drain(&self) -> Vec<SyncRecord> {
        self.records.clone()
    }

    /// Remove records whose upload was confirmed.
    ///
    /// Returns the number of records removed. Unknown ids are ignored.
    pub fn clear_uploaded(&mut self, ids: &[RecordId]) -> usize {
        let uploaded: HashSet<&str> = ids.iter().map(String::as_str).collect();
        let before = self.records.len();
        self.records
            .retain(|record| !uploaded.contains(record.id.as_str()));
        before - self.records.len()
    }

    /// Newest queued record of a type produced by `origin`.
    pub fn latest_of(&self, record_type: RecordType, origin: &str) -> Option<&SyncRecord> {
        self.records
            .iter()
            .rev()
            .find(|record| record.record_type == record_type && record.originated_on(origin))
    }

    /// Borrow the queued records.
    pub fn records(&self) -> &[SyncRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
