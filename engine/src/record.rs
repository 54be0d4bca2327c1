//! Sync record types.

use crate::{checksum, DeviceId, Error, RecordId, Timestamp, Version};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Milliseconds in one day, used by retention cleanup.
pub const MS_PER_DAY: u64 = 86_400_000;

/// Kind of application data carried by a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordType {
    Settings,
    Conversation,
    Memory,
    Preference,
    Custom,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::Settings => "settings",
            RecordType::Conversation => "conversation",
            RecordType::Memory => "memory",
            RecordType::Preference => "preference",
            RecordType::Custom => "custom",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "settings" => Ok(RecordType::Settings),
            "conversation" => Ok(RecordType::Conversation),
            "memory" => Ok(RecordType::Memory),
            "preference" => Ok(RecordType::Preference),
            "custom" => Ok(RecordType::Custom),
            _ => Err(Error::UnknownRecordType(s.to_string())),
        }
    }
}

/// A single versioned, checksummed unit of data queued for propagation.
///
/// Records are immutable once minted. Conflict resolution produces a new
/// record rather than editing an existing one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRecord {
    /// Unique identifier for this record
    pub id: RecordId,
    /// Kind of data in the payload
    pub record_type: RecordType,
    /// Opaque application payload
    pub payload: serde_json::Value,
    /// When the record was minted (milliseconds since epoch)
    pub created_at: Timestamp,
    /// Device that produced the record
    pub origin_device_id: DeviceId,
    /// Version number, 1 for fresh records
    pub version: Version,
    /// Checksum of `payload`
    pub checksum: String,
}

impl SyncRecord {
    /// Mint a new record at version 1.
    pub fn new(
        id: impl Into<RecordId>,
        record_type: RecordType,
        payload: serde_json::Value,
        created_at: Timestamp,
        origin_device_id: impl Into<DeviceId>,
    ) -> Self {
        let checksum = checksum(&payload);
        Self {
            id: id.into(),
            record_type,
            payload,
            created_at,
            origin_device_id: origin_device_id.into(),
            version: 1,
            checksum,
        }
    }

    /// Set the version of a freshly minted record.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Check that the stored checksum still matches the payload.
    pub fn checksum_matches(&self) -> bool {
        self.checksum == checksum(&self.payload)
    }

    /// Whether this record was produced on the given device.
    pub fn originated_on(&self, device_id: &str) -> bool {
        self.origin_device_id == device_id
    }

    /// Age of the record in whole days at `now`.
    pub fn age_days(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.created_at) / MS_PER_DAY
    }
}

/// Drop records created at or before `now - retention_days`.
///
/// Returns the surviving records in their original order and the number of
/// records removed.
pub fn retain_within(
    records: Vec<SyncRecord>,
    now: Timestamp,
    retention_days: u32,
) -> (Vec<SyncRecord>, usize) {
    let cutoff = now.saturating_sub(u64::from(retention_days) * MS_PER_DAY);
    let before = records.len();
    let kept: Vec<_> = records
        .into_iter()
        .filter(|record| record.created_at > cutoff)
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}
