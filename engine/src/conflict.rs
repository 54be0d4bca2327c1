//! Conflict resolution planning.
//!
//! A conflict is a [`SyncRecord`] the remote authority reports as colliding
//! with another device's write. Resolving it never edits existing records:
//! the plan either accepts the remote version as already applied, or asks the
//! caller to enqueue a brand-new record.
//!
//! # Strategies
//!
//! - [`Resolution::Local`] re-sends the local payload
//! - [`Resolution::Remote`] keeps what the download step already applied
//! - [`Resolution::Merge`] re-sends a shallow union of both payloads

use crate::{Error, RecordType, SyncRecord, Timestamp, Version};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

/// Marker field set on merged payloads.
pub const MERGED_MARKER: &str = "_merged";
/// Field holding the merge time on merged payloads.
pub const MERGE_TIME_MARKER: &str = "_mergeTime";

/// Strategy chosen by the user for an open conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resolution {
    /// Keep the local version and re-upload it
    Local,
    /// Accept the remote version
    Remote,
    /// Combine both versions
    Merge,
}

impl Resolution {
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::Local => "local",
            Resolution::Remote => "remote",
            Resolution::Merge => "merge",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" => Ok(Resolution::Local),
            "remote" => Ok(Resolution::Remote),
            "merge" => Ok(Resolution::Merge),
            other => Err(Error::UnknownResolution(other.to_string())),
        }
    }
}

/// What the caller must do locally to carry out a resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUp {
    /// Nothing to enqueue
    AcceptRemote,
    /// Enqueue a new record with this content
    Requeue {
        record_type: RecordType,
        payload: Value,
        version: Version,
    },
}

/// Decide the follow-up for a conflict.
///
/// `local` is the newest local record of the same type, if any. When the
/// conflict itself originated on `this_device`, its payload is the local one.
/// Requeued records supersede both sides, so their version is one above the
/// higher of the two.
pub fn plan_resolution(
    conflict: &SyncRecord,
    local: Option<&SyncRecord>,
    resolution: Resolution,
    this_device: &str,
    now: Timestamp,
) -> FollowUp {
    let version = local
        .map_or(conflict.version, |l| l.version.max(conflict.version))
        .saturating_add(1);

    let payload = match resolution {
        Resolution::Remote => return FollowUp::AcceptRemote,
        Resolution::Local => {
            if conflict.originated_on(this_device) {
                conflict.payload.clone()
            } else {
                local.map_or_else(|| conflict.payload.clone(), |l| l.payload.clone())
            }
        }
        Resolution::Merge => merge_payloads(local.map(|l| &l.payload), &conflict.payload, now),
    };

    FollowUp::Requeue {
        record_type: conflict.record_type,
        payload,
        version,
    }
}

/// Shallow-merge a local payload with a conflicting one.
///
/// For object payloads the result holds every field of both sides, with the
/// conflicting side winning on key collisions, plus merge markers. A
/// non-object conflicting payload is returned unchanged.
pub fn merge_payloads(local: Option<&Value>, conflicting: &Value, now: Timestamp) -> Value {
    let Value::Object(theirs) = conflicting else {
        return conflicting.clone();
    };

    let mut merged = match local {
        Some(Value::Object(ours)) => ours.clone(),
        _ => Map::new(),
    };
    for (key, value) in theirs {
        merged.insert(key.clone(), value.clone());
    }
    merged.insert(MERGED_MARKER.to_string(), Value::Bool(true));
    merged.insert(MERGE_TIME_MARKER.to_string(), Value::from(now));

    Value::Object(merged)
}
