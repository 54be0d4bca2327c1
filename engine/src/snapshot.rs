//! Versioned envelopes for persisting engine state.
//!
//! Everything the client writes to local storage (pending queue, sync state,
//! device cache, synced records) is wrapped in an [`Envelope`]. The format
//! version lets a newer build refuse data it does not understand instead of
//! silently misreading it, while `#[serde(default)]` fields on the wrapped
//! types let older data load after fields are added.

use crate::{error::Result, Error, Timestamp};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Version of the persistence format for future compatibility.
pub const FORMAT_VERSION: u32 = 1;

/// A versioned, timestamped wrapper around persisted data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    /// Persistence format version
    pub format_version: u32,
    /// When the data was written (milliseconds since epoch)
    pub saved_at: Timestamp,
    /// The wrapped value
    pub data: T,
}

impl<T> Envelope<T> {
    /// Wrap a value at the current format version.
    pub fn new(data: T, saved_at: Timestamp) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            saved_at,
            data,
        }
    }

    /// Unwrap the stored value.
    pub fn into_inner(self) -> T {
        self.data
    }
}

impl<T: Serialize> Envelope<T> {
    /// Serialize to JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }
}

impl<T: DeserializeOwned> Envelope<T> {
    /// Deserialize from JSON, rejecting newer format versions.
    pub fn from_json(json: &str) -> Result<Self> {
        let envelope: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))?;

        if envelope.format_version > FORMAT_VERSION {
            return Err(Error::UnsupportedFormat {
                found: envelope.format_version,
                supported: FORMAT_VERSION,
            });
        }

        Ok(envelope)
    }
}
