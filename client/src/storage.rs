//! Local key-value persistence.
//!
//! [`KvStore`] is the raw string store (in-memory or one file per key);
//! [`LocalStore`] layers typed, versioned access on top of it. Every value is
//! written inside a [`tandem_engine::Envelope`].
//!
//! Persistence failures never propagate: they are logged and the caller's
//! in-memory copy stays authoritative until the next successful write.

use crate::{now_millis, Result};
use dashmap::DashMap;
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tandem_engine::{ChangeQueue, DeviceCache, DeviceId, Envelope, SyncRecord, SyncState};

/// Keys used in the local store.
pub mod keys {
    pub const PENDING_CHANGES: &str = "pending_changes";
    pub const SYNC_STATE: &str = "sync_state";
    pub const REGISTERED_DEVICES: &str = "registered_devices";
    pub const SYNCED_DATA: &str = "synced_data";
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const DEVICE_ID: &str = "device_id";
}

/// A synchronous string key-value store.
pub trait KvStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Volatile store, for tests and hosts that persist elsewhere.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).map(|v| v.value().clone()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed store with one JSON file per key.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KvStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        // Write then rename so a crash never leaves a truncated file
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        fs::write(&tmp, value)?;
        fs::rename(&tmp, self.path(key))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path(key)) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

/// Typed access to everything the sync engine persists.
#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KvStore>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// A store backed by a fresh [`MemoryStore`].
    pub fn memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.kv.get(key) {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read from local store");
                return None;
            }
        };

        match Envelope::<T>::from_json(&raw) {
            Ok(envelope) => Some(envelope.into_inner()),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding unreadable local data");
                None
            }
        }
    }

    fn save<T: Serialize>(&self, key: &str, value: &T) -> bool {
        let result = Envelope::new(value, now_millis())
            .to_json()
            .map_err(crate::Error::from)
            .and_then(|json| self.kv.set(key, &json));

        match result {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to write to local store");
                false
            }
        }
    }

    pub fn load_queue(&self) -> ChangeQueue {
        self.load(keys::PENDING_CHANGES).unwrap_or_default()
    }

    pub fn save_queue(&self, queue: &ChangeQueue) -> bool {
        self.save(keys::PENDING_CHANGES, queue)
    }

    pub fn load_state(&self) -> SyncState {
        self.load(keys::SYNC_STATE).unwrap_or_default()
    }

    pub fn save_state(&self, state: &SyncState) -> bool {
        self.save(keys::SYNC_STATE, state)
    }

    pub fn load_devices(&self) -> DeviceCache {
        self.load(keys::REGISTERED_DEVICES).unwrap_or_default()
    }

    pub fn save_devices(&self, devices: &DeviceCache) -> bool {
        self.save(keys::REGISTERED_DEVICES, devices)
    }

    pub fn load_synced(&self) -> Vec<SyncRecord> {
        self.load(keys::SYNCED_DATA).unwrap_or_default()
    }

    pub fn save_synced(&self, records: &[SyncRecord]) -> bool {
        self.save(keys::SYNCED_DATA, &records)
    }

    pub fn auth_token(&self) -> Option<String> {
        self.load(keys::AUTH_TOKEN)
    }

    pub fn set_auth_token(&self, token: Option<&str>) -> bool {
        match token {
            Some(token) => self.save(keys::AUTH_TOKEN, &token),
            None => match self.kv.remove(keys::AUTH_TOKEN) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to clear auth token");
                    false
                }
            },
        }
    }

    /// The stable identifier of this installation, generated on first use.
    pub fn device_id(&self) -> DeviceId {
        if let Some(id) = self.load::<DeviceId>(keys::DEVICE_ID) {
            return id;
        }

        let id = uuid::Uuid::new_v4().to_string();
        if self.save(keys::DEVICE_ID, &id) {
            tracing::info!(device_id = %id, "Generated device id");
        }
        id
    }
}
