//! # Tandem Engine
//!
//! The deterministic core of an offline-first, multi-device sync engine.
//!
//! This crate holds the data model and the pure algorithms of synchronization:
//! change records, the pending-change queue, device bookkeeping, the persisted
//! sync state, conflict resolution planning and retention cleanup. It performs
//! no IO; the `tandem-client` crate drives it over the network and persists it.
//!
//! ## Design Principles
//!
//! - **No IO**: ids and timestamps are passed in, never read from the system
//! - **Deterministic**: same inputs always produce same outputs
//! - **Versioned persistence**: everything that is stored goes through an [`Envelope`]
//!
//! ## Core Concepts
//!
//! ### Records
//!
//! A [`SyncRecord`] is one unit of data queued for cross-device propagation:
//! - Unique ID and a [`RecordType`] tag
//! - Opaque JSON payload
//! - Creation timestamp and originating device
//! - Version number
//! - Checksum of the payload (see [`checksum()`])
//!
//! ### Change Queue
//!
//! The [`ChangeQueue`] holds local records awaiting upload. Records leave the
//! queue only after the remote side has confirmed them.
//!
//! ### Conflicts
//!
//! The remote authority flags records that collide with another device's write.
//! [`plan_resolution`] turns a conflict and a [`Resolution`] into a [`FollowUp`].
//!
//! ## Quick Start
//!
//! ```rust
//! use tandem_engine::{ChangeQueue, RecordType};
//! use serde_json::json;
//!
//! let mut queue = ChangeQueue::new();
//! let record = queue.enqueue(
//!     "rec_1",
//!     RecordType::Settings,
//!     json!({"theme": "dark"}),
//!     1706745600000,
//!     "phone",
//! );
//!
//! assert_eq!(record.version, 1);
//! assert_eq!(queue.len(), 1);
//!
//! queue.clear_uploaded(&[record.id.clone()]);
//! assert!(queue.is_empty());
//! ```

pub mod checksum;
pub mod conflict;
pub mod device;
pub mod error;
pub mod queue;
pub mod record;
pub mod snapshot;
pub mod state;

// Re-export main types at crate root
pub use checksum::checksum;
pub use conflict::{
    merge_payloads, plan_resolution, FollowUp, Resolution, MERGED_MARKER, MERGE_TIME_MARKER,
};
pub use device::{DeviceCache, DeviceRecord, DeviceStatus};
pub use error::Error;
pub use queue::ChangeQueue;
pub use record::{retain_within, RecordType, SyncRecord, MS_PER_DAY};
pub use snapshot::{Envelope, FORMAT_VERSION};
pub use state::SyncState;

/// Type aliases for clarity
pub type RecordId = String;
pub type DeviceId = String;
pub type Version = u64;
/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;
