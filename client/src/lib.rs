//! # Tandem Client
//!
//! The runtime half of Tandem: it drives the deterministic `tandem-engine`
//! model against a remote authority over HTTP and keeps it on local storage.
//!
//! ## Components
//!
//! - [`LocalStore`] persists the queue, sync state, device cache, synced
//!   records, auth token and the stable device id
//! - [`HttpTransport`] performs authenticated requests with timeout and
//!   exponential backoff, behind the [`RemoteApi`] trait
//! - [`DeviceRegistry`] caches known devices and refreshes them remotely
//! - [`ConflictResolver`] turns user decisions into follow-up records
//! - [`SyncOrchestrator`] owns the [`SyncState`](tandem_engine::SyncState),
//!   runs one cycle at a time and reacts to timers, reconnects and enqueues
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use serde_json::json;
//! use tandem_client::{
//!     ApiConfig, Connectivity, HttpTransport, IntervalTicker, LocalStore, NetworkState,
//!     SyncConfig, SyncOrchestrator,
//! };
//! use tandem_engine::RecordType;
//!
//! # async fn demo() -> Result<(), tandem_client::Error> {
//! let connectivity = Connectivity::new(NetworkState::wifi());
//! let sync = SyncConfig::default();
//! let transport = HttpTransport::new(
//!     ApiConfig::new("https://sync.example.com", "api-key"),
//!     sync.max_retries,
//!     connectivity.clone(),
//! )?;
//!
//! let orchestrator = SyncOrchestrator::new(
//!     Arc::new(transport),
//!     Arc::new(LocalStore::memory()),
//!     connectivity,
//!     sync.clone(),
//! );
//! tokio::spawn(orchestrator.clone().run(IntervalTicker::new(sync.sync_interval())));
//!
//! orchestrator.enqueue(RecordType::Settings, json!({"theme": "dark"}));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod connectivity;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod registry;
pub mod resolver;
pub mod storage;
pub mod ticker;
pub mod transport;

pub use config::{ApiConfig, Config, ConfigError, SyncConfig};
pub use connectivity::{Connectivity, NetworkKind, NetworkState};
pub use error::{Error, Result};
pub use events::SyncEvent;
pub use orchestrator::SyncOrchestrator;
pub use registry::DeviceRegistry;
pub use resolver::ConflictResolver;
pub use storage::{FileStore, KvStore, LocalStore, MemoryStore};
pub use ticker::{ChannelTicker, IntervalTicker, TickHandle, Ticker};
pub use transport::{ApiResponse, HttpTransport, RemoteApi};

use tandem_engine::Timestamp;

/// Current wall-clock time in milliseconds since the Unix epoch.
pub fn now_millis() -> Timestamp {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
