//! Notifications published by the orchestrator.

use serde::Serialize;

/// Event delivered to host subscribers over a broadcast channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A cycle passed the gates and began
    Started,
    /// A cycle ended
    Completed {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// The reachability gate flipped
    ConnectivityChanged { reachable: bool },
    /// The remote authority reported open conflicts
    ConflictsDetected { count: usize },
}

impl SyncEvent {
    pub fn succeeded() -> Self {
        SyncEvent::Completed {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        SyncEvent::Completed {
            success: false,
            error: Some(error.into()),
        }
    }
}
