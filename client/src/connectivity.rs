//! Connectivity signal shared by the transport and the orchestrator.
//!
//! The host application owns the platform network listener and pushes every
//! change through [`Connectivity::set`]. Subscribers observe changes through a
//! `tokio::sync::watch` channel, so only the latest state is ever seen.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

/// Type of the active network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NetworkKind {
    Wifi,
    Cellular,
    Ethernet,
    #[default]
    Unknown,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NetworkKind::Wifi => "wifi",
            NetworkKind::Cellular => "cellular",
            NetworkKind::Ethernet => "ethernet",
            NetworkKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wifi" => Ok(NetworkKind::Wifi),
            "cellular" => Ok(NetworkKind::Cellular),
            "ethernet" => Ok(NetworkKind::Ethernet),
            "unknown" => Ok(NetworkKind::Unknown),
            other => Err(format!("unknown network kind: {other}")),
        }
    }
}

/// Snapshot of the device's network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NetworkState {
    pub connected: bool,
    pub kind: NetworkKind,
}

impl NetworkState {
    pub fn offline() -> Self {
        Self {
            connected: false,
            kind: NetworkKind::Unknown,
        }
    }

    pub fn wifi() -> Self {
        Self {
            connected: true,
            kind: NetworkKind::Wifi,
        }
    }

    pub fn cellular() -> Self {
        Self {
            connected: true,
            kind: NetworkKind::Cellular,
        }
    }

    /// Reachability gate: connected, and on wifi when `wifi_only` is set.
    pub fn is_reachable(&self, wifi_only: bool) -> bool {
        self.connected && (!wifi_only || self.kind == NetworkKind::Wifi)
    }
}

/// Cloneable handle to the process-wide network state.
#[derive(Debug, Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<NetworkState>>,
}

impl Connectivity {
    pub fn new(initial: NetworkState) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx: Arc::new(tx) }
    }

    /// Publish a new network state. Unchanged states do not wake subscribers.
    pub fn set(&self, state: NetworkState) {
        self.tx.send_if_modified(|current| {
            if *current == state {
                return false;
            }
            tracing::debug!(connected = state.connected, kind = %state.kind, "Network state changed");
            *current = state;
            true
        });
    }

    pub fn current(&self) -> NetworkState {
        *self.tx.borrow()
    }

    /// Whether any network is connected, ignoring the wifi gate.
    pub fn is_online(&self) -> bool {
        self.current().connected
    }

    pub fn subscribe(&self) -> watch::Receiver<NetworkState> {
        self.tx.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(NetworkState::offline())
    }
}
