//! Unified error handling for the client.
//!
//! These errors stay inside the crate's components: transport calls fold them
//! into [`ApiResponse`](crate::ApiResponse) failures, storage failures are
//! logged and swallowed, and the orchestrator turns cycle errors into
//! [`SyncEvent::Completed`](crate::SyncEvent) events.

/// Client error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("No internet connection")]
    Offline,

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Status { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("Engine error: {0}")]
    Engine(#[from] tandem_engine::Error),

    #[error("{step} failed: {message}")]
    Step { step: &'static str, message: String },
}

impl Error {
    /// Whether the transport may retry after this error.
    ///
    /// Everything except a missing connection is treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Offline)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
