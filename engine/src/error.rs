//! Error types for the Tandem engine.

use thiserror::Error;

/// All possible errors from the Tandem engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("unknown record type: {0}")]
    UnknownRecordType(String),

    #[error("unknown resolution strategy: {0}")]
    UnknownResolution(String),

    // Persistence errors
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("unsupported format version: {found} (max supported: {supported})")]
    UnsupportedFormat { found: u32, supported: u32 },
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::UnknownRecordType("photos".into());
        assert_eq!(err.to_string(), "unknown record type: photos");

        let err = Error::UnsupportedFormat {
            found: 3,
            supported: 1,
        };
        assert_eq!(
            err.to_string(),
            "unsupported format version: 3 (max supported: 1)"
        );
    }
}
