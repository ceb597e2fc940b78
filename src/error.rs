//! Error types for archivekv
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using ArchiveError
pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Unified error type for archive operations
#[derive(Debug, Error)]
pub enum ArchiveError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Entry Errors
    // -------------------------------------------------------------------------
    #[error(
        "Dataset entry size limit exceeded, max size is {limit} bytes but value encoded to {size} bytes"
    )]
    EntryTooLarge { limit: usize, size: usize },

    #[error("Malformed input: {0}")]
    MalformedInput(String),

    // -------------------------------------------------------------------------
    // Codec Errors
    // -------------------------------------------------------------------------
    #[error("Codec error: {0}")]
    Codec(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ArchiveError {
    /// True for the size-limit violation, which callers often handle apart
    /// from I/O and codec failures.
    pub fn is_entry_too_large(&self) -> bool {
        matches!(self, ArchiveError::EntryTooLarge { .. })
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(e: serde_json::Error) -> Self {
        ArchiveError::Codec(format!("JSON: {}", e))
    }
}

impl From<bincode::Error> for ArchiveError {
    fn from(e: bincode::Error) -> Self {
        ArchiveError::Codec(format!("structured: {}", e))
    }
}
