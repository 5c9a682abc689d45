//! Error types for CachedKV
//!
//! Provides a unified error type for all operations.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using CacheError
pub type Result<T> = std::result::Result<T, CacheError>;

/// Unified error type for CachedKV operations
#[derive(Debug, Error)]
pub enum CacheError {
    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// Malformed or unknown command, or missing required tokens.
    /// Surfaced to clients as `Invalid command`.
    #[error("Parse error: {0}")]
    Parse(String),

    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The WAL could not be opened or created at startup
    #[error("Could not open WAL file {}: {source}", path.display())]
    WalOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Snapshot Errors
    // -------------------------------------------------------------------------
    #[error("Snapshot decode error: {0}")]
    Decode(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Network Errors
    // -------------------------------------------------------------------------
    #[error("Connection error: {0}")]
    Connection(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CacheError {
    /// Whether this error must abort startup.
    ///
    /// Only a WAL that cannot be opened is fatal; everything else is logged
    /// and the server keeps serving.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CacheError::WalOpen { .. })
    }

    /// Shorthand for a parse error
    pub(crate) fn parse(message: impl Into<String>) -> Self {
        CacheError::Parse(message.into())
    }
}
