//! Error types for CaskKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using CaskError
pub type Result<T> = std::result::Result<T, CaskError>;

/// Unified error type for CaskKV operations
#[derive(Debug, Error)]
pub enum CaskError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Log Errors
    // -------------------------------------------------------------------------
    #[error("Corrupt record at offset {offset}: {reason}")]
    CorruptRecord { offset: u64, reason: String },

    #[error("Log file unusable: {0}")]
    LogFailed(String),

    #[error("{what} too large: {len} bytes")]
    RecordTooLarge { what: &'static str, len: usize },

    // -------------------------------------------------------------------------
    // Compaction Errors
    // -------------------------------------------------------------------------
    #[error("Merge failed: {0}")]
    Merge(#[source] Box<CaskError>),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CaskError {
    pub(crate) fn corrupt(offset: u64, reason: impl Into<String>) -> Self {
        CaskError::CorruptRecord {
            offset,
            reason: reason.into(),
        }
    }

    /// Shift a buffer-relative corruption offset to an absolute file offset.
    pub(crate) fn relocate(self, base: u64) -> Self {
        match self {
            CaskError::CorruptRecord { offset, reason } => CaskError::CorruptRecord {
                offset: base + offset,
                reason,
            },
            other => other,
        }
    }

    /// True when the error came from a damaged log rather than the OS.
    pub fn is_corruption(&self) -> bool {
        match self {
            CaskError::CorruptRecord { .. } => true,
            CaskError::Merge(inner) => inner.is_corruption(),
            _ => false,
        }
    }
}
