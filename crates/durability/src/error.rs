//! WAL error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the WAL subsystem.
///
/// Nothing in this crate discards a record silently: every failure on the
/// write path surfaces as one of these variants.
#[derive(Debug, Error)]
pub enum WalError {
    /// The WAL file could not be opened or created.
    ///
    /// Fatal: the broker cannot honor its persistence contract.
    #[error("failed to open WAL file '{}': {source}", .path.display())]
    Open {
        /// Path that was requested
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A message could not be serialized.
    #[error("failed to encode WAL record: {0}")]
    Encode(#[source] serde_json::Error),

    /// The OS-level append failed.
    #[error("failed to append WAL record at offset {offset}: {source}")]
    Write {
        /// File offset the record was meant to start at
        offset: u64,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// fsync failed.
    #[error("failed to sync WAL file: {0}")]
    Sync(#[source] io::Error),

    /// The writer gave up after repeated failures.
    ///
    /// Equivalent to [`WalError::Open`]: durability can no longer be honored.
    #[error("WAL writer unavailable after {failures} consecutive failures")]
    Unavailable {
        /// Consecutive failures observed before the writer was poisoned
        failures: usize,
    },

    /// The WAL file could not be read back.
    #[error("failed to read WAL file: {0}")]
    Read(#[source] io::Error),

    /// A record could not be decoded.
    #[error("failed to decode WAL record: {0}")]
    Decode(#[source] serde_json::Error),

    /// A complete line in the WAL file is not a valid record.
    #[error("corrupt WAL record on line {line}: {source}")]
    Corrupt {
        /// 1-based line number
        line: usize,
        /// Decode error for that line
        #[source]
        source: serde_json::Error,
    },
}

impl WalError {
    /// Check if this error means durability can no longer be honored.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WalError::Open { .. } | WalError::Unavailable { .. })
    }

    /// Check if this error was caused by the record rather than the file.
    pub fn is_encode(&self) -> bool {
        matches!(self, WalError::Encode(_))
    }
}

/// Result type for WAL operations.
pub type Result<T> = std::result::Result<T, WalError>;
