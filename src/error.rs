//! Unified error types for KapokMQ persistence.
//!
//! This module wraps the internal WAL and engine errors and presents a
//! consistent interface to the broker.

use kapokmq_durability::WalError;
use thiserror::Error;

/// All persistence errors.
///
/// The broker matches on these to decide whether to reject a produce
/// request, retry, or stop accepting durable traffic.
#[derive(Debug, Error)]
pub enum Error {
    /// The WAL cannot be used: it failed to open, or the writer gave up
    /// after repeated failures.
    #[error("durability unavailable: {0}")]
    DurabilityUnavailable(#[source] WalError),

    /// A message could not be encoded; nothing was written.
    #[error("message not encodable: {0}")]
    Encode(#[source] WalError),

    /// Writing or syncing the WAL failed.
    #[error("WAL I/O error: {0}")]
    Io(#[source] WalError),

    /// The WAL file holds records that cannot be decoded.
    #[error("WAL corruption: {0}")]
    Corruption(#[source] WalError),

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(#[from] kapokmq_engine::ConfigError),

    /// Diagnostic log could not be set up
    #[error("diagnostic log error: {0}")]
    DiagnosticLog(#[from] kapokmq_engine::DiagnosticLogError),
}

/// Result type for KapokMQ persistence operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if the broker must stop accepting durable traffic.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::DurabilityUnavailable(_))
    }

    /// Check if retrying the same append may succeed.
    ///
    /// Encode failures never succeed on retry; I/O failures may.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}

impl From<WalError> for Error {
    fn from(e: WalError) -> Self {
        match e {
            WalError::Open { .. } | WalError::Unavailable { .. } => Error::DurabilityUnavailable(e),
            WalError::Encode(_) => Error::Encode(e),
            WalError::Write { .. } | WalError::Sync(_) | WalError::Read(_) => Error::Io(e),
            WalError::Decode(_) | WalError::Corrupt { .. } => Error::Corruption(e),
        }
    }
}

impl From<kapokmq_engine::Error> for Error {
    fn from(e: kapokmq_engine::Error) -> Self {
        match e {
            kapokmq_engine::Error::Wal(wal) => wal.into(),
            kapokmq_engine::Error::Config(c) => Error::Config(c),
            kapokmq_engine::Error::DiagnosticLog(d) => Error::DiagnosticLog(d),
        }
    }
}
