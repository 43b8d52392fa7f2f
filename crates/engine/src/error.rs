//! Engine error types.

use crate::config::ConfigError;
use crate::diagnostic::DiagnosticLogError;
use kapokmq_durability::WalError;
use thiserror::Error;

/// Errors raised while starting or running the persistence layer.
#[derive(Debug, Error)]
pub enum Error {
    /// WAL failure
    #[error(transparent)]
    Wal(#[from] WalError),

    /// Invalid or unreadable configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Diagnostic log could not be set up
    #[error(transparent)]
    DiagnosticLog(#[from] DiagnosticLogError),
}

impl Error {
    /// Check if durability can no longer be honored.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Wal(e) if e.is_fatal())
    }

    /// The WAL error, if this is one.
    pub fn as_wal(&self) -> Option<&WalError> {
        match self {
            Error::Wal(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
