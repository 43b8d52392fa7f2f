//! Durability layer for KapokMQ
//!
//! This crate implements the broker's write-ahead log:
//! - Persistence gate: decides once, at startup, whether the WAL is active
//! - WAL file: a single append-only file opened for the process lifetime
//! - Record codec: one JSON object per `\n`-terminated line
//! - Append writer: serializes concurrent appends into whole, ordered lines
//! - Sync policies: Never, Always, Batched
//! - Reader: verifies and decodes a WAL file

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod codec;
pub mod error;
pub mod mode;
pub mod reader;
pub mod wal;

pub use codec::{decode_record, encode_record};
pub use error::{Result, WalError};
pub use mode::{PersistenceGate, PersistenceLevel, PersistenceMode, SyncPolicy};
pub use reader::{WalReadOutcome, WalReader, WalRecords};
pub use wal::{
    WalFile, WalStats, WalWriter, WalWriterConfig, DEFAULT_MAX_CONSECUTIVE_FAILURES,
    DEFAULT_WAL_PATH,
};
