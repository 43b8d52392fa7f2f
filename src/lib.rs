//! # KapokMQ persistence
//!
//! Write-ahead log durability for the KapokMQ message broker.
//!
//! When the broker runs with `persistence_level = 2`, every accepted message
//! is appended to `WAL.log` as one JSON line before the produce request is
//! acknowledged. At any other level the WAL is never created and appends
//! cost nothing.
//!
//! ## Quick Start
//!
//! ```ignore
//! use kapokmq::prelude::*;
//!
//! let config = PersistenceConfig::from_file("kapokmq.toml".as_ref())?;
//! let persistence = kapokmq::open_persistence(&config)?;
//!
//! persistence.append(&Message::new("m-1", "orders", "hello"))?;
//! persistence.shutdown()?;
//! ```
//!
//! ## Crates
//!
//! - [`Message`]: the broker message persisted by the WAL
//! - [`durability`]: gate, WAL file, codec, writer, reader
//! - [`engine`]: configuration, persistence manager, diagnostic log

#![warn(missing_docs)]

mod error;

pub mod prelude;

pub use kapokmq_durability as durability;
pub use kapokmq_engine as engine;

pub use error::{Error, Result};
pub use kapokmq_core::{Message, MessageStatus};
pub use kapokmq_engine::{PersistenceConfig, PersistenceManager};

/// Resolve the persistence mode and open the WAL if it is durable.
///
/// # Errors
///
/// [`Error::DurabilityUnavailable`] if durability is requested but the WAL
/// cannot be opened. The broker must not start accepting traffic then.
pub fn open_persistence(config: &PersistenceConfig) -> Result<PersistenceManager> {
    Ok(PersistenceManager::open(config)?)
}

/// Append one message, mapping failures to the facade [`Error`].
pub fn append(persistence: &PersistenceManager, message: &Message) -> Result<()> {
    Ok(persistence.append(message)?)
}
