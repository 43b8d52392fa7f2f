//! Convenient imports for KapokMQ persistence.
//!
//! ```ignore
//! use kapokmq::prelude::*;
//!
//! let persistence = kapokmq::open_persistence(&PersistenceConfig::durable("WAL.log"))?;
//! persistence.append(&Message::new("m-1", "orders", "hello"))?;
//! ```

// Entry point
pub use crate::open_persistence;
pub use kapokmq_engine::{PersistenceConfig, PersistenceManager};

// Error handling
pub use crate::error::{Error, Result};

// Core types
pub use kapokmq_core::{Message, MessageStatus};

// Durability knobs
pub use kapokmq_durability::{PersistenceGate, PersistenceMode, SyncPolicy};
