//! Persistence engine for KapokMQ
//!
//! Wires the durability layer into the broker:
//! - [`PersistenceConfig`]: `kapokmq.toml` persistence settings
//! - [`PersistenceManager`]: gate + backend, shared by every producer
//! - [`diagnostic`]: daily operator log installed as the tracing subscriber

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod diagnostic;
pub mod durability;
pub mod error;

pub use config::{ConfigError, PersistenceConfig, CONFIG_FILE_NAME};
pub use diagnostic::{init_diagnostic_log, DailyFile, DiagnosticLogError, LOG_DIR};
pub use durability::{Durability, InMemoryDurability, PersistenceManager, WalDurability};
pub use error::{Error, Result};
