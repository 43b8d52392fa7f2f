//! Persistence manager
//!
//! Entry point for the broker's message path. Built once at startup from the
//! resolved [`PersistenceConfig`] and shared with every producer.
//!
//! # Modes
//!
//! | Level | Backend | WAL file | append() |
//! |-------|---------|----------|----------|
//! | 2 | [`WalDurability`] | opened at startup | one line per message |
//! | other | [`InMemoryDurability`] | never created | no-op |
//!
//! # Lifecycle
//!
//! ```text
//! PersistenceManager::open(config)
//!   ├─ level != 2 ──► Disabled      (terminal, appends are no-ops)
//!   └─ level == 2 ──► open WAL
//!                      ├─ error ──► WalError::Open (startup aborts)
//!                      └─ ok ─────► Durable-Open (terminal)
//! ```
//!
//! ```ignore
//! use kapokmq_engine::{PersistenceConfig, PersistenceManager};
//!
//! let manager = PersistenceManager::open(&PersistenceConfig::durable("WAL.log"))?;
//! manager.append(&message)?;
//! ```

mod inmemory;
mod traits;
mod wal;

pub use inmemory::InMemoryDurability;
pub use traits::Durability;
pub use wal::WalDurability;

use crate::config::PersistenceConfig;
use crate::error::Result;
use kapokmq_core::Message;
use kapokmq_durability::PersistenceGate;
use tracing::{info, warn};

/// Owns the persistence gate and the durability backend.
pub struct PersistenceManager {
    gate: PersistenceGate,
    backend: Box<dyn Durability>,
}

impl PersistenceManager {
    /// Resolve the persistence mode and open the WAL if it is durable.
    ///
    /// # Errors
    ///
    /// - Configuration errors for invalid sync settings
    /// - [`kapokmq_durability::WalError::Open`] when the WAL cannot be opened;
    ///   the broker must not accept durable traffic in that case
    pub fn open(config: &PersistenceConfig) -> Result<Self> {
        let gate = config.gate();
        info!(
            target: "kapokmq::persistence",
            level = %gate.level(),
            mode = gate.mode().description(),
            "Persistence mode resolved"
        );

        if !gate.is_durable() {
            return Ok(Self::with_backend(gate, Box::new(InMemoryDurability::new())));
        }

        let writer_config = config.writer_config()?;
        let backend = WalDurability::open(&config.wal_path, writer_config)?;
        Ok(Self::with_backend(gate, Box::new(backend)))
    }

    /// Disabled manager. Never touches the filesystem.
    pub fn disabled() -> Self {
        Self::with_backend(PersistenceGate::disabled(), Box::new(InMemoryDurability::new()))
    }

    /// Assemble a manager from an explicit gate and backend.
    pub fn with_backend(gate: PersistenceGate, backend: Box<dyn Durability>) -> Self {
        if gate.is_durable() && !backend.requires_wal() {
            warn!(
                target: "kapokmq::persistence",
                backend = backend.mode_name(),
                "Durable persistence level paired with a backend that keeps no WAL"
            );
        }
        PersistenceManager { gate, backend }
    }

    /// Persist one accepted message.
    ///
    /// Returns immediately when persistence is disabled. Otherwise the
    /// message is written as exactly one WAL record before this returns.
    pub fn append(&self, message: &Message) -> Result<()> {
        if !self.gate.is_durable() {
            return Ok(());
        }
        self.backend.persist(message)?;
        Ok(())
    }

    /// Check if appends are written to the WAL.
    pub fn is_durable(&self) -> bool {
        self.gate.is_durable()
    }

    /// Check if accepted messages actually reach a WAL file.
    ///
    /// False when the gate is off, or when the backend keeps no WAL.
    pub fn writes_wal(&self) -> bool {
        self.gate.is_durable() && self.backend.requires_wal()
    }

    /// The resolved gate.
    pub fn gate(&self) -> PersistenceGate {
        self.gate
    }

    /// Backend name for logging.
    pub fn mode_name(&self) -> &'static str {
        self.backend.mode_name()
    }

    /// Stop background work and flush the WAL.
    pub fn shutdown(&self) -> Result<()> {
        self.backend.shutdown()?;
        info!(target: "kapokmq::persistence", mode = self.mode_name(), "Persistence shut down");
        Ok(())
    }
}

impl std::fmt::Debug for PersistenceManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistenceManager")
            .field("gate", &self.gate)
            .field("backend", &self.backend.mode_name())
            .finish()
    }
}
