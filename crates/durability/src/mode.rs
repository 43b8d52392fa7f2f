//! Persistence mode gate and sync policy for WAL operations.
//!
//! Two orthogonal knobs:
//! - [`PersistenceMode`] decides whether a WAL file exists at all
//! - [`SyncPolicy`] decides when written records are fsynced to disk

/// Raw persistence level as configured by the operator.
///
/// Only [`PersistenceLevel::DURABLE`] activates the WAL. Levels `0` and `1`,
/// and any unrecognized value, disable it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PersistenceLevel(pub i64);

impl PersistenceLevel {
    /// No persistence.
    pub const NONE: PersistenceLevel = PersistenceLevel(0);
    /// Reserved level that does not write a WAL.
    pub const MEMORY: PersistenceLevel = PersistenceLevel(1);
    /// Every accepted message is appended to the WAL.
    pub const DURABLE: PersistenceLevel = PersistenceLevel(2);
}

impl From<i64> for PersistenceLevel {
    fn from(level: i64) -> Self {
        PersistenceLevel(level)
    }
}

impl std::fmt::Display for PersistenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved persistence mode.
///
/// | Mode | WAL file | Append |
/// |------|----------|--------|
/// | Disabled | never created | no-op |
/// | Durable | opened at startup | one line per message |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistenceMode {
    /// No WAL. Appends are permanent no-ops.
    Disabled,
    /// Every accepted message is written to the WAL.
    Durable,
}

impl PersistenceMode {
    /// Resolve a configured level. Anything but the durable sentinel disables the WAL.
    pub fn from_level(level: impl Into<PersistenceLevel>) -> Self {
        if level.into() == PersistenceLevel::DURABLE {
            PersistenceMode::Durable
        } else {
            PersistenceMode::Disabled
        }
    }

    /// Check if this mode requires WAL persistence.
    pub fn requires_wal(&self) -> bool {
        matches!(self, PersistenceMode::Durable)
    }

    /// Human-readable description of the mode.
    pub fn description(&self) -> &'static str {
        match self {
            PersistenceMode::Disabled => "Disabled (no WAL, messages lost on crash)",
            PersistenceMode::Durable => "Durable (every message appended to the WAL)",
        }
    }
}

/// Process-wide persistence gate.
///
/// Built once from the configured level and never mutated afterwards. Every
/// append consults [`PersistenceGate::is_durable`], so producers never have
/// to branch on the mode themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistenceGate {
    level: PersistenceLevel,
    mode: PersistenceMode,
}

impl PersistenceGate {
    /// Resolve the gate from a configured level.
    pub fn new(level: impl Into<PersistenceLevel>) -> Self {
        let level = level.into();
        PersistenceGate {
            level,
            mode: PersistenceMode::from_level(level),
        }
    }

    /// Gate that never persists.
    pub fn disabled() -> Self {
        Self::new(PersistenceLevel::NONE)
    }

    /// Gate that persists every message.
    pub fn durable() -> Self {
        Self::new(PersistenceLevel::DURABLE)
    }

    /// True only when the configured level is the durable sentinel.
    #[inline]
    pub fn is_durable(&self) -> bool {
        self.mode.requires_wal()
    }

    /// The resolved mode.
    pub fn mode(&self) -> PersistenceMode {
        self.mode
    }

    /// The level this gate was resolved from.
    pub fn level(&self) -> PersistenceLevel {
        self.level
    }
}

/// When written WAL records are forced to stable storage.
///
/// | Policy | fsync | Data Loss Window |
/// |--------|-------|------------------|
/// | Never | left to the OS | whatever the page cache holds |
/// | Always | every record | zero |
/// | Batched | every N records or T ms | up to batch_size / interval_ms |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SyncPolicy {
    /// Never fsync explicitly. Records reach the OS before `append`
    /// returns but may be lost on power failure.
    #[default]
    Never,

    /// fsync after every record (slow, maximum durability).
    Always,

    /// fsync every `batch_size` records OR every `interval_ms` milliseconds.
    ///
    /// The interval is enforced by a background flusher.
    Batched {
        /// Maximum time between fsyncs in milliseconds
        interval_ms: u64,
        /// Maximum records between fsyncs
        batch_size: usize,
    },
}

impl SyncPolicy {
    /// Check if this policy requires an fsync on every append.
    pub fn requires_immediate_fsync(&self) -> bool {
        matches!(self, SyncPolicy::Always)
    }

    /// Check if this policy needs a background flusher.
    pub fn requires_background_sync(&self) -> bool {
        matches!(self, SyncPolicy::Batched { .. })
    }

    /// Human-readable description of the policy.
    pub fn description(&self) -> &'static str {
        match self {
            SyncPolicy::Never => "OS-managed flush (fastest, may lose buffered records)",
            SyncPolicy::Always => "fsync every record (safest, slowest)",
            SyncPolicy::Batched { .. } => "Batched fsync (balanced speed/safety)",
        }
    }

    /// Create a batched policy with recommended defaults.
    ///
    /// Returns `Batched { interval_ms: 100, batch_size: 1000 }`.
    pub fn batched_default() -> Self {
        SyncPolicy::Batched {
            interval_ms: 100,
            batch_size: 1000,
        }
    }
}
