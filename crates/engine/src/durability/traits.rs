//! Durability abstraction
//!
//! The persistence manager talks to its backend through [`Durability`], so
//! producers can be tested against a double without touching the disk.
//!
//! | Backend | persists | WAL file |
//! |---------|----------|----------|
//! | InMemory | no | never created |
//! | Wal | yes | opened at startup |

use kapokmq_core::Message;
use kapokmq_durability::Result;

/// Durability behavior abstraction
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`: every producer thread calls
/// [`Durability::persist`] through a shared reference.
pub trait Durability: Send + Sync {
    /// Persist one accepted message.
    ///
    /// # Contract by Backend
    ///
    /// - **InMemory**: No-op, returns immediately
    /// - **Wal**: Exactly one WAL line, or an error
    fn persist(&self, message: &Message) -> Result<()>;

    /// Graceful shutdown: stop background work and flush.
    fn shutdown(&self) -> Result<()>;

    /// Check if data survives a process crash.
    fn is_persistent(&self) -> bool;

    /// Human-readable backend name for logging.
    fn mode_name(&self) -> &'static str;

    /// Check if this backend needs a WAL file.
    fn requires_wal(&self) -> bool {
        self.is_persistent()
    }
}
