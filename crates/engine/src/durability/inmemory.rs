//! Disabled persistence
//!
//! Backend used whenever the configured level is not durable. It never
//! touches the filesystem.

use super::Durability;
use kapokmq_core::Message;
use kapokmq_durability::Result;

/// No-op durability: messages live only in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct InMemoryDurability;

impl InMemoryDurability {
    /// Create the backend.
    pub fn new() -> Self {
        InMemoryDurability
    }
}

impl Durability for InMemoryDurability {
    fn persist(&self, _message: &Message) -> Result<()> {
        Ok(())
    }

    fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    fn is_persistent(&self) -> bool {
        false
    }

    fn mode_name(&self) -> &'static str {
        "InMemory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inmemory_is_noop() {
        let durability = InMemoryDurability::new();
        for i in 0..10 {
            durability
                .persist(&Message::new(format!("m-{}", i), "t", "d"))
                .unwrap();
        }
        durability.shutdown().unwrap();
        assert!(!durability.is_persistent());
        assert!(!durability.requires_wal());
        assert_eq!(durability.mode_name(), "InMemory");
    }
}
