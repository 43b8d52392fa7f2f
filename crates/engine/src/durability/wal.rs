//! WAL-backed durability
//!
//! Appends every message to the WAL through a shared [`WalWriter`]. With a
//! batched sync policy a background thread fsyncs records that have waited
//! longer than the interval.
//!
//! # Thread Lifecycle
//!
//! The flush thread waits on a condvar with the sync interval as timeout.
//! Setting the stop flag and notifying wakes it for a final sync; the handle
//! is joined by `shutdown()` or on drop.

use super::Durability;
use kapokmq_core::Message;
use kapokmq_durability::{Result, SyncPolicy, WalWriter, WalWriterConfig};
use parking_lot::{Condvar, Mutex};
use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, warn};

struct BackgroundFlusher {
    signal: Arc<(Mutex<bool>, Condvar)>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundFlusher {
    fn start(writer: Arc<WalWriter>, interval: Duration) -> Self {
        let signal = Arc::new((Mutex::new(false), Condvar::new()));
        let thread_signal = Arc::clone(&signal);
        let handle = thread::spawn(move || flush_loop(&writer, &thread_signal, interval));
        BackgroundFlusher {
            signal,
            handle: Some(handle),
        }
    }

    fn stop(&mut self) {
        {
            let (lock, cvar) = &*self.signal;
            *lock.lock() = true;
            cvar.notify_one();
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(target: "kapokmq::wal", "WAL flush thread panicked");
            }
        }
    }
}

fn flush_loop(writer: &WalWriter, signal: &(Mutex<bool>, Condvar), interval: Duration) {
    let (lock, cvar) = signal;
    loop {
        let mut stop = lock.lock();
        if !*stop {
            cvar.wait_for(&mut stop, interval);
        }
        let stopping = *stop;
        drop(stop);

        if stopping {
            if let Err(e) = writer.sync() {
                warn!(target: "kapokmq::wal", error = %e, "Final WAL flush failed");
            }
            debug!(target: "kapokmq::wal", "WAL flush thread stopped");
            break;
        }

        if let Err(e) = writer.sync_if_overdue() {
            warn!(target: "kapokmq::wal", error = %e, "Background WAL flush failed");
        }
    }
}

/// Durability backed by the write-ahead log.
pub struct WalDurability {
    writer: Arc<WalWriter>,
    flusher: Mutex<Option<BackgroundFlusher>>,
}

impl WalDurability {
    /// Open the WAL at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`kapokmq_durability::WalError::Open`] if the file cannot be
    /// opened or created.
    pub fn open(path: impl AsRef<Path>, config: WalWriterConfig) -> Result<Self> {
        let writer = WalWriter::open(path, config)?;
        Ok(Self::new(Arc::new(writer)))
    }

    /// Wrap an open writer, starting the flush thread for batched policies.
    pub fn new(writer: Arc<WalWriter>) -> Self {
        let flusher = match writer.sync_policy() {
            SyncPolicy::Batched { interval_ms, .. } => Some(BackgroundFlusher::start(
                Arc::clone(&writer),
                Duration::from_millis(interval_ms.max(1)),
            )),
            SyncPolicy::Never | SyncPolicy::Always => None,
        };
        WalDurability {
            writer,
            flusher: Mutex::new(flusher),
        }
    }

    /// The underlying writer.
    pub fn writer(&self) -> &Arc<WalWriter> {
        &self.writer
    }

    /// Check if a background flush thread is running.
    pub fn has_flush_thread(&self) -> bool {
        self.flusher.lock().is_some()
    }

    fn stop_flusher(&self) {
        if let Some(mut flusher) = self.flusher.lock().take() {
            flusher.stop();
        }
    }
}

impl Durability for WalDurability {
    fn persist(&self, message: &Message) -> Result<()> {
        self.writer.append(message)
    }

    fn shutdown(&self) -> Result<()> {
        self.stop_flusher();
        self.writer.sync()
    }

    fn is_persistent(&self) -> bool {
        true
    }

    fn mode_name(&self) -> &'static str {
        "Wal"
    }
}

impl Drop for WalDurability {
    fn drop(&mut self) {
        self.stop_flusher();
    }
}
