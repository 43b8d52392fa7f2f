//! WAL file lifecycle and append writer
//!
//! - [`WalFile`]: the single append-only file handle, opened once
//! - [`WalWriter`]: serializes concurrent appends into whole, ordered lines
//!
//! # Writer discipline
//!
//! ```text
//! append(msg):
//!   encode_record(msg)        (outside the lock)
//!   lock
//!     write_all(line)         (one unbuffered write at EOF)
//!     on error: roll back torn tail, count failure
//!     apply SyncPolicy
//!   unlock
//! ```
//!
//! Records land in the file in the order callers acquire the lock. Nothing is
//! buffered in user space, so a record has reached the OS by the time
//! `append` returns. Whether it has reached the disk depends on the
//! [`SyncPolicy`].

use crate::codec::encode_record;
use crate::error::{Result, WalError};
use crate::mode::SyncPolicy;
use fs2::FileExt;
use parking_lot::Mutex;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Well-known WAL file name, relative to the working directory.
pub const DEFAULT_WAL_PATH: &str = "WAL.log";

/// Consecutive failures after which the writer stops accepting records.
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: usize = 3;

/// Creation mode for a new WAL file.
#[cfg(unix)]
const WAL_FILE_MODE: u32 = 0o766;

/// The open append-only WAL file.
///
/// Opened read/write, create-if-absent, append mode. Existing content is
/// never truncated; the first record written goes after the prior end of
/// file.
///
/// The handle holds an exclusive advisory lock on the file until it is
/// dropped, so a second `WalFile` on the same path fails to open.
#[derive(Debug)]
pub struct WalFile {
    file: File,
    path: PathBuf,
    len: u64,
}

impl WalFile {
    /// Open (or create) the WAL file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::Open`] if the file cannot be opened or created,
    /// or if another handle already holds it.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let mut options = OpenOptions::new();
        options.read(true).append(true).create(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(WAL_FILE_MODE);
        }

        let opened = options.open(&path).and_then(|file| {
            FileExt::try_lock_exclusive(&file).map_err(|e| {
                io::Error::new(e.kind(), format!("WAL file is held by another writer: {}", e))
            })?;
            let len = file.metadata()?.len();
            Ok((file, len))
        });

        match opened {
            Ok((file, len)) => {
                info!(target: "kapokmq::wal", path = %path.display(), offset = len, "Opened WAL file");
                Ok(WalFile { file, path, len })
            }
            Err(source) => {
                error!(
                    target: "kapokmq::wal",
                    path = %path.display(),
                    error = %source,
                    "Failed to open WAL file; durability cannot be honored"
                );
                Err(WalError::Open { path, source })
            }
        }
    }

    /// Path the file was opened at.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current end of file, as tracked by this handle.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Check if the file holds no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Re-read the end of file from the filesystem.
    fn refresh_len(&mut self) -> io::Result<u64> {
        self.len = self.file.metadata()?.len();
        Ok(self.len)
    }

    fn append_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)?;
        self.len += line.len() as u64;
        Ok(())
    }

    /// Cut off bytes a failed write may have left past `committed`.
    fn rollback_to(&mut self, committed: u64) -> io::Result<()> {
        let actual = self.file.metadata()?.len();
        if actual != committed {
            self.file.set_len(committed)?;
        }
        self.len = committed;
        Ok(())
    }

    fn sync(&self) -> io::Result<()> {
        self.file.sync_data()
    }
}

/// Writer configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalWriterConfig {
    /// When to fsync.
    pub sync_policy: SyncPolicy,

    /// Consecutive write/sync failures tolerated before the writer is poisoned.
    ///
    /// Zero is treated as one.
    pub max_consecutive_failures: usize,
}

impl Default for WalWriterConfig {
    fn default() -> Self {
        WalWriterConfig {
            sync_policy: SyncPolicy::default(),
            max_consecutive_failures: DEFAULT_MAX_CONSECUTIVE_FAILURES,
        }
    }
}

impl WalWriterConfig {
    /// Create a configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sync policy (builder pattern).
    pub fn with_sync_policy(mut self, sync_policy: SyncPolicy) -> Self {
        self.sync_policy = sync_policy;
        self
    }

    /// Set failure threshold (builder pattern).
    pub fn with_max_consecutive_failures(mut self, failures: usize) -> Self {
        self.max_consecutive_failures = failures;
        self
    }
}

/// Cumulative writer counters.
///
/// Counters accumulate over the lifetime of the writer and are never reset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalStats {
    /// Records successfully written
    pub appends: u64,
    /// Bytes successfully written, delimiters included
    pub bytes_written: u64,
    /// fsync calls issued
    pub sync_calls: u64,
    /// Appends that failed with a write or sync error
    pub failed_appends: u64,
    /// Current end of file
    pub offset: u64,
    /// Records written since the last fsync
    pub pending_sync: usize,
}

#[derive(Debug)]
struct WriterState {
    file: WalFile,
    pending_sync: usize,
    last_sync: Instant,
    consecutive_failures: usize,
    poisoned: bool,
    stats: WalStats,
}

impl WriterState {
    fn sync(&mut self) -> Result<()> {
        if let Err(e) = self.file.sync() {
            return Err(WalError::Sync(e));
        }
        self.stats.sync_calls += 1;
        self.pending_sync = 0;
        self.last_sync = Instant::now();
        debug!(target: "kapokmq::wal", offset = self.file.len(), "Synced WAL file");
        Ok(())
    }
}

/// Append writer for the WAL.
///
/// `WalWriter` is `Send + Sync`; share it between producers with `Arc`.
/// Each call to [`WalWriter::append`] produces exactly one line or returns
/// an error.
///
/// # Escalation
///
/// After `max_consecutive_failures` write or sync failures in a row, or if a
/// torn tail cannot be rolled back, the writer is poisoned and every later
/// append returns [`WalError::Unavailable`].
#[derive(Debug)]
pub struct WalWriter {
    state: Mutex<WriterState>,
    config: WalWriterConfig,
    path: PathBuf,
}

impl WalWriter {
    /// Open the WAL at `path` and prepare it for appending.
    pub fn open(path: impl AsRef<Path>, config: WalWriterConfig) -> Result<Self> {
        let file = WalFile::open(path)?;
        Ok(Self::from_file(file, config))
    }

    /// Wrap an already opened file.
    pub fn from_file(file: WalFile, config: WalWriterConfig) -> Self {
        let path = file.path().to_path_buf();
        let stats = WalStats {
            offset: file.len(),
            ..WalStats::default()
        };
        info!(
            target: "kapokmq::wal",
            path = %path.display(),
            sync = config.sync_policy.description(),
            "WAL writer ready"
        );
        WalWriter {
            state: Mutex::new(WriterState {
                file,
                pending_sync: 0,
                last_sync: Instant::now(),
                consecutive_failures: 0,
                poisoned: false,
                stats,
            }),
            config,
            path,
        }
    }

    /// Append one record.
    ///
    /// # Errors
    ///
    /// - [`WalError::Encode`]: the message is not encodable; nothing written
    /// - [`WalError::Write`]: the OS write failed; the torn tail is rolled back
    /// - [`WalError::Sync`]: the record was written but fsync failed
    /// - [`WalError::Unavailable`]: the writer was poisoned earlier
    pub fn append<M: Serialize + ?Sized>(&self, message: &M) -> Result<()> {
        let record = encode_record(message)?;

        let mut state = self.state.lock();
        if state.poisoned {
            return Err(WalError::Unavailable {
                failures: state.consecutive_failures,
            });
        }

        let offset = match state.file.refresh_len() {
            Ok(len) => len,
            Err(source) => {
                let offset = state.file.len();
                warn!(target: "kapokmq::wal", offset, error = %source, "WAL length check failed");
                self.note_failure(&mut state);
                return Err(WalError::Write { offset, source });
            }
        };
        if let Err(source) = state.file.append_line(&record) {
            warn!(
                target: "kapokmq::wal",
                offset,
                error = %source,
                "WAL append failed"
            );
            self.rollback(&mut state, offset);
            self.note_failure(&mut state);
            return Err(WalError::Write { offset, source });
        }

        state.stats.appends += 1;
        state.stats.bytes_written += record.len() as u64;
        state.pending_sync += 1;

        if let Err(e) = self.maybe_sync(&mut state) {
            warn!(target: "kapokmq::wal", error = %e, "WAL sync after append failed");
            self.note_failure(&mut state);
            return Err(e);
        }

        state.consecutive_failures = 0;
        Ok(())
    }

    fn maybe_sync(&self, state: &mut WriterState) -> Result<()> {
        match self.config.sync_policy {
            SyncPolicy::Always => state.sync(),
            SyncPolicy::Batched { batch_size, .. } => {
                if state.pending_sync >= batch_size.max(1) {
                    state.sync()
                } else {
                    Ok(())
                }
            }
            SyncPolicy::Never => Ok(()),
        }
    }

    fn rollback(&self, state: &mut WriterState, committed: u64) {
        if let Err(e) = state.file.rollback_to(committed) {
            error!(
                target: "kapokmq::wal",
                offset = committed,
                error = %e,
                "Could not roll back torn WAL tail; writer poisoned"
            );
            state.poisoned = true;
        }
    }

    fn note_failure(&self, state: &mut WriterState) {
        state.stats.failed_appends += 1;
        state.consecutive_failures += 1;
        let limit = self.config.max_consecutive_failures.max(1);
        if !state.poisoned && state.consecutive_failures >= limit {
            error!(
                target: "kapokmq::wal",
                failures = state.consecutive_failures,
                path = %self.path.display(),
                "WAL writer poisoned after repeated failures; durability no longer honored"
            );
            state.poisoned = true;
        }
    }

    /// Force everything written so far to disk.
    pub fn sync(&self) -> Result<()> {
        let mut state = self.state.lock();
        state.sync()
    }

    /// fsync if the batched interval has elapsed with records pending.
    ///
    /// Returns `true` if a sync was performed. Always `false` for policies
    /// other than [`SyncPolicy::Batched`].
    pub fn sync_if_overdue(&self) -> Result<bool> {
        let interval = match self.config.sync_policy {
            SyncPolicy::Batched { interval_ms, .. } => Duration::from_millis(interval_ms),
            _ => return Ok(false),
        };

        let mut state = self.state.lock();
        if state.poisoned || state.pending_sync == 0 || state.last_sync.elapsed() < interval {
            return Ok(false);
        }
        state.sync()?;
        Ok(true)
    }

    /// Path of the WAL file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current end of file.
    pub fn offset(&self) -> u64 {
        self.state.lock().file.len()
    }

    /// Check if the writer has stopped accepting records.
    pub fn is_poisoned(&self) -> bool {
        self.state.lock().poisoned
    }

    /// Configured sync policy.
    pub fn sync_policy(&self) -> SyncPolicy {
        self.config.sync_policy
    }

    /// Snapshot of the writer counters.
    pub fn stats(&self) -> WalStats {
        let state = self.state.lock();
        WalStats {
            offset: state.file.len(),
            pending_sync: state.pending_sync,
            ..state.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: u64,
        body: String,
    }

    fn note(id: u64) -> Note {
        Note {
            id,
            body: format!("body-{}", id),
        }
    }

    #[test]
    fn test_open_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        let file = WalFile::open(&path).unwrap();
        assert!(path.exists());
        assert!(file.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_new_file_mode_is_subject_to_umask_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        WalFile::open(&path).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode & !WAL_FILE_MODE, 0);
        assert_ne!(mode & 0o600, 0);
    }

    #[test]
    fn test_open_directory_fails_with_open_error() {
        let dir = TempDir::new().unwrap();
        let err = WalFile::open(dir.path()).unwrap_err();
        assert!(matches!(err, WalError::Open { .. }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_second_handle_on_same_path_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        let writer = WalWriter::open(&path, WalWriterConfig::default()).unwrap();
        writer.append(&note(1)).unwrap();

        let err = WalWriter::open(&path, WalWriterConfig::default()).unwrap_err();
        assert!(matches!(err, WalError::Open { .. }));
        assert!(err.is_fatal());

        writer.append(&note(2)).unwrap();
        drop(writer);

        let reopened = WalWriter::open(&path, WalWriterConfig::default()).unwrap();
        assert_eq!(reopened.offset(), std::fs::metadata(&path).unwrap().len());
    }

    #[test]
    fn test_rollback_cuts_torn_tail() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        let mut file = WalFile::open(&path).unwrap();
        file.append_line(b"{\"id\":1}\n").unwrap();
        let committed = file.len();

        let mut stray = OpenOptions::new().append(true).open(&path).unwrap();
        stray.write_all(b"{\"id\":2,\"bo").unwrap();
        drop(stray);
        assert!(std::fs::metadata(&path).unwrap().len() > committed);

        file.rollback_to(committed).unwrap();
        assert_eq!(file.len(), committed);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"id\":1}\n");

        file.append_line(b"{\"id\":3}\n").unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\"id\":1}\n{\"id\":3}\n"
        );
    }

    #[test]
    fn test_append_starts_at_real_end_of_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        let writer = WalWriter::open(&path, WalWriterConfig::default()).unwrap();
        writer.append(&note(1)).unwrap();

        let mut other = OpenOptions::new().append(true).open(&path).unwrap();
        other.write_all(b"{\"id\":9,\"body\":\"x\"}\n").unwrap();
        drop(other);

        writer.append(&note(2)).unwrap();
        assert_eq!(writer.offset(), std::fs::metadata(&path).unwrap().len());
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert!(content.ends_with("{\"id\":2,\"body\":\"body-2\"}\n"));
    }

    #[test]
    fn test_append_writes_one_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        let writer = WalWriter::open(&path, WalWriterConfig::default()).unwrap();

        writer
            .append(&Note {
                id: 1,
                body: "hello".into(),
            })
            .unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "{\"id\":1,\"body\":\"hello\"}\n");
        assert_eq!(writer.offset(), content.len() as u64);
    }

    #[test]
    fn test_encode_failure_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("WAL.log");
        let writer = WalWriter::open(&path, WalWriterConfig::default()).unwrap();

        let mut bad = BTreeMap::new();
        bad.insert((1, 2), "tuple keys are not JSON");
        let err = writer.append(&bad).unwrap_err();

        assert!(err.is_encode());
        assert_eq!(writer.offset(), 0);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 0);
        assert_eq!(writer.stats().failed_appends, 0);
        assert!(!writer.is_poisoned());
    }

    #[test]
    fn test_always_policy_syncs_every_record() {
        let dir = TempDir::new().unwrap();
        let config = WalWriterConfig::new().with_sync_policy(SyncPolicy::Always);
        let writer = WalWriter::open(dir.path().join("WAL.log"), config).unwrap();

        for i in 0..5 {
            writer.append(&note(i)).unwrap();
        }

        let stats = writer.stats();
        assert_eq!(stats.appends, 5);
        assert_eq!(stats.sync_calls, 5);
        assert_eq!(stats.pending_sync, 0);
    }

    #[test]
    fn test_never_policy_does_not_sync() {
        let dir = TempDir::new().unwrap();
        let writer =
            WalWriter::open(dir.path().join("WAL.log"), WalWriterConfig::default()).unwrap();

        for i in 0..5 {
            writer.append(&note(i)).unwrap();
        }

        let stats = writer.stats();
        assert_eq!(stats.sync_calls, 0);
        assert_eq!(stats.pending_sync, 5);
        assert!(!writer.sync_if_overdue().unwrap());
    }

    #[test]
    fn test_batched_policy_syncs_on_batch_size() {
        let dir = TempDir::new().unwrap();
        let config = WalWriterConfig::new().with_sync_policy(SyncPolicy::Batched {
            interval_ms: 60_000,
            batch_size: 3,
        });
        let writer = WalWriter::open(dir.path().join("WAL.log"), config).unwrap();

        for i in 0..7 {
            writer.append(&note(i)).unwrap();
        }

        let stats = writer.stats();
        assert_eq!(stats.sync_calls, 2);
        assert_eq!(stats.pending_sync, 1);
    }

    #[test]
    fn test_sync_if_overdue_respects_interval() {
        let dir = TempDir::new().unwrap();
        let config = WalWriterConfig::new().with_sync_policy(SyncPolicy::Batched {
            interval_ms: 0,
            batch_size: 1000,
        });
        let writer = WalWriter::open(dir.path().join("WAL.log"), config).unwrap();

        assert!(!writer.sync_if_overdue().unwrap());
        writer.append(&note(1)).unwrap();
        assert!(writer.sync_if_overdue().unwrap());
        assert!(!writer.sync_if_overdue().unwrap());
        assert_eq!(writer.stats().sync_calls, 1);
    }

    #[test]
    fn test_explicit_sync_clears_pending() {
        let dir = TempDir::new().unwrap();
        let writer =
            WalWriter::open(dir.path().join("WAL.log"), WalWriterConfig::default()).unwrap();
        writer.append(&note(1)).unwrap();
        writer.sync().unwrap();
        assert_eq!(writer.stats().pending_sync, 0);
        assert_eq!(writer.stats().sync_calls, 1);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_repeated_write_failures_poison_writer() {
        let full = Path::new("/dev/full");
        if !full.exists() {
            return;
        }
        let config = WalWriterConfig::new().with_max_consecutive_failures(2);
        let writer = WalWriter::open(full, config).unwrap();

        let first = writer.append(&note(1)).unwrap_err();
        assert!(matches!(first, WalError::Write { offset: 0, .. }));
        assert!(!writer.is_poisoned());

        let second = writer.append(&note(2)).unwrap_err();
        assert!(matches!(second, WalError::Write { .. }));
        assert!(writer.is_poisoned());

        let third = writer.append(&note(3)).unwrap_err();
        assert!(matches!(third, WalError::Unavailable { failures: 2 }));
        assert!(third.is_fatal());
        assert_eq!(writer.stats().failed_appends, 2);
        assert_eq!(writer.stats().appends, 0);
        drop(writer);

        // A device cannot be truncated, so rolling back past its length fails.
        let writer = WalWriter::open(full, WalWriterConfig::default()).unwrap();
        {
            let mut state = writer.state.lock();
            writer.rollback(&mut state, 5);
        }
        assert!(writer.is_poisoned());
        assert!(matches!(
            writer.append(&note(4)).unwrap_err(),
            WalError::Unavailable { .. }
        ));
    }
}
