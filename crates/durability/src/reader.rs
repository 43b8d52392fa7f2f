//! WAL read-back
//!
//! Reads the newline-delimited records written by [`crate::WalWriter`].
//! A final line without a delimiter is the remains of a write interrupted
//! by a crash; it is reported and skipped, never decoded. Any complete line
//! that fails to decode is corruption.
//!
//! The reader only verifies and exposes records. It does not rebuild broker
//! state.

use crate::codec::{decode_record, RECORD_DELIMITER};
use crate::error::{Result, WalError};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

/// Result of reading a whole WAL file.
#[derive(Debug, Clone, PartialEq)]
pub struct WalReadOutcome<M> {
    /// Decoded records, in file order
    pub records: Vec<M>,
    /// Bytes of a trailing partial line that were ignored
    pub truncated_tail_bytes: u64,
}

/// Reader for a WAL file.
#[derive(Debug)]
pub struct WalReader {
    path: PathBuf,
}

impl WalReader {
    /// Prepare to read the WAL at `path`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        WalReader {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path being read.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Iterate over complete records.
    ///
    /// A missing file yields no records.
    pub fn records<M: DeserializeOwned>(&self) -> Result<WalRecords<M>> {
        let reader = match File::open(&self.path) {
            Ok(file) => Some(BufReader::new(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(WalError::Read(e)),
        };
        Ok(WalRecords {
            reader,
            line: 0,
            buf: Vec::new(),
            tail_bytes: 0,
            _marker: PhantomData,
        })
    }

    /// Read every complete record.
    ///
    /// # Errors
    ///
    /// Returns [`WalError::Corrupt`] on the first complete line that is not
    /// a valid record, or [`WalError::Read`] on I/O failure.
    pub fn read_all<M: DeserializeOwned>(&self) -> Result<WalReadOutcome<M>> {
        let mut iter = self.records::<M>()?;
        let mut records = Vec::new();
        for record in iter.by_ref() {
            records.push(record?);
        }
        Ok(WalReadOutcome {
            records,
            truncated_tail_bytes: iter.truncated_tail_bytes(),
        })
    }
}

/// Iterator over the complete records of a WAL file.
pub struct WalRecords<M> {
    reader: Option<BufReader<File>>,
    line: usize,
    buf: Vec<u8>,
    tail_bytes: u64,
    _marker: PhantomData<fn() -> M>,
}

impl<M> WalRecords<M> {
    /// Size of a trailing partial line seen so far.
    pub fn truncated_tail_bytes(&self) -> u64 {
        self.tail_bytes
    }
}

impl<M: DeserializeOwned> Iterator for WalRecords<M> {
    type Item = Result<M>;

    fn next(&mut self) -> Option<Self::Item> {
        let reader = self.reader.as_mut()?;
        self.buf.clear();

        let n = match reader.read_until(RECORD_DELIMITER, &mut self.buf) {
            Ok(n) => n,
            Err(e) => {
                self.reader = None;
                return Some(Err(WalError::Read(e)));
            }
        };
        if n == 0 {
            self.reader = None;
            return None;
        }

        if self.buf.last() != Some(&RECORD_DELIMITER) {
            tracing::warn!(
                target: "kapokmq::wal",
                bytes = n,
                "Ignoring partial record at end of WAL"
            );
            self.tail_bytes = n as u64;
            self.reader = None;
            return None;
        }

        self.line += 1;
        let line = self.line;
        Some(decode_record(&self.buf).map_err(|e| match e {
            WalError::Decode(source) => WalError::Corrupt { line, source },
            other => other,
        }))
    }
}
