//! Diagnostic log
//!
//! Operator-facing log written to `log/kapokmq-YYYY-MM-DD.log`, one file per
//! calendar day (local date). Events are formatted by `tracing-subscriber`
//! without ANSI colors, with UTC timestamps and source locations.
//!
//! Failing to set the log up is a returned [`DiagnosticLogError`]; the caller
//! decides whether to continue without diagnostics or abort.

use chrono::{Local, NaiveDate};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Directory the diagnostic log lives in, relative to the working directory.
pub const LOG_DIR: &str = "log";

/// Directive used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_DIRECTIVES: &str = "info";

/// Diagnostic log setup errors.
#[derive(Debug, Error)]
pub enum DiagnosticLogError {
    /// The log directory could not be created.
    #[error("failed to create log directory '{}': {source}", .path.display())]
    CreateDir {
        /// Directory path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// The day's log file could not be opened.
    #[error("failed to open log file '{}': {source}", .path.display())]
    Open {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// A global subscriber is already installed.
    #[error("failed to install diagnostic subscriber: {0}")]
    Install(#[from] tracing::subscriber::SetGlobalDefaultError),
}

/// File name for a given day: `kapokmq-YYYY-MM-DD.log`.
pub fn log_file_name(date: NaiveDate) -> String {
    format!("kapokmq-{}.log", date.format("%Y-%m-%d"))
}

type Clock = Arc<dyn Fn() -> NaiveDate + Send + Sync>;

struct DailyState {
    date: NaiveDate,
    file: File,
}

/// Append-only log file that moves to a new file when the date changes.
pub struct DailyFile {
    dir: PathBuf,
    clock: Clock,
    state: Mutex<DailyState>,
}

impl DailyFile {
    /// Open today's log file under `dir`, creating the directory if needed.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, DiagnosticLogError> {
        Self::with_clock(dir, Arc::new(|| Local::now().date_naive()))
    }

    /// Like [`DailyFile::open`] with an explicit date source.
    pub fn with_clock(
        dir: impl AsRef<Path>,
        clock: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
    ) -> Result<Self, DiagnosticLogError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir).map_err(|source| DiagnosticLogError::CreateDir {
            path: dir.clone(),
            source,
        })?;

        let date = clock();
        let path = dir.join(log_file_name(date));
        let file = open_append(&path).map_err(|source| DiagnosticLogError::Open { path, source })?;

        Ok(DailyFile {
            dir,
            clock,
            state: Mutex::new(DailyState { date, file }),
        })
    }

    /// Path of the file currently being written.
    pub fn current_path(&self) -> PathBuf {
        self.dir.join(log_file_name(self.state.lock().date))
    }

    fn write_line(&self, buf: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        let today = (self.clock)();
        if today != state.date {
            state.file = open_append(&self.dir.join(log_file_name(today)))?;
            state.date = today;
        }
        state.file.write_all(buf)
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Per-event writer handed out by [`DailyFile`].
pub struct DailyFileWriter<'a> {
    target: &'a DailyFile,
}

impl Write for DailyFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.target.write_line(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for DailyFile {
    type Writer = DailyFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        DailyFileWriter { target: self }
    }
}

/// Build a subscriber that writes to `file`, filtered by `directives`.
pub fn diagnostic_subscriber(
    file: DailyFile,
    directives: &str,
) -> impl tracing::Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .with_writer(file)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .finish()
}

/// Install the diagnostic log as the global subscriber.
///
/// Uses `RUST_LOG` when set, [`DEFAULT_DIRECTIVES`] otherwise. Returns the
/// path of today's log file.
pub fn init_diagnostic_log(dir: impl AsRef<Path>) -> Result<PathBuf, DiagnosticLogError> {
    let file = DailyFile::open(dir)?;
    let path = file.current_path();
    let directives =
        std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_DIRECTIVES.to_string());
    tracing::subscriber::set_global_default(diagnostic_subscriber(file, &directives))?;
    tracing::info!(target: "kapokmq::diagnostic", path = %path.display(), "Diagnostic log started");
    Ok(path)
}
