//! Non-blocking file logging.
//!
//! Log lines are pushed onto a bounded queue and written to a daily-rotating
//! file by a single background thread. Pushing never blocks: when the queue
//! is full the record is dropped. File problems are reported once on the
//! error stream and the sink falls back to error-stream-only operation.
//!
//! Nothing touches the filesystem unless logging is enabled *and* a
//! directory is configured. The writer thread starts on the first record.
//!
//! Every record is also emitted as a `tracing` event, so applications with
//! a subscriber installed see the same lines.

use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Local};
use parking_lot::Mutex;
use tracing::Level;
use tracing_appender::non_blocking::{ErrorCounter, NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};

use crate::config::LogSettings;
use crate::console::{announce, ErrorStream};
use crate::error::NotifyError;

/// File name prefix; files are named `tocsin.YYYY-MM-DD.log`.
pub const LOG_FILE_PREFIX: &str = "tocsin";

const LOG_FILE_SUFFIX: &str = "log";
const WRITER_THREAD_NAME: &str = "tocsin-log-writer";

/// A drop notice is printed every this many dropped records.
const DROP_NOTICE_EVERY: usize = 50;

/// One log line.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl LogRecord {
    pub fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            timestamp: Local::now(),
            level,
            message: message.into(),
        }
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:<5} | {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.level.as_str(),
            self.message
        )
    }
}

enum State {
    Idle,
    Running(Running),
    Failed,
}

struct Running {
    writer: NonBlocking,
    dropped: ErrorCounter,
    failed: Arc<AtomicBool>,
    _guard: WorkerGuard,
}

/// Queue-backed log sink shared by all clones of a sender.
pub struct LogSink {
    settings: LogSettings,
    stream: Arc<dyn ErrorStream>,
    state: Mutex<State>,
    drops_reported: AtomicUsize,
}

impl LogSink {
    pub fn new(settings: LogSettings, stream: Arc<dyn ErrorStream>) -> Self {
        Self {
            settings,
            stream,
            state: Mutex::new(State::Idle),
            drops_reported: AtomicUsize::new(0),
        }
    }

    pub fn settings(&self) -> &LogSettings {
        &self.settings
    }

    /// Whether the writer thread is currently running.
    pub fn is_running(&self) -> bool {
        matches!(*self.state.lock(), State::Running(_))
    }

    /// Record a line. Never blocks on I/O and never fails.
    pub fn record(&self, level: Level, message: impl Into<String>) {
        let record = LogRecord::new(level, message);
        emit_tracing(&record);

        if !self.settings.writes_files() {
            return;
        }

        let Some((mut writer, dropped)) = self.writer() else {
            return;
        };

        // lossy mode: a full queue drops the line and still returns Ok
        let _ = writer.write_all(format!("{record}\n").as_bytes());
        self.report_drops(dropped.dropped_lines());
    }

    /// Stop the writer thread, draining whatever is queued.
    ///
    /// A later record starts a new writer.
    pub fn shutdown(&self) {
        let running = {
            let mut state = self.state.lock();
            if !matches!(*state, State::Running(_)) {
                return;
            }
            std::mem::replace(&mut *state, State::Idle)
        };
        // dropping the guard flushes and joins the worker, outside the lock
        drop(running);
    }

    fn writer(&self) -> Option<(NonBlocking, ErrorCounter)> {
        let mut state = self.state.lock();

        if matches!(*state, State::Idle) {
            *state = match self.start() {
                Ok(running) => State::Running(running),
                Err(err) => {
                    announce(self.stream.as_ref(), &format!("LOGGING DISABLED: {err}"));
                    State::Failed
                }
            };
        }

        match &*state {
            // after a write failure the worker stays up but the queue is bypassed
            State::Running(running) if !running.failed.load(Ordering::Acquire) => {
                Some((running.writer.clone(), running.dropped.clone()))
            }
            _ => None,
        }
    }

    fn start(&self) -> Result<Running, NotifyError> {
        let directory = self
            .settings
            .directory
            .as_deref()
            .ok_or_else(|| NotifyError::Logging("no log directory configured".into()))?;

        std::fs::create_dir_all(directory).map_err(|e| {
            NotifyError::Logging(format!(
                "cannot create log directory {}: {e}",
                directory.display()
            ))
        })?;

        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(directory)
            .map_err(|e| {
                NotifyError::Logging(format!(
                    "cannot open log file in {}: {e}",
                    directory.display()
                ))
            })?;

        tracing::debug!(directory = %directory.display(), "Log writer started");
        Ok(self.spawn(appender))
    }

    /// Put `inner` behind the bounded queue and its worker thread.
    fn spawn<W: Write + Send + 'static>(&self, inner: W) -> Running {
        let failed = Arc::new(AtomicBool::new(false));
        let file = ReportingWriter {
            inner,
            stream: Arc::clone(&self.stream),
            failed: Arc::clone(&failed),
        };

        let (writer, guard) = NonBlockingBuilder::default()
            .lossy(true)
            .buffered_lines_limit(self.settings.queue_capacity.max(1))
            .thread_name(WRITER_THREAD_NAME)
            .finish(file);

        Running {
            dropped: writer.error_counter(),
            writer,
            failed,
            _guard: guard,
        }
    }

    fn report_drops(&self, dropped: usize) {
        let reported = self.drops_reported.load(Ordering::Relaxed);
        if dropped >= reported + DROP_NOTICE_EVERY
            && self
                .drops_reported
                .compare_exchange(reported, dropped, Ordering::Relaxed, Ordering::Relaxed)
                .is_ok()
        {
            announce(
                self.stream.as_ref(),
                &format!("LOG QUEUE FULL: dropped {dropped} log lines"),
            );
        }
    }
}

impl fmt::Debug for LogSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogSink")
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish()
    }
}

fn emit_tracing(record: &LogRecord) {
    let message = record.message.as_str();
    if record.level == Level::ERROR {
        tracing::error!(target: "tocsin", "{message}");
    } else if record.level == Level::WARN {
        tracing::warn!(target: "tocsin", "{message}");
    } else if record.level == Level::INFO {
        tracing::info!(target: "tocsin", "{message}");
    } else if record.level == Level::DEBUG {
        tracing::debug!(target: "tocsin", "{message}");
    } else {
        tracing::trace!(target: "tocsin", "{message}");
    }
}

/// File writer run on the worker thread.
///
/// The first I/O error is announced on the error stream; after that every
/// write is skipped so a broken disk cannot spam the caller.
struct ReportingWriter<W> {
    inner: W,
    stream: Arc<dyn ErrorStream>,
    failed: Arc<AtomicBool>,
}

impl<W: Write> ReportingWriter<W> {
    fn fail(&self, err: &io::Error) {
        if !self.failed.swap(true, Ordering::AcqRel) {
            announce(
                self.stream.as_ref(),
                &format!("LOGGING FAILURE (writer thread): {err}; continuing without log file"),
            );
        }
    }
}

impl<W: Write> Write for ReportingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.failed.load(Ordering::Acquire) {
            return Ok(buf.len());
        }
        if let Err(err) = self.inner.write_all(buf) {
            self.fail(&err);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.failed.load(Ordering::Acquire) {
            return Ok(());
        }
        if let Err(err) = self.inner.flush() {
            self.fail(&err);
        }
        Ok(())
    }
}
