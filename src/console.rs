//! The error stream: where every outcome is announced, one line each.
//!
//! Lines look like `[tocsin] 2026-01-31 04:00:01 | Email sent to ops@example.com`.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

/// Prefix on every error-stream line.
pub const LINE_PREFIX: &str = "[tocsin]";

/// A sink for human-readable diagnostic lines.
///
/// Implementations must not panic or block for long; a failed write is
/// dropped.
pub trait ErrorStream: Send + Sync {
    fn write_line(&self, line: &str);
}

/// Standard error. Write failures (closed stderr, broken pipe) are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stderr;

impl ErrorStream for Stderr {
    fn write_line(&self, line: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{line}");
        let _ = stderr.flush();
    }
}

/// Captures lines in memory. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryStream {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// Whether any line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }

    /// Number of lines containing `needle`.
    pub fn count(&self, needle: &str) -> usize {
        self.lines.lock().iter().filter(|l| l.contains(needle)).count()
    }

    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl ErrorStream for MemoryStream {
    fn write_line(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

impl<T: ErrorStream + ?Sized> ErrorStream for Arc<T> {
    fn write_line(&self, line: &str) {
        (**self).write_line(line)
    }
}

/// Local wall-clock timestamp used on every line.
pub(crate) fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Write one prefixed, timestamped line.
pub(crate) fn announce(stream: &dyn ErrorStream, message: &str) {
    stream.write_line(&format!("{LINE_PREFIX} {} | {message}", timestamp()));
}
