//! Exception reports.
//!
//! A report is captured where an error is caught and carries its own trace
//! text from then on, so it can be sent from anywhere later without relying
//! on the call stack at send time.
//!
//! ```
//! use tocsin::ExceptionReport;
//!
//! let err = "x".parse::<u32>().unwrap_err();
//! let report = ExceptionReport::capture(&err);
//! assert_eq!(report.type_name(), "ParseIntError");
//! assert!(!report.trace().is_empty());
//! ```

use std::any::Any;
use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt::Write as _;

/// Subject line used for every exception report.
pub const EXCEPTION_SUBJECT: &str = "Exception Occurred in Script";

/// A captured error: type name, message and trace text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionReport {
    type_name: String,
    message: String,
    trace: String,
}

impl ExceptionReport {
    /// A report with no trace.
    pub fn new(type_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            message: message.into(),
            trace: String::new(),
        }
    }

    /// Replace the trace text.
    pub fn with_trace(mut self, trace: impl Into<String>) -> Self {
        self.trace = trace.into();
        self
    }

    /// Capture `err` now: its type, message, source chain and a backtrace
    /// taken at this point.
    ///
    /// Trait objects are accepted, so a `Box<dyn Error + Send + Sync>` can
    /// be captured with `capture(&*err)`; its type is reported as
    /// `dyn Error`.
    pub fn capture<E: Error + ?Sized>(err: &E) -> Self {
        let mut trace = String::new();
        let type_name = short_type_name(std::any::type_name::<E>());
        let _ = writeln!(trace, "{type_name}: {err}");

        let mut source = err.source();
        while let Some(cause) = source {
            let _ = writeln!(trace, "Caused by: {cause}");
            source = cause.source();
        }

        let _ = writeln!(trace);
        let _ = write!(trace, "{}", Backtrace::force_capture());

        Self {
            type_name,
            message: err.to_string(),
            trace,
        }
    }

    /// Build a report from a `std::panic::catch_unwind` payload.
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "(non-string panic payload)".to_string()
        };

        let trace = format!("panicked: {message}\n\n{}", Backtrace::force_capture());
        Self {
            type_name: "Panic".to_string(),
            message,
            trace,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> &str {
        &self.trace
    }
}

impl<E: Error + ?Sized> From<&E> for ExceptionReport {
    fn from(err: &E) -> Self {
        Self::capture(err)
    }
}

/// Render the HTML report body. `None` produces an "unknown error" report.
pub fn render_html(report: Option<&ExceptionReport>) -> String {
    let (type_name, message, trace) = match report {
        Some(r) => (
            r.type_name(),
            r.message(),
            if r.trace().is_empty() {
                "(no traceback captured)"
            } else {
                r.trace()
            },
        ),
        None => (
            "UnknownException",
            "(no exception object)",
            "(no traceback captured)",
        ),
    };

    format!(
        "<h1>Exception Report</h1>\
         <p><strong>Type:</strong> {}</p>\
         <p><strong>Message:</strong> {}</p>\
         <p><strong>Traceback:</strong></p>\
         <pre>{}</pre>",
        escape(type_name),
        escape(message),
        escape(trace),
    )
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// `core::num::error::ParseIntError` -> `ParseIntError`, keeping generics.
/// Trait objects keep only the trait: `dyn core::error::Error + Send` ->
/// `dyn Error`.
fn short_type_name(full: &str) -> String {
    if let Some(object) = full.strip_prefix("dyn ") {
        let principal = object.split(" + ").next().unwrap_or(object);
        return format!("dyn {}", short_path(principal));
    }
    short_path(full).to_string()
}

fn short_path(full: &str) -> &str {
    let base_end = full.find('<').unwrap_or(full.len());
    match full[..base_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}
