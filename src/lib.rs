//! # Tocsin
//!
//! One-shot email alerts for scripts, cron jobs and service-failure hooks.
//! Each call makes exactly one delivery attempt and returns a `bool`; every
//! outcome is announced on stderr. Nothing is retried, queued or deduplicated.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tocsin::{EmailSender, ExceptionReport, Settings};
//!
//! let sender = EmailSender::new(
//!     Settings::new()
//!         .smtp_server("smtp.gmail.com")
//!         .port(587)
//!         .login("me@gmail.com")
//!         .password("app-password")
//!         .default_recipient("me@gmail.com"),
//! )?;
//!
//! sender.send_email("Job completed", "The scheduled job finished successfully.", None, false);
//!
//! if let Err(err) = run_job() {
//!     let report = ExceptionReport::capture(&err);
//!     sender.send_exception(Some(&report), None);
//! }
//! ```
//!
//! ## Environment Variables
//!
//! [`EmailSender::from_env`] reads:
//!
//! | Variable | Description |
//! |----------|-------------|
//! | `SMTP_HOST` / `SMTP_SERVER` | SMTP server host |
//! | `SMTP_PORT` | SMTP server port |
//! | `SMTP_USERNAME` / `SMTP_LOGIN` / `EMAIL_ADDRESS` | Login, also used as the sender address |
//! | `SMTP_PASSWORD` / `EMAIL_PASSWORD` | Password |
//! | `EMAIL_TO` / `NOTIFY_TO` / `MAIN_EMAIL_ADDRESS` | Default recipient |
//! | `SMTP_TLS` | `starttls` (default), `tls` or `none` |
//! | `SMTP_TIMEOUT_SECS` | Transport timeout (default: 10) |
//! | `NOTIFY_LOG_ENABLED` | File logging switch (default: true) |
//! | `NOTIFY_LOG_DIR` | Directory for daily log files (unset: no files) |
//! | `NOTIFY_STRICT_CONFIG` | Fail construction on invalid settings |
//!
//! ## Validation Modes
//!
//! - **Lenient** (default): invalid settings are listed on stderr and the
//!   sender is still built; sends against broken fields fail at delivery.
//! - **Strict**: construction returns [`NotifyError::Configuration`] with
//!   every invalid field.
//!
//! ## Feature Flags
//!
//! - `smtp` (default) - SMTP delivery via lettre. Without it the default
//!   transport only logs.

/// The version of the tocsin crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

mod config;
mod console;
mod error;
mod message;
mod report;
mod sender;
mod transport;
mod validate;

pub mod logging;
pub mod transports;

// Re-exports
pub use config::{
    Config, LogSettings, PortValue, Settings, TlsMode, ValidationMode, DEFAULT_LOG_QUEUE_CAPACITY,
    DEFAULT_TIMEOUT_SECS,
};
pub use console::{ErrorStream, MemoryStream, Stderr, LINE_PREFIX};
pub use error::{
    Field, FieldError, NotifyError, Rule, TransportError, TransportErrorKind, ValidationErrors,
};
pub use message::{resolve_recipient, Message, ToText};
pub use report::{render_html, ExceptionReport, EXCEPTION_SUBJECT};
pub use sender::{EmailSender, EmailSenderBuilder};
pub use transport::Transport;
pub use validate::{looks_like_email, validate, ValidationResult};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::EmailSender;
    pub use crate::ExceptionReport;
    pub use crate::NotifyError;
    pub use crate::Settings;
    pub use crate::ToText;
    pub use crate::Transport;
}
