//! The email sender.
//!
//! # Failure policy
//!
//! A send never raises. Each call makes one transport attempt and returns
//! `true` or `false`; the reason is always written to the error stream (and
//! the log file, when configured). Only construction in strict mode can
//! return an error.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::Level;

use crate::config::{Config, Settings, ValidationMode};
use crate::console::{announce, ErrorStream, Stderr};
use crate::error::{NotifyError, ValidationErrors};
use crate::logging::LogSink;
use crate::message::{resolve_recipient, Message, ToText};
use crate::report::{render_html, ExceptionReport, EXCEPTION_SUBJECT};
use crate::transport::Transport;
use crate::validate::ValidationResult;

const DIAGNOSTICS_HEADER: &str = "EmailSender initialization DIAGNOSTICS:";
const ENV_HINT: &str = "Hint: if you use env vars in your calling script, verify they are set.";

/// Sends one-shot notification emails.
///
/// Cheap to clone; clones share the transport, error stream and log queue,
/// and can be used from many threads at once. Each send opens its own
/// connection.
///
/// ```rust,ignore
/// use tocsin::{EmailSender, Settings};
///
/// let sender = EmailSender::new(
///     Settings::new()
///         .smtp_server("smtp.gmail.com")
///         .port(587)
///         .login("me@gmail.com")
///         .password(std::env::var("EMAIL_PASSWORD").unwrap_or_default())
///         .default_recipient("me@gmail.com"),
/// )?;
///
/// if !sender.send_email("Job completed", "The scheduled job finished successfully.", None, false) {
///     // already reported on stderr; retrying is up to you
/// }
/// ```
#[derive(Clone)]
pub struct EmailSender {
    config: Arc<Config>,
    transport: Arc<dyn Transport>,
    stream: Arc<dyn ErrorStream>,
    log: Arc<LogSink>,
}

impl EmailSender {
    /// Validate `settings` and build a sender with the default transport.
    ///
    /// Lenient mode prints diagnostics and returns `Ok` even for broken
    /// settings. Strict mode returns [`NotifyError::Configuration`] listing
    /// every invalid field.
    pub fn new(settings: Settings) -> Result<Self, NotifyError> {
        Self::builder(settings).build()
    }

    /// Build a sender from [`Settings::from_env`].
    pub fn from_env() -> Result<Self, NotifyError> {
        Self::new(Settings::from_env())
    }

    pub fn builder(settings: Settings) -> EmailSenderBuilder {
        EmailSenderBuilder {
            settings,
            transport: None,
            stream: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Name of the transport in use.
    pub fn transport_name(&self) -> &'static str {
        self.transport.name()
    }

    /// Send one email.
    ///
    /// `subject` and `body` accept anything implementing [`ToText`].
    /// `recipient` overrides the configured default; a blank value is
    /// rejected, never replaced by the default. `html` selects a `text/html` body, which is passed through
    /// unescaped.
    ///
    /// Returns `false` without attempting delivery when the explicit
    /// recipient is blank or no recipient can be resolved. Otherwise exactly
    /// one delivery attempt is made. A dry-run transport reports success as
    /// `DRY RUN` instead of `Email sent`.
    pub fn send_email(
        &self,
        subject: impl ToText,
        body: impl ToText,
        recipient: Option<&str>,
        html: bool,
    ) -> bool {
        let subject = subject.to_text();
        let body = body.to_text();

        let recipient = match resolve_recipient(recipient, &self.config) {
            Ok(recipient) => recipient,
            Err(NotifyError::InvalidRecipient(raw)) => {
                self.loud(Level::ERROR, &format!("INVALID RECIPIENT: {raw:?}"));
                return false;
            }
            Err(err) => {
                self.loud(Level::ERROR, &format!("SEND FAILED: {err}"));
                return false;
            }
        };

        let message = Message::new(&self.config, recipient, subject, body, html);

        let span = tracing::info_span!(
            "tocsin.send",
            transport = self.transport.name(),
            to = %message.to,
            subject = %message.subject,
        );
        let _guard = span.enter();

        self.log.record(
            Level::DEBUG,
            format!("Connecting to SMTP {}", self.config.endpoint()),
        );

        match self.transmit(&message) {
            Ok(()) if self.transport.delivers() => {
                self.loud(Level::INFO, &format!("Email sent to {}", message.to));
                true
            }
            Ok(()) => {
                self.loud(
                    Level::INFO,
                    &format!(
                        "DRY RUN: email to {} not delivered (transport '{}')",
                        message.to,
                        self.transport.name()
                    ),
                );
                true
            }
            Err(err) => {
                self.loud(
                    Level::ERROR,
                    &format!("SMTP SEND FAILURE to {}: {err}", message.to),
                );
                false
            }
        }
    }

    /// Send an HTML exception report.
    ///
    /// `None` sends an "unknown error" report instead of failing. Recipient
    /// handling and the return value follow [`send_email`](Self::send_email).
    pub fn send_exception(
        &self,
        report: Option<&ExceptionReport>,
        recipient: Option<&str>,
    ) -> bool {
        self.send_email(EXCEPTION_SUBJECT, render_html(report), recipient, true)
    }

    /// Drain and stop the background log writer.
    ///
    /// Call before process exit to keep queued log lines; records enqueued
    /// later restart the writer.
    pub fn shutdown(&self) {
        self.log.shutdown();
    }

    fn transmit(&self, message: &Message) -> Result<(), NotifyError> {
        catch_unwind(AssertUnwindSafe(|| self.transport.transmit(&self.config, message)))
            .unwrap_or_else(|payload| {
                let report = ExceptionReport::from_panic(payload.as_ref());
                Err(NotifyError::Internal(format!(
                    "transport '{}' panicked: {}",
                    self.transport.name(),
                    report.message()
                )))
            })
    }

    /// Error stream plus log queue.
    fn loud(&self, level: Level, line: &str) {
        announce(self.stream.as_ref(), line);
        self.log.record(level, line);
    }
}

impl std::fmt::Debug for EmailSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailSender")
            .field("config", &self.config)
            .field("transport", &self.transport.name())
            .field("log", &self.log)
            .finish()
    }
}

/// Builder for [`EmailSender`].
pub struct EmailSenderBuilder {
    settings: Settings,
    transport: Option<Arc<dyn Transport>>,
    stream: Option<Arc<dyn ErrorStream>>,
}

impl EmailSenderBuilder {
    /// Use a specific transport instead of the default.
    pub fn transport<T: Transport + 'static>(mut self, transport: T) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Send diagnostic lines somewhere other than stderr.
    pub fn error_stream<S: ErrorStream + 'static>(mut self, stream: S) -> Self {
        self.stream = Some(Arc::new(stream));
        self
    }

    /// Validate the settings and build the sender.
    pub fn build(self) -> Result<EmailSender, NotifyError> {
        let stream = self.stream.unwrap_or_else(|| Arc::new(Stderr));
        let (config, result) = Config::from_settings(self.settings);
        let log = Arc::new(LogSink::new(config.logging().clone(), Arc::clone(&stream)));

        let sender = EmailSender {
            transport: self.transport.unwrap_or_else(default_transport),
            config: Arc::new(config),
            stream,
            log,
        };

        if let ValidationResult::Invalid(errors) = result {
            sender.report_diagnostics(&errors);
            if sender.config.validation() == ValidationMode::Strict {
                return Err(NotifyError::Configuration(ValidationErrors::new(errors)));
            }
        }

        sender.log.record(Level::INFO, "EmailSender initialized");
        Ok(sender)
    }
}

impl EmailSender {
    fn report_diagnostics(&self, errors: &[crate::error::FieldError]) {
        self.loud(Level::WARN, DIAGNOSTICS_HEADER);
        for (i, err) in errors.iter().enumerate() {
            self.loud(Level::WARN, &format!("  {}. {}", i + 1, err.detail));
        }
        self.loud(Level::WARN, ENV_HINT);
    }
}

#[cfg(feature = "smtp")]
fn default_transport() -> Arc<dyn Transport> {
    Arc::new(crate::transports::SmtpTransport::new())
}

#[cfg(not(feature = "smtp"))]
fn default_transport() -> Arc<dyn Transport> {
    Arc::new(crate::transports::LoggerTransport::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::MemoryStream;
    use crate::error::{Field, TransportErrorKind};
    use crate::transports::LocalTransport;

    fn settings() -> Settings {
        Settings::new()
            .smtp_server("smtp.example.com")
            .port(587)
            .login("alerts@example.com")
            .password("app-password")
    }

    fn sender(settings: Settings) -> (EmailSender, LocalTransport, MemoryStream) {
        let transport = LocalTransport::new();
        let stream = MemoryStream::new();
        let sender = EmailSender::builder(settings)
            .transport(transport.clone())
            .error_stream(stream.clone())
            .build()
            .unwrap();
        (sender, transport, stream)
    }

    struct PanickingTransport;

    impl Transport for PanickingTransport {
        fn transmit(&self, _config: &Config, _message: &Message) -> Result<(), NotifyError> {
            panic!("transport exploded");
        }
    }

    #[test]
    fn test_send_success_writes_one_line() {
        let (sender, transport, stream) = sender(settings().default_recipient("ops@example.com"));

        assert!(sender.send_email("Job completed", "done", None, false));
        assert_eq!(transport.message_count(), 1);
        assert_eq!(stream.lines().len(), 1);
        assert!(stream.contains("Email sent to ops@example.com"));
    }

    #[test]
    fn test_missing_recipient_skips_transport() {
        let (sender, transport, stream) = sender(settings());

        assert!(!sender.send_email("s", "b", None, false));
        assert_eq!(transport.attempts(), 0);
        assert!(stream.contains("Recipient email must be specified"));
    }

    #[test]
    fn test_blank_recipient_is_rejected_not_defaulted() {
        let (sender, transport, stream) = sender(settings().default_recipient("ops@example.com"));

        assert!(!sender.send_email("s", "b", Some("   "), false));
        assert_eq!(transport.attempts(), 0);
        assert!(stream.contains("INVALID RECIPIENT: \"   \""));
        assert!(!stream.contains("Email sent"));
    }

    #[test]
    fn test_dry_run_transport_is_not_reported_as_sent() {
        let stream = MemoryStream::new();
        let sender = EmailSender::builder(settings())
            .transport(crate::transports::LoggerTransport::new())
            .error_stream(stream.clone())
            .build()
            .unwrap();

        assert!(sender.send_email("s", "b", Some("ops@example.com"), false));
        assert!(stream.contains("DRY RUN: email to ops@example.com not delivered (transport 'logger')"));
        assert!(!stream.contains("Email sent"));
    }

    #[test]
    fn test_transport_failure_returns_false() {
        let (sender, transport, stream) = sender(settings());
        transport.set_failure(TransportErrorKind::Connection, "connection refused");

        assert!(!sender.send_email("s", "b", Some("ops@example.com"), false));
        assert_eq!(transport.attempts(), 1);
        assert!(stream.contains("SMTP SEND FAILURE to ops@example.com"));
        assert!(stream.contains("connection refused"));
    }

    #[test]
    fn test_transport_panic_is_contained() {
        let stream = MemoryStream::new();
        let sender = EmailSender::builder(settings())
            .transport(PanickingTransport)
            .error_stream(stream.clone())
            .build()
            .unwrap();

        assert!(!sender.send_email("s", "b", Some("ops@example.com"), false));
        assert!(stream.contains("transport exploded"));
    }

    #[test]
    fn test_lenient_construction_prints_diagnostics() {
        let (sender, _, stream) = sender(settings().port(0));

        assert_eq!(sender.config().port(), None);
        assert!(stream.contains(DIAGNOSTICS_HEADER));
        assert!(stream.contains("1. Port 0 is outside valid range (1-65535)"));
        assert!(stream.contains("Hint:"));
    }

    #[test]
    fn test_strict_construction_fails_with_all_errors() {
        let stream = MemoryStream::new();
        let err = EmailSender::builder(Settings::new().port("x").strict(true))
            .transport(LocalTransport::new())
            .error_stream(stream.clone())
            .build()
            .unwrap_err();

        let fields: Vec<Field> = err.field_errors().iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec![Field::SmtpServer, Field::Port, Field::Login, Field::Password]
        );
        assert!(stream.contains(DIAGNOSTICS_HEADER));
    }

    #[test]
    fn test_send_exception_uses_html() {
        let (sender, transport, _) = sender(settings());
        let report = ExceptionReport::new("ZeroDivisionError", "division by zero")
            .with_trace("trace line");

        assert!(sender.send_exception(Some(&report), Some("ops@example.com")));
        let sent = transport.last_message().unwrap().message;
        assert!(sent.is_html);
        assert_eq!(sent.subject, EXCEPTION_SUBJECT);
        assert!(sent.body.contains("ZeroDivisionError"));
    }

    #[test]
    fn test_clone_shares_transport() {
        let (sender, transport, _) = sender(settings());
        let clone = sender.clone();
        assert!(clone.send_email("s", "b", Some("ops@example.com"), false));
        assert_eq!(transport.message_count(), 1);
        assert_eq!(sender.transport_name(), "local");
    }
}
