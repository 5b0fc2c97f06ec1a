//! Error types for tocsin.

use std::fmt;

use thiserror::Error;

/// Errors that can occur while configuring or sending a notification.
///
/// Only [`NotifyError::Configuration`] ever leaves the crate, and only from
/// strict-mode construction. Every other variant is caught inside
/// [`EmailSender`](crate::EmailSender) and turned into a `false` result plus a
/// line on the error stream.
#[derive(Debug, Clone, Error)]
pub enum NotifyError {
    /// One or more configuration fields failed validation.
    #[error("Configuration error: {0}")]
    Configuration(ValidationErrors),

    /// Neither an explicit recipient nor a default recipient was available.
    #[error("Recipient email must be specified")]
    MissingRecipient,

    /// An explicit recipient was given but is blank.
    #[error("Invalid recipient: {0:?}")]
    InvalidRecipient(String),

    /// The message could not be assembled (e.g. an unparseable address).
    #[error("Build error: {0}")]
    Build(String),

    /// The transport failed to connect, authenticate or transmit.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The log directory, log file or writer thread failed.
    #[error("Logging error: {0}")]
    Logging(String),

    /// The transport panicked.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl NotifyError {
    /// The field errors carried by a configuration error, if any.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            Self::Configuration(errors) => errors.as_slice(),
            _ => &[],
        }
    }
}

/// Failure category reported by a [`Transport`](crate::Transport).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportErrorKind {
    /// Connection refused, unreachable host or DNS failure.
    Connection,
    /// The transport's own timeout elapsed.
    Timeout,
    /// The server rejected the credentials.
    Authentication,
    /// TLS negotiation failed.
    Tls,
    /// The server refused the message.
    Rejected,
    /// Anything else.
    Other,
}

impl fmt::Display for TransportErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connection => "connection",
            Self::Timeout => "timeout",
            Self::Authentication => "authentication",
            Self::Tls => "tls",
            Self::Rejected => "rejected",
            Self::Other => "other",
        };
        f.write_str(name)
    }
}

/// A failure surfaced by the transport capability.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Transport error ({kind}): {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn connection(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Connection, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Authentication, message)
    }

    pub fn tls(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Tls, message)
    }
}

/// A configuration field that can fail validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    SmtpServer,
    Port,
    Login,
    Password,
    DefaultRecipient,
    LoggingEnabled,
    LogDirectory,
    StrictValidation,
    Timeout,
    Tls,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SmtpServer => "smtp_server",
            Self::Port => "port",
            Self::Login => "login",
            Self::Password => "password",
            Self::DefaultRecipient => "default_recipient",
            Self::LoggingEnabled => "logging_enabled",
            Self::LogDirectory => "log_directory",
            Self::StrictValidation => "strict_validation",
            Self::Timeout => "timeout",
            Self::Tls => "tls",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The validation rule a field violated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rule {
    Missing,
    WhitespaceOnly,
    NotANumber,
    OutOfRange,
    InvalidEmail,
    InvalidValue,
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Missing => "missing",
            Self::WhitespaceOnly => "whitespace only",
            Self::NotANumber => "not a number",
            Self::OutOfRange => "out of range",
            Self::InvalidEmail => "invalid email",
            Self::InvalidValue => "invalid value",
        };
        f.write_str(name)
    }
}

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {detail}")]
pub struct FieldError {
    pub field: Field,
    pub rule: Rule,
    pub detail: String,
}

impl FieldError {
    pub fn new(field: Field, rule: Rule, detail: impl Into<String>) -> Self {
        Self {
            field,
            rule,
            detail: detail.into(),
        }
    }
}

/// All field errors collected in one validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self(errors)
    }

    pub fn as_slice(&self) -> &[FieldError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether any error concerns `field`.
    pub fn contains(&self, field: Field) -> bool {
        self.0.iter().any(|e| e.field == field)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} validation error(s)", self.0.len())?;
        for (i, err) in self.0.iter().enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{sep}{err}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "smtp")]
impl From<lettre::transport::smtp::Error> for TransportError {
    fn from(err: lettre::transport::smtp::Error) -> Self {
        use lettre::transport::smtp::response::{Category, Detail, Severity};

        let kind = if err.is_timeout() || io_timed_out(&err) {
            TransportErrorKind::Timeout
        } else if err.is_tls() {
            TransportErrorKind::Tls
        } else if let Some(code) = err.status() {
            // 530/534/535 are the authentication failures
            if code.severity == Severity::PermanentNegativeCompletion
                && code.category == Category::Unspecified3
                && matches!(code.detail, Detail::Zero | Detail::Four | Detail::Five)
            {
                TransportErrorKind::Authentication
            } else {
                TransportErrorKind::Rejected
            }
        } else if err.is_client() {
            TransportErrorKind::Other
        } else {
            TransportErrorKind::Connection
        };

        Self::new(kind, err.to_string())
    }
}

/// Socket read timeouts surface as `WouldBlock` on Unix and `TimedOut` on
/// Windows; lettre only recognises the latter.
#[cfg(feature = "smtp")]
fn io_timed_out(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return is_timeout_kind(io.kind());
        }
        source = cause.source();
    }
    false
}

#[cfg(any(feature = "smtp", test))]
fn is_timeout_kind(kind: std::io::ErrorKind) -> bool {
    matches!(
        kind,
        std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
    )
}
