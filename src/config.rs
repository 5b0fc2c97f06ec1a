//! Sender configuration: raw [`Settings`], the validated [`Config`], and
//! environment loading.
//!
//! `Settings` is what the caller hands in. Every field is optional so that a
//! missing value is representable and reported by the validator instead of
//! failing to compile or panicking. `Config` is the immutable, normalized
//! result that the sender holds for its whole life.
//!
//! ```
//! use tocsin::Settings;
//!
//! let settings = Settings::new()
//!     .smtp_server("smtp.example.com")
//!     .port("587")
//!     .login("alerts@example.com")
//!     .password("app-password")
//!     .default_recipient("oncall@example.com");
//!
//! assert!(tocsin::validate(&settings).is_valid());
//! ```

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Field, FieldError, Rule};
use crate::validate::{self, ValidationResult};

/// Default transport timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Default capacity of the log queue.
pub const DEFAULT_LOG_QUEUE_CAPACITY: usize = 1000;

/// How construction reacts to invalid configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Print diagnostics and keep going; broken fields fail at send time.
    #[default]
    Lenient,
    /// Refuse to construct the sender, listing every field error.
    Strict,
}

/// Transport security for the SMTP connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TlsMode {
    /// Upgrade a plaintext connection with STARTTLS (port 587).
    #[default]
    StartTls,
    /// Connect with TLS from the start (port 465).
    Tls,
    /// No TLS. Only for local relays and test servers.
    None,
}

impl TlsMode {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starttls" | "start_tls" => Some(Self::StartTls),
            "tls" | "ssl" | "implicit" => Some(Self::Tls),
            "none" | "plain" | "off" => Some(Self::None),
            _ => None,
        }
    }
}

/// A port as supplied by the caller: a number or its textual form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PortValue {
    Number(i64),
    Text(String),
}

impl PortValue {
    /// Coerce to a valid TCP port.
    pub fn coerce(&self) -> Result<u16, FieldError> {
        let number = match self {
            Self::Number(n) => *n,
            Self::Text(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Err(FieldError::new(
                        Field::Port,
                        Rule::Missing,
                        "Port is missing or empty",
                    ));
                }
                trimmed.parse::<i64>().map_err(|_| {
                    FieldError::new(
                        Field::Port,
                        Rule::NotANumber,
                        format!("Port must be a number, got '{text}'"),
                    )
                })?
            }
        };

        if (1..=65535).contains(&number) {
            Ok(number as u16)
        } else {
            Err(FieldError::new(
                Field::Port,
                Rule::OutOfRange,
                format!("Port {number} is outside valid range (1-65535)"),
            ))
        }
    }
}

macro_rules! port_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for PortValue {
                fn from(value: $t) -> Self {
                    Self::Number(i64::from(value))
                }
            }
        )*
    };
}

port_from_int!(u8, u16, u32, i8, i16, i32, i64);

impl From<usize> for PortValue {
    fn from(value: usize) -> Self {
        Self::Number(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<&str> for PortValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PortValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

/// File logging options.
///
/// Logging is on by default, but nothing touches the filesystem until a
/// directory is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub enabled: bool,
    pub directory: Option<PathBuf>,
    pub queue_capacity: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            directory: None,
            queue_capacity: DEFAULT_LOG_QUEUE_CAPACITY,
        }
    }
}

impl LogSettings {
    /// Logging switched off entirely.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Daily log files under `directory`.
    pub fn in_directory(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: Some(directory.into()),
            ..Self::default()
        }
    }

    /// Set the queue capacity.
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// True when records will actually reach a file.
    pub fn writes_files(&self) -> bool {
        self.enabled && self.directory.is_some()
    }
}

/// Raw, unvalidated sender configuration.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub smtp_server: Option<String>,
    pub port: Option<PortValue>,
    pub login: Option<String>,
    pub password: Option<String>,
    pub default_recipient: Option<String>,
    pub validation: ValidationMode,
    pub tls: TlsMode,
    /// Transport timeout in seconds.
    pub timeout_secs: Option<u64>,
    pub logging: LogSettings,
    /// Problems found while reading the environment; folded into validation.
    #[serde(skip)]
    pub(crate) load_errors: Vec<FieldError>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn smtp_server(mut self, server: impl Into<String>) -> Self {
        self.smtp_server = Some(server.into());
        self
    }

    /// Set the port. Accepts integers and numeric strings.
    pub fn port(mut self, port: impl Into<PortValue>) -> Self {
        self.port = Some(port.into());
        self
    }

    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = Some(login.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn default_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.default_recipient = Some(recipient.into());
        self
    }

    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    /// Shorthand for `validation(ValidationMode::Strict)`.
    pub fn strict(self, strict: bool) -> Self {
        self.validation(if strict {
            ValidationMode::Strict
        } else {
            ValidationMode::Lenient
        })
    }

    pub fn tls(mut self, mode: TlsMode) -> Self {
        self.tls = mode;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    pub fn logging(mut self, logging: LogSettings) -> Self {
        self.logging = logging;
        self
    }

    /// Errors collected while loading from the environment.
    pub fn load_errors(&self) -> &[FieldError] {
        &self.load_errors
    }

    /// Load settings from the process environment.
    ///
    /// See [`Settings::from_lookup`] for the variable names.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary key lookup.
    ///
    /// | Field | Variables (first set wins) |
    /// |-------|----------------------------|
    /// | server | `SMTP_HOST`, `SMTP_SERVER` |
    /// | port | `SMTP_PORT` |
    /// | login | `SMTP_USERNAME`, `SMTP_LOGIN`, `EMAIL_ADDRESS` |
    /// | password | `SMTP_PASSWORD`, `EMAIL_PASSWORD` |
    /// | default recipient | `EMAIL_TO`, `NOTIFY_TO`, `MAIN_EMAIL_ADDRESS` |
    /// | logging | `NOTIFY_LOG_ENABLED`, `NOTIFY_LOG_DIR` |
    /// | strict validation | `NOTIFY_STRICT_CONFIG` |
    /// | transport | `SMTP_TLS`, `SMTP_TIMEOUT_SECS` |
    ///
    /// Malformed values are recorded as field errors and reported by
    /// validation; they never panic.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let first = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| lookup(key).filter(|value| !value.is_empty()))
        };

        let mut settings = Self::new();
        let mut errors = Vec::new();

        settings.smtp_server = first(&["SMTP_HOST", "SMTP_SERVER"]);
        settings.port = first(&["SMTP_PORT"]).map(PortValue::Text);
        settings.login = first(&["SMTP_USERNAME", "SMTP_LOGIN", "EMAIL_ADDRESS"]);
        settings.password = first(&["SMTP_PASSWORD", "EMAIL_PASSWORD"]);
        settings.default_recipient = first(&["EMAIL_TO", "NOTIFY_TO", "MAIN_EMAIL_ADDRESS"]);

        if let Some(raw) = first(&["NOTIFY_LOG_ENABLED"]) {
            match parse_bool(&raw) {
                Some(enabled) => settings.logging.enabled = enabled,
                None => errors.push(FieldError::new(
                    Field::LoggingEnabled,
                    Rule::InvalidValue,
                    format!("NOTIFY_LOG_ENABLED must be a boolean, got '{raw}'"),
                )),
            }
        }

        if let Some(raw) = first(&["NOTIFY_LOG_DIR"]) {
            if raw.trim().is_empty() {
                errors.push(FieldError::new(
                    Field::LogDirectory,
                    Rule::WhitespaceOnly,
                    "NOTIFY_LOG_DIR is whitespace only",
                ));
            } else {
                settings.logging.directory = Some(PathBuf::from(raw.trim()));
            }
        }

        if let Some(raw) = first(&["NOTIFY_STRICT_CONFIG"]) {
            match parse_bool(&raw) {
                Some(strict) => settings = settings.strict(strict),
                None => errors.push(FieldError::new(
                    Field::StrictValidation,
                    Rule::InvalidValue,
                    format!("NOTIFY_STRICT_CONFIG must be a boolean, got '{raw}'"),
                )),
            }
        }

        if let Some(raw) = first(&["SMTP_TLS"]) {
            match TlsMode::parse(&raw) {
                Some(mode) => settings.tls = mode,
                None => errors.push(FieldError::new(
                    Field::Tls,
                    Rule::InvalidValue,
                    format!("SMTP_TLS must be one of starttls, tls, none; got '{raw}'"),
                )),
            }
        }

        if let Some(raw) = first(&["SMTP_TIMEOUT_SECS"]) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => settings.timeout_secs = Some(secs),
                _ => errors.push(FieldError::new(
                    Field::Timeout,
                    Rule::InvalidValue,
                    format!("SMTP_TIMEOUT_SECS must be a positive integer, got '{raw}'"),
                )),
            }
        }

        settings.load_errors = errors;
        settings
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("smtp_server", &self.smtp_server)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("default_recipient", &self.default_recipient)
            .field("validation", &self.validation)
            .field("tls", &self.tls)
            .field("timeout_secs", &self.timeout_secs)
            .field("logging", &self.logging)
            .finish()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Strip a leading `scheme://` from a server name.
pub(crate) fn strip_scheme(server: &str) -> &str {
    match server.find("://") {
        Some(idx) => &server[idx + 3..],
        None => server,
    }
}

/// Validated, immutable sender configuration.
///
/// Built once from [`Settings`]. In lenient mode a `Config` may hold fields
/// that failed validation; `port` is `None` when the input could not be
/// coerced, and sends fail at the transport.
#[derive(Clone)]
pub struct Config {
    smtp_server: String,
    port: Option<u16>,
    login: String,
    password: String,
    default_recipient: Option<String>,
    validation: ValidationMode,
    tls: TlsMode,
    timeout: Duration,
    logging: LogSettings,
}

impl Config {
    /// Validate and normalize `settings`.
    ///
    /// Always produces a `Config`; whether it may be used is the caller's
    /// decision based on the returned [`ValidationResult`] and the mode.
    pub fn from_settings(settings: Settings) -> (Self, ValidationResult) {
        let result = validate::validate(&settings);

        let smtp_server = settings
            .smtp_server
            .as_deref()
            .map(|s| strip_scheme(s.trim()).trim().to_string())
            .unwrap_or_default();
        let port = settings.port.as_ref().and_then(|p| p.coerce().ok());
        let login = settings
            .login
            .as_deref()
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        let default_recipient = settings
            .default_recipient
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        let config = Self {
            smtp_server,
            port,
            login,
            // never trimmed: whitespace may be part of the secret
            password: settings.password.unwrap_or_default(),
            default_recipient,
            validation: settings.validation,
            tls: settings.tls,
            timeout: Duration::from_secs(settings.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            logging: settings.logging,
        };

        (config, result)
    }

    pub fn smtp_server(&self) -> &str {
        &self.smtp_server
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    pub fn default_recipient(&self) -> Option<&str> {
        self.default_recipient.as_deref()
    }

    pub fn validation(&self) -> ValidationMode {
        self.validation
    }

    pub fn tls(&self) -> TlsMode {
        self.tls
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn logging(&self) -> &LogSettings {
        &self.logging
    }

    /// `host:port` for diagnostics.
    pub fn endpoint(&self) -> String {
        match self.port {
            Some(port) => format!("{}:{}", self.smtp_server, port),
            None => format!("{}:<invalid port>", self.smtp_server),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("smtp_server", &self.smtp_server)
            .field("port", &self.port)
            .field("login", &self.login)
            .field("password", &"<redacted>")
            .field("default_recipient", &self.default_recipient)
            .field("validation", &self.validation)
            .field("tls", &self.tls)
            .field("timeout", &self.timeout)
            .field("logging", &self.logging)
            .finish()
    }
}
