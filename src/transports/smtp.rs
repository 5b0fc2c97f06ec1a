//! SMTP transport using lettre's blocking client.
//!
//! A fresh connection is opened for every message and closed afterwards;
//! nothing is pooled between sends.
//!
//! ```rust,ignore
//! use tocsin::{EmailSender, Settings};
//! use tocsin::transports::SmtpTransport;
//!
//! let sender = EmailSender::builder(settings)
//!     .transport(SmtpTransport::new())
//!     .build()?;
//! ```

use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::authentication::Credentials,
    Message as LettreMessage, SmtpTransport as LettreSmtp, Transport as _,
};

use crate::config::{Config, TlsMode};
use crate::error::{NotifyError, TransportError};
use crate::message::Message;
use crate::transport::Transport;

/// SMTP transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpTransport;

impl SmtpTransport {
    pub fn new() -> Self {
        Self
    }

    /// Build a lettre message from ours.
    fn build_message(&self, message: &Message) -> Result<LettreMessage, NotifyError> {
        // the login doubles as the sender address
        let from = message.from.parse::<Mailbox>().map_err(|e| {
            NotifyError::Build(format!(
                "login '{}' is not usable as the sender address: {e} \
                 (strict validation rejects this at construction)",
                message.from
            ))
        })?;
        let to = message.to.parse::<Mailbox>().map_err(|e| {
            NotifyError::Build(format!("invalid recipient address '{}': {e}", message.to))
        })?;

        let content_type = if message.is_html {
            ContentType::TEXT_HTML
        } else {
            ContentType::TEXT_PLAIN
        };

        LettreMessage::builder()
            .from(from)
            .to(to)
            .subject(message.subject.as_str())
            .header(content_type)
            .body(message.body.clone())
            .map_err(|e| NotifyError::Build(e.to_string()))
    }

    /// Build a single-use client for `config`.
    fn client(&self, config: &Config) -> Result<LettreSmtp, TransportError> {
        let host = config.smtp_server();
        if host.is_empty() {
            return Err(TransportError::connection("no SMTP server configured"));
        }
        let port = config
            .port()
            .ok_or_else(|| TransportError::connection("no valid SMTP port configured"))?;

        let builder = match config.tls() {
            TlsMode::StartTls => LettreSmtp::starttls_relay(host)?,
            TlsMode::Tls => LettreSmtp::relay(host)?,
            TlsMode::None => LettreSmtp::builder_dangerous(host),
        };

        let credentials = Credentials::new(
            config.login().to_string(),
            config.password().to_string(),
        );

        Ok(builder
            .port(port)
            .timeout(Some(config.timeout()))
            .credentials(credentials)
            .build())
    }
}

impl Transport for SmtpTransport {
    fn transmit(&self, config: &Config, message: &Message) -> Result<(), NotifyError> {
        let email = self.build_message(message)?;
        let client = self.client(config)?;

        let response = client.send(&email).map_err(TransportError::from)?;

        tracing::debug!(
            code = %response.code(),
            server = %config.endpoint(),
            "SMTP server accepted message"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
