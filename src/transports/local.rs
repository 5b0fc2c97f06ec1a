//! Local transport for development and testing.
//!
//! Captures messages in memory instead of sending them, so tests can assert
//! on exactly what would have gone out.
//!
//! ```
//! use tocsin::{EmailSender, Settings};
//! use tocsin::transports::LocalTransport;
//!
//! let transport = LocalTransport::new();
//! let sender = EmailSender::builder(
//!     Settings::new()
//!         .smtp_server("smtp.example.com")
//!         .port(587)
//!         .login("alerts@example.com")
//!         .password("pw"),
//! )
//! .transport(transport.clone())
//! .build()
//! .unwrap();
//!
//! assert!(sender.send_email("Backup done", "ok", Some("ops@example.com"), false));
//! assert!(transport.sent_to("ops@example.com"));
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use crate::config::Config;
use crate::error::{NotifyError, TransportError, TransportErrorKind};
use crate::message::Message;
use crate::transport::Transport;

/// A captured message with the endpoint it was "sent" through.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    /// `host:port` the message was addressed to.
    pub endpoint: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    sent: RwLock<Vec<SentMessage>>,
    attempts: RwLock<usize>,
    fail_with: RwLock<Option<TransportError>>,
}

/// In-memory transport.
///
/// Rejects empty credentials with an authentication error, like a real
/// server would. Clones share the same store.
#[derive(Debug, Clone, Default)]
pub struct LocalTransport {
    inner: Arc<Inner>,
}

impl LocalTransport {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Failure Simulation
    // =========================================================================

    /// Make every following attempt fail with `kind`.
    pub fn set_failure(&self, kind: TransportErrorKind, message: impl Into<String>) {
        *self.inner.fail_with.write() = Some(TransportError::new(kind, message));
    }

    pub fn clear_failure(&self) {
        *self.inner.fail_with.write() = None;
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Every captured message, oldest first.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.inner.sent.read().clone()
    }

    pub fn last_message(&self) -> Option<SentMessage> {
        self.inner.sent.read().last().cloned()
    }

    pub fn message_count(&self) -> usize {
        self.inner.sent.read().len()
    }

    /// Number of transmit calls, successful or not.
    pub fn attempts(&self) -> usize {
        *self.inner.attempts.read()
    }

    pub fn sent_to(&self, recipient: &str) -> bool {
        self.inner
            .sent
            .read()
            .iter()
            .any(|s| s.message.to.eq_ignore_ascii_case(recipient))
    }

    pub fn sent_with_subject(&self, subject: &str) -> bool {
        self.inner
            .sent
            .read()
            .iter()
            .any(|s| s.message.subject == subject)
    }

    /// Remove all captured messages and reset the attempt counter.
    pub fn clear(&self) {
        self.inner.sent.write().clear();
        *self.inner.attempts.write() = 0;
    }
}

impl Transport for LocalTransport {
    fn transmit(&self, config: &Config, message: &Message) -> Result<(), NotifyError> {
        *self.inner.attempts.write() += 1;

        if let Some(err) = self.inner.fail_with.read().clone() {
            return Err(err.into());
        }

        if config.smtp_server().is_empty() || config.port().is_none() {
            return Err(TransportError::connection(format!(
                "cannot connect to {}",
                config.endpoint()
            ))
            .into());
        }

        if config.login().is_empty() || config.password().trim().is_empty() {
            return Err(TransportError::authentication(
                "535 authentication failed: credentials missing",
            )
            .into());
        }

        self.inner.sent.write().push(SentMessage {
            message: message.clone(),
            endpoint: config.endpoint(),
            sent_at: Utc::now(),
        });
        Ok(())
    }

    fn name(&self) -> &'static str {
        "local"
    }
}
