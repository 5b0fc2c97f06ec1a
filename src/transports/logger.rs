//! Logger transport that only logs messages.
//!
//! Useful for staging or dry runs where you want to see what would be sent
//! without opening a connection. It is the default transport when the
//! `smtp` feature is disabled.

use crate::config::Config;
use crate::error::NotifyError;
use crate::message::Message;
use crate::transport::Transport;

/// Transport that emits a tracing event per message and always succeeds.
#[derive(Debug, Clone, Default)]
pub struct LoggerTransport {
    /// If true, also log bodies at debug level.
    log_full: bool,
}

impl LoggerTransport {
    /// Brief output: recipient and subject.
    pub fn new() -> Self {
        Self { log_full: false }
    }

    /// Full output including the body.
    pub fn full() -> Self {
        Self { log_full: true }
    }

    pub fn log_full(mut self, full: bool) -> Self {
        self.log_full = full;
        self
    }
}

impl Transport for LoggerTransport {
    fn transmit(&self, config: &Config, message: &Message) -> Result<(), NotifyError> {
        tracing::info!(
            server = %config.endpoint(),
            from = %message.from,
            to = %message.to,
            subject = %message.subject,
            html = message.is_html,
            "Email logged"
        );

        if self.log_full {
            tracing::debug!(body = %message.body, "Email body");
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "logger"
    }

    fn delivers(&self) -> bool {
        false
    }
}
