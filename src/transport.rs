//! The transport capability.
//!
//! A transport takes a validated [`Config`] and one [`Message`] and makes
//! exactly one delivery attempt: connect, negotiate TLS, authenticate,
//! transmit. It blocks until the attempt finishes or its own timeout
//! elapses. Retrying is never the transport's job.
//!
//! The trait is synchronous on purpose: a notification is one call, one
//! blocking attempt, one boolean. Implement it to plug in another delivery
//! mechanism:
//!
//! ```
//! use tocsin::{Config, Message, NotifyError, Transport};
//!
//! struct Discard;
//!
//! impl Transport for Discard {
//!     fn transmit(&self, _config: &Config, _message: &Message) -> Result<(), NotifyError> {
//!         Ok(())
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "discard"
//!     }
//! }
//! ```

use std::sync::Arc;

use crate::config::Config;
use crate::error::NotifyError;
use crate::message::Message;

/// Something that can deliver one message.
///
/// Connection-level failures should be reported as
/// [`NotifyError::Transport`]; a message the transport cannot encode as
/// [`NotifyError::Build`].
pub trait Transport: Send + Sync {
    /// Make one delivery attempt.
    fn transmit(&self, config: &Config, message: &Message) -> Result<(), NotifyError>;

    /// Short name for diagnostics.
    fn name(&self) -> &'static str {
        "unknown"
    }

    /// Whether a successful `transmit` means the message left the process.
    ///
    /// Dry-run transports return `false` so that success is not reported as
    /// a sent email.
    fn delivers(&self) -> bool {
        true
    }
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn transmit(&self, config: &Config, message: &Message) -> Result<(), NotifyError> {
        (**self).transmit(config, message)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn delivers(&self) -> bool {
        (**self).delivers()
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn transmit(&self, config: &Config, message: &Message) -> Result<(), NotifyError> {
        (**self).transmit(config, message)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn delivers(&self) -> bool {
        (**self).delivers()
    }
}
