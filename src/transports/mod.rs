//! Transport implementations.
//!
//! | Transport | Feature Flag | Description |
//! |-----------|-------------|-------------|
//! | [`SmtpTransport`] | `smtp` (default) | SMTP via lettre, one connection per send |
//! | [`LocalTransport`] | (none) | In-memory capture for tests and dry runs |
//! | [`LoggerTransport`] | (none) | Emits a tracing event instead of sending |

#[cfg(feature = "smtp")]
mod smtp;
#[cfg(feature = "smtp")]
pub use smtp::SmtpTransport;

mod local;
pub use local::{LocalTransport, SentMessage};

mod logger;
pub use logger::LoggerTransport;
