//! The per-call message and the coercion applied to caller input.

use std::borrow::Cow;

use crate::config::Config;
use crate::error::NotifyError;

/// Conversion of caller input into message text.
///
/// Implemented for strings, characters, booleans, numbers and `Option`s of
/// those, so a subject or body can be anything printable. `None` becomes an
/// empty string. Conversion never fails.
///
/// ```
/// use tocsin::ToText;
///
/// assert_eq!(42i32.to_text(), "42");
/// assert_eq!(None::<&str>.to_text(), "");
/// assert_eq!("done".to_text(), "done");
/// ```
pub trait ToText {
    fn to_text(&self) -> String;
}

impl ToText for str {
    fn to_text(&self) -> String {
        self.to_string()
    }
}

impl ToText for String {
    fn to_text(&self) -> String {
        self.clone()
    }
}

impl ToText for Cow<'_, str> {
    fn to_text(&self) -> String {
        self.to_string()
    }
}

macro_rules! to_text_via_display {
    ($($t:ty),*) => {
        $(
            impl ToText for $t {
                fn to_text(&self) -> String {
                    self.to_string()
                }
            }
        )*
    };
}

to_text_via_display!(
    char, bool, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, f32, f64
);

impl<T: ToText> ToText for Option<T> {
    fn to_text(&self) -> String {
        self.as_ref().map(ToText::to_text).unwrap_or_default()
    }
}

impl<T: ToText + ?Sized> ToText for &T {
    fn to_text(&self) -> String {
        (**self).to_text()
    }
}

/// An outgoing message. Lives for one send call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub is_html: bool,
}

impl Message {
    /// Assemble a message from the sender's login and a resolved recipient.
    pub fn new(
        config: &Config,
        recipient: impl Into<String>,
        subject: impl ToText,
        body: impl ToText,
        is_html: bool,
    ) -> Self {
        Self {
            from: config.login().to_string(),
            to: recipient.into(),
            subject: subject.to_text(),
            body: body.to_text(),
            is_html,
        }
    }

    /// MIME subtype of the body.
    pub fn subtype(&self) -> &'static str {
        if self.is_html {
            "html"
        } else {
            "plain"
        }
    }
}

/// Pick the recipient for a send.
///
/// An explicit recipient wins and is trimmed; one that is blank after
/// trimming is rejected rather than replaced by the default. Without an
/// explicit recipient the configured default is used.
pub fn resolve_recipient(
    explicit: Option<&str>,
    config: &Config,
) -> Result<String, NotifyError> {
    match explicit {
        Some(raw) => match raw.trim() {
            "" => Err(NotifyError::InvalidRecipient(raw.to_string())),
            trimmed => Ok(trimmed.to_string()),
        },
        None => config
            .default_recipient()
            .map(str::to_string)
            .ok_or(NotifyError::MissingRecipient),
    }
}
