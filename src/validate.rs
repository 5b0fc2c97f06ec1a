//! Configuration validation.
//!
//! Every rule runs on every call, so a caller sees all problems at once
//! rather than fixing them one at a time.

use email_address::EmailAddress;

use crate::config::{strip_scheme, Settings, ValidationMode};
use crate::error::{Field, FieldError, Rule, ValidationErrors};

/// Outcome of validating a [`Settings`] value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(Vec<FieldError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn errors(&self) -> &[FieldError] {
        match self {
            Self::Valid => &[],
            Self::Invalid(errors) => errors,
        }
    }

    /// Whether `field` has at least one error.
    pub fn has_error(&self, field: Field) -> bool {
        self.errors().iter().any(|e| e.field == field)
    }

    /// Convert into a `Result`, aggregating all errors.
    pub fn into_result(self) -> Result<(), ValidationErrors> {
        match self {
            Self::Valid => Ok(()),
            Self::Invalid(errors) => Err(ValidationErrors::new(errors)),
        }
    }
}

/// Validate `settings` against every field rule.
///
/// Strict mode additionally requires `login` and `default_recipient` to look
/// like email addresses. Problems recorded while loading from the
/// environment are included.
pub fn validate(settings: &Settings) -> ValidationResult {
    let strict = settings.validation == ValidationMode::Strict;
    let mut errors = Vec::new();

    check_server(settings.smtp_server.as_deref(), &mut errors);

    match &settings.port {
        None => errors.push(FieldError::new(
            Field::Port,
            Rule::Missing,
            "Port is missing or empty",
        )),
        Some(port) => {
            if let Err(err) = port.coerce() {
                errors.push(err);
            }
        }
    }

    check_required(Field::Login, "Login/username", settings.login.as_deref(), &mut errors);
    if strict {
        if let Some(login) = settings.login.as_deref().map(str::trim) {
            if !login.is_empty() && !looks_like_email(login) {
                errors.push(FieldError::new(
                    Field::Login,
                    Rule::InvalidEmail,
                    format!("Login '{login}' doesn't look like an email address"),
                ));
            }
        }
    }

    check_required(Field::Password, "Password", settings.password.as_deref(), &mut errors);

    if let Some(recipient) = settings.default_recipient.as_deref() {
        let trimmed = recipient.trim();
        if trimmed.is_empty() {
            errors.push(FieldError::new(
                Field::DefaultRecipient,
                Rule::WhitespaceOnly,
                "Default recipient is empty or whitespace only",
            ));
        } else if strict && !looks_like_email(trimmed) {
            errors.push(FieldError::new(
                Field::DefaultRecipient,
                Rule::InvalidEmail,
                format!("Default recipient '{trimmed}' doesn't look like an email address"),
            ));
        }
    }

    errors.extend(settings.load_errors.iter().cloned());

    if errors.is_empty() {
        ValidationResult::Valid
    } else {
        ValidationResult::Invalid(errors)
    }
}

fn check_server(server: Option<&str>, errors: &mut Vec<FieldError>) {
    match server {
        None | Some("") => errors.push(FieldError::new(
            Field::SmtpServer,
            Rule::Missing,
            "SMTP server is missing or empty",
        )),
        Some(server) if server.trim().is_empty() => errors.push(FieldError::new(
            Field::SmtpServer,
            Rule::WhitespaceOnly,
            "SMTP server is whitespace only",
        )),
        Some(server) => {
            if strip_scheme(server.trim()).trim().is_empty() {
                errors.push(FieldError::new(
                    Field::SmtpServer,
                    Rule::Missing,
                    format!("SMTP server '{server}' has no host after the scheme"),
                ));
            }
        }
    }
}

fn check_required(field: Field, label: &str, value: Option<&str>, errors: &mut Vec<FieldError>) {
    match value {
        None | Some("") => errors.push(FieldError::new(
            field,
            Rule::Missing,
            format!("{label} is missing or empty"),
        )),
        Some(value) if value.trim().is_empty() => errors.push(FieldError::new(
            field,
            Rule::WhitespaceOnly,
            format!("{label} is whitespace only"),
        )),
        Some(_) => {}
    }
}

/// Permissive address shape: `local@domain` with a dot in the domain.
pub fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.rsplit_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && EmailAddress::is_valid(value)
}
