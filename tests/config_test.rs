//! Configuration loading and validation tests.

use std::collections::HashMap;

use tocsin::transports::LocalTransport;
use tocsin::{
    validate, EmailSender, Field, MemoryStream, NotifyError, PortValue, Rule, Settings, TlsMode,
    ValidationMode,
};

fn valid() -> Settings {
    Settings::new()
        .smtp_server("smtp.example.com")
        .port(587)
        .login("alerts@example.com")
        .password("app-password")
}

fn build(settings: Settings) -> (Result<EmailSender, NotifyError>, MemoryStream) {
    let stream = MemoryStream::new();
    let result = EmailSender::builder(settings)
        .transport(LocalTransport::new())
        .error_stream(stream.clone())
        .build();
    (result, stream)
}

// ============================================================================
// Port Rules
// ============================================================================

#[test]
fn out_of_range_ports_are_reported() {
    for port in [0i64, -1, 65536, 100_000] {
        let result = validate(&valid().port(port));
        assert!(result.has_error(Field::Port), "port {port} should be rejected");

        let (sender, _) = build(valid().port(port).strict(true));
        let err = sender.unwrap_err();
        assert!(matches!(err, NotifyError::Configuration(_)));
        assert!(err.field_errors().iter().any(|e| e.field == Field::Port));
    }
}

#[test]
fn port_string_is_coerced() {
    let (sender, _) = build(valid().port("587").strict(true));
    assert_eq!(sender.unwrap().config().port(), Some(587));
}

#[test]
fn non_numeric_port_is_reported() {
    let result = validate(&valid().port("smtp"));
    assert_eq!(result.errors()[0].rule, Rule::NotANumber);
}

// ============================================================================
// Lenient vs Strict
// ============================================================================

#[test]
fn lenient_mode_builds_with_errors() {
    let (sender, stream) = build(Settings::new());

    assert!(sender.is_ok());
    assert!(stream.contains("EmailSender initialization DIAGNOSTICS:"));
    assert!(stream.contains("SMTP server is missing or empty"));
    assert!(stream.contains("Port is missing or empty"));
    assert!(stream.contains("Login/username is missing or empty"));
    assert!(stream.contains("Password is missing or empty"));
}

#[test]
fn strict_mode_names_missing_password() {
    let settings = Settings::new()
        .smtp_server("smtp.example.com")
        .port(587)
        .login("alerts@example.com")
        .strict(true);

    let (sender, _) = build(settings);
    let err = sender.unwrap_err();
    assert_eq!(err.field_errors().len(), 1);
    assert_eq!(err.field_errors()[0].field, Field::Password);
    assert!(err.to_string().contains("password"));
}

#[test]
fn strict_mode_collects_every_error() {
    let settings = Settings::new()
        .smtp_server("  ")
        .port("nope")
        .login("not-an-email")
        .password(" ")
        .default_recipient("also-not-an-email")
        .strict(true);

    let (sender, _) = build(settings);
    let err = sender.unwrap_err();
    let fields: Vec<Field> = err.field_errors().iter().map(|e| e.field).collect();
    assert_eq!(
        fields,
        vec![
            Field::SmtpServer,
            Field::Port,
            Field::Login,
            Field::Password,
            Field::DefaultRecipient
        ]
    );
}

#[test]
fn valid_settings_print_nothing() {
    let (sender, stream) = build(valid().default_recipient("ops@example.com").strict(true));
    assert!(sender.is_ok());
    assert!(stream.lines().is_empty());
}

#[test]
fn server_scheme_is_stripped() {
    let (sender, _) = build(valid().smtp_server("smtp://smtp.example.com"));
    assert_eq!(sender.unwrap().config().smtp_server(), "smtp.example.com");
}

#[test]
fn config_is_shared_read_only_across_clones() {
    let (sender, _) = build(valid());
    let sender = sender.unwrap();
    let clone = sender.clone();
    assert!(std::ptr::eq(sender.config(), clone.config()));
}

// ============================================================================
// Environment Loading
// ============================================================================

#[test]
fn lookup_builds_full_settings() {
    let dir = tempfile::tempdir().unwrap();
    let log_dir = dir.path().to_string_lossy().into_owned();
    let env: HashMap<&str, &str> = [
        ("SMTP_SERVER", "smtp.example.com"),
        ("SMTP_PORT", "465"),
        ("EMAIL_ADDRESS", "alerts@example.com"),
        ("EMAIL_PASSWORD", "pw"),
        ("NOTIFY_TO", "ops@example.com"),
        ("SMTP_TLS", "tls"),
        ("NOTIFY_LOG_DIR", log_dir.as_str()),
    ]
    .into_iter()
    .collect();

    let settings = Settings::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    assert!(validate(&settings).is_valid());

    let (sender, _) = build(settings);
    let sender = sender.unwrap();
    let config = sender.config();
    assert_eq!(config.port(), Some(465));
    assert_eq!(config.tls(), TlsMode::Tls);
    assert_eq!(config.default_recipient(), Some("ops@example.com"));
    assert!(config.logging().writes_files());
    sender.shutdown();
}

#[test]
fn malformed_env_values_are_diagnosable() {
    let settings = Settings::from_lookup(|key| match key {
        "SMTP_HOST" => Some("smtp.example.com".into()),
        "SMTP_PORT" => Some("five-eight-seven".into()),
        "SMTP_USERNAME" => Some("alerts@example.com".into()),
        "SMTP_PASSWORD" => Some("pw".into()),
        "NOTIFY_LOG_ENABLED" => Some("perhaps".into()),
        _ => None,
    });

    let result = validate(&settings);
    assert!(result.has_error(Field::Port));
    assert!(result.has_error(Field::LoggingEnabled));
}

#[test]
fn strict_flag_from_env() {
    let settings = Settings::from_lookup(|key| {
        (key == "NOTIFY_STRICT_CONFIG").then(|| "1".to_string())
    });
    assert_eq!(settings.validation, ValidationMode::Strict);

    let (sender, _) = build(settings);
    assert!(sender.is_err());
}

// ============================================================================
// Deserialization
// ============================================================================

#[test]
fn settings_deserialize_with_string_or_number_port() {
    let from_number: Settings = serde_json::from_value(serde_json::json!({
        "smtp_server": "smtp.example.com",
        "port": 587,
        "login": "alerts@example.com",
        "password": "pw",
    }))
    .unwrap();
    assert_eq!(from_number.port, Some(PortValue::Number(587)));
    assert!(validate(&from_number).is_valid());

    let from_text: Settings = serde_json::from_value(serde_json::json!({
        "smtp_server": "smtp.example.com",
        "port": "587",
        "login": "alerts@example.com",
        "password": "pw",
        "validation": "strict",
        "tls": "none",
        "logging": { "enabled": false },
    }))
    .unwrap();
    assert_eq!(from_text.port, Some(PortValue::Text("587".into())));
    assert_eq!(from_text.validation, ValidationMode::Strict);
    assert_eq!(from_text.tls, TlsMode::None);
    assert!(!from_text.logging.enabled);
    assert!(validate(&from_text).is_valid());
}
