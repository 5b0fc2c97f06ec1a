//! Exception report tests.

use std::fmt;
use std::panic;

use tocsin::transports::LocalTransport;
use tocsin::{EmailSender, ExceptionReport, MemoryStream, Settings, EXCEPTION_SUBJECT};

fn build() -> (EmailSender, LocalTransport, MemoryStream) {
    let transport = LocalTransport::new();
    let stream = MemoryStream::new();
    let sender = EmailSender::builder(
        Settings::new()
            .smtp_server("smtp.example.com")
            .port(587)
            .login("alerts@example.com")
            .password("app-password")
            .default_recipient("oncall@example.com"),
    )
    .transport(transport.clone())
    .error_stream(stream.clone())
    .build()
    .unwrap();
    (sender, transport, stream)
}

#[derive(Debug)]
struct JobFailed {
    step: &'static str,
    cause: std::num::ParseIntError,
}

impl fmt::Display for JobFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job failed at step '{}'", self.step)
    }
}

impl std::error::Error for JobFailed {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.cause)
    }
}

// ============================================================================
// Captured Errors
// ============================================================================

#[test]
fn panic_report_is_sent_as_html() {
    let (sender, transport, _) = build();

    let divisor = std::hint::black_box(0);
    let payload = panic::catch_unwind(|| 10 / divisor).unwrap_err();
    let report = ExceptionReport::from_panic(payload.as_ref());

    assert!(sender.send_exception(Some(&report), None));

    let sent = transport.last_message().unwrap().message;
    assert!(sent.is_html);
    assert_eq!(sent.subject, EXCEPTION_SUBJECT);
    assert_eq!(sent.to, "oncall@example.com");
    assert!(sent.body.contains("<h1>Exception Report</h1>"));
    assert!(sent.body.contains("<strong>Type:</strong> Panic"));
    assert!(sent.body.contains("divide by zero"));
    assert!(sent.body.contains("<pre>"));
}

#[test]
fn error_chain_reaches_traceback() {
    let (sender, transport, _) = build();
    let err = JobFailed {
        step: "parse",
        cause: "x".parse::<u32>().unwrap_err(),
    };
    let report = ExceptionReport::capture(&err);

    assert_eq!(report.type_name(), "JobFailed");
    assert_eq!(report.message(), "job failed at step 'parse'");
    assert!(report.trace().contains("Caused by: invalid digit found in string"));

    assert!(sender.send_exception(Some(&report), Some("dev@example.com")));
    let sent = transport.last_message().unwrap().message;
    assert_eq!(sent.to, "dev@example.com");
    assert!(sent.body.contains("job failed at step 'parse'"));
    assert!(sent.body.contains("Caused by: invalid digit found in string"));
}

#[test]
fn report_can_be_sent_after_the_error_is_gone() {
    let (sender, transport, _) = build();

    let report = {
        let err = "nope".parse::<i64>().unwrap_err();
        ExceptionReport::from(&err)
    };

    assert!(sender.send_exception(Some(&report), None));
    assert!(transport
        .last_message()
        .unwrap()
        .message
        .body
        .contains("ParseIntError"));
}

#[test]
fn boxed_error_is_captured() {
    let (sender, transport, _) = build();

    let run = || -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(JobFailed {
            step: "load",
            cause: "".parse::<u8>().unwrap_err(),
        }
        .into())
    };
    let err = run().unwrap_err();
    let report = ExceptionReport::capture(&*err);

    assert_eq!(report.type_name(), "dyn Error");
    assert!(sender.send_exception(Some(&report), None));

    let body = transport.last_message().unwrap().message.body;
    assert!(body.contains("<strong>Message:</strong> job failed at step 'load'"));
    assert!(body.contains("Caused by: cannot parse integer from empty string"));
}

// ============================================================================
// Edge Cases
// ============================================================================

#[test]
fn missing_report_sends_unknown_exception() {
    let (sender, transport, _) = build();

    assert!(sender.send_exception(None, None));
    let body = transport.last_message().unwrap().message.body;
    assert!(body.contains("UnknownException"));
    assert!(body.contains("(no exception object)"));
}

#[test]
fn report_markup_is_escaped() {
    let (sender, transport, _) = build();
    let report = ExceptionReport::new("<Err>", "a < b && c > d");

    assert!(sender.send_exception(Some(&report), None));
    let body = transport.last_message().unwrap().message.body;
    assert!(body.contains("&lt;Err&gt;"));
    assert!(body.contains("a &lt; b &amp;&amp; c &gt; d"));
    assert!(body.contains("(no traceback captured)"));
}

#[test]
fn failed_exception_send_returns_false() {
    let (sender, transport, stream) = build();
    transport.set_failure(tocsin::TransportErrorKind::Connection, "connection refused");

    assert!(!sender.send_exception(None, None));
    assert!(stream.contains("SMTP SEND FAILURE to oncall@example.com"));
}
