// ============================
// crates/backend-lib/src/logging.rs
// ============================
//! Subscriber setup. Formatted lines pass through the PII redactor.
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::redact::{RedactingMakeWriter, Redactor, REDACTION};

/// Redactor configured from `settings.pii_fields`
pub fn log_redactor(settings: &Settings) -> Redactor {
    Redactor::for_log_lines(&settings.pii_fields, REDACTION)
}

/// Install the global subscriber. `RUST_LOG` overrides the configured level.
pub fn init_logging(
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        // escape codes around field names would defeat redaction
        .with_ansi(false)
        .with_writer(RedactingMakeWriter::new(std::io::stderr, log_redactor(settings)))
        .try_init()
}
