//! # Observability
//!
//! Structured logging setup and the redaction applied to anything logged.

pub mod logging;
pub mod redaction;

pub use logging::{init_logging, log_settings_summary};
pub use redaction::{redact_pairs, redact_sensitive_fields, redact_value, REDACTED};
