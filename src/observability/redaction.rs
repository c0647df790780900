//! Sensitive-field redaction for anything that reaches a log sink.
//!
//! Keys are matched case-insensitively by substring, so `X-Api-Key`,
//! `client_secret` and `Authorization` are all caught.

use serde_json::{Map, Value};

/// Replacement written in place of a sensitive value.
pub const REDACTED: &str = "***REDACTED***";

/// Substrings that mark a key as sensitive.
pub const SENSITIVE_FIELD_PATTERNS: [&str; 9] =
    ["token", "password", "secret", "key", "credential", "auth", "bearer", "api_key", "apikey"];

pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SENSITIVE_FIELD_PATTERNS.iter().any(|pattern| key.contains(pattern))
}

/// Copy of `fields` with every sensitive value replaced by [`REDACTED`],
/// at any depth of nested objects and arrays.
pub fn redact_sensitive_fields(fields: &Map<String, Value>) -> Map<String, Value> {
    fields
        .iter()
        .map(|(key, value)| {
            let value = if is_sensitive_key(key) {
                Value::String(REDACTED.to_string())
            } else {
                redact_value(value)
            };
            (key.clone(), value)
        })
        .collect()
}

pub fn redact_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(redact_sensitive_fields(map)),
        Value::Array(items) => Value::Array(items.iter().map(redact_value).collect()),
        other => other.clone(),
    }
}

/// Redact `(name, value)` pairs such as query parameters or headers.
pub fn redact_pairs(pairs: &[(String, String)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(name, value)| {
            let value = if is_sensitive_key(name) { REDACTED.to_string() } else { value.clone() };
            (name.clone(), value)
        })
        .collect()
}
