//! Tool result text.
//!
//! Successes render as `Operation: {title}` followed by pretty JSON. Failures
//! render the error envelope as readable text. Errors the request pipeline has
//! already logged are not logged again; the rest (argument validation, team
//! store) get their single log line here, at `warn` for client errors and
//! `error` otherwise.

use serde_json::{Map, Value};
use std::error::Error as StdError;
use tracing::{error, warn};

use crate::errors::AppError;
use crate::mcp::protocol::ToolCallResult;
use crate::observability::redact_sensitive_fields;

pub fn format_api_response(data: &Value, operation: &str) -> ToolCallResult {
    let pretty = serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string());
    ToolCallResult::text(format!("Operation: {}\n\n{}", operation, pretty))
}

pub fn format_error_response(operation: &str, error: &AppError) -> ToolCallResult {
    if !error.is_logged() {
        log_error(operation, error);
    }

    ToolCallResult::error_text(format!(
        "Error in {}\n\nError Code: {}\nStatus: {}\nMessage: {}\nCorrelation ID: {}\n\nDetails:\n{}",
        operation,
        error.code(),
        error.status(),
        error.message(),
        error.correlation_id(),
        format_details(error.details(), 0)
    ))
}

fn log_error(operation: &str, error: &AppError) {
    let details = Value::Object(redact_sensitive_fields(error.details()));
    if error.is_client_error() {
        warn!(
            operation,
            error_code = error.code(),
            status = error.status(),
            correlation_id = error.correlation_id(),
            details = %details,
            "{}",
            error.message()
        );
    } else {
        error!(
            operation,
            error_code = error.code(),
            status = error.status(),
            correlation_id = error.correlation_id(),
            details = %details,
            "{}",
            error.message()
        );
    }
}

/// Failures that never went through the taxonomy, such as a panicked tool task.
pub fn format_unexpected_error<E>(
    operation: &str,
    err: &E,
    include_source_chain: bool,
) -> ToolCallResult
where
    E: StdError + ?Sized,
{
    let error_type = short_type_name::<E>();
    let chain = source_chain(err);

    error!(
        operation,
        error_type,
        error_message = %err,
        source_chain = ?chain,
        "Unexpected error"
    );

    let mut text = format!(
        "Unexpected Error in {}\n\nError Type: {}\nMessage: {}\n\nThis is an unexpected error. Please contact support with the details above.",
        operation, error_type, err
    );
    if include_source_chain && !chain.is_empty() {
        text.push_str("\n\nCaused by:");
        for cause in &chain {
            text.push_str("\n  ");
            text.push_str(cause);
        }
    }
    ToolCallResult::error_text(text)
}

/// Indented `key: value` lines; nested objects indent two spaces per level.
pub fn format_details(details: &Map<String, Value>, indent: usize) -> String {
    if details.is_empty() {
        return "  (none)".to_string();
    }

    let prefix = "  ".repeat(indent);
    let mut lines = Vec::with_capacity(details.len());
    for (key, value) in details {
        match value {
            Value::Object(nested) => {
                lines.push(format!("{}{}:", prefix, key));
                lines.push(format_details(nested, indent + 1));
            }
            Value::Array(items) => {
                let items: Vec<String> = items.iter().map(scalar_text).collect();
                lines.push(format!("{}{}: [{}]", prefix, key, items.join(", ")));
            }
            other => lines.push(format!("{}{}: {}", prefix, key, scalar_text(other))),
        }
    }
    lines.join("\n")
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn source_chain<E: StdError + ?Sized>(err: &E) -> Vec<String> {
    let mut chain = Vec::new();
    let mut current = err.source();
    while let Some(cause) = current {
        chain.push(cause.to_string());
        current = cause.source();
    }
    chain
}

fn short_type_name<E: ?Sized>() -> &'static str {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
