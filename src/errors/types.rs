//! # Error Types
//!
//! Every failure surfaced to a tool caller is an [`AppError`]: a shared envelope
//! (message, status, details, correlation id) around a closed [`ErrorKind`].

use std::sync::Arc;

use serde_json::{json, Map, Value};
use uuid::Uuid;

/// Custom result type for pipeline and tool operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Detail key used to tag failures produced by an open circuit breaker.
pub const CIRCUIT_BREAKER_ERROR_TYPE: &str = "CircuitBreakerError";

/// Closed set of error categories.
///
/// Fields carried by a variant are mirrored into the error's details and take
/// precedence over caller-supplied details with the same key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Internal,
    Validation,
    InvalidParameter { parameter: String, reason: String },
    MissingParameter { parameter: String },
    ExpiredParameter { parameter: String, expired_at: Option<String> },
    Authentication,
    Authorization { resource: Option<String> },
    ResourceNotFound { resource_type: String, resource_id: String },
    ResourceAlreadyExists { resource_type: String, resource_id: String },
    Timeout { operation: String, timeout_seconds: u64 },
    ExternalService { service: String },
}

impl ErrorKind {
    /// Machine-readable code exposed to callers
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::Internal => "APP_ERROR",
            ErrorKind::Validation => "VALIDATION_ERROR",
            ErrorKind::InvalidParameter { .. } => "INVALID_PARAMETER",
            ErrorKind::MissingParameter { .. } => "MISSING_PARAMETER",
            ErrorKind::ExpiredParameter { .. } => "EXPIRED_PARAMETER",
            ErrorKind::Authentication => "AUTHENTICATION_ERROR",
            ErrorKind::Authorization { .. } => "AUTHORIZATION_ERROR",
            ErrorKind::ResourceNotFound { .. } => "RESOURCE_NOT_FOUND",
            ErrorKind::ResourceAlreadyExists { .. } => "RESOURCE_ALREADY_EXISTS",
            ErrorKind::Timeout { .. } => "TIMEOUT_ERROR",
            ErrorKind::ExternalService { .. } => "EXTERNAL_SERVICE_ERROR",
        }
    }

    fn default_status(&self) -> u16 {
        match self {
            ErrorKind::Internal => 500,
            ErrorKind::Validation
            | ErrorKind::InvalidParameter { .. }
            | ErrorKind::MissingParameter { .. }
            | ErrorKind::ExpiredParameter { .. } => 422,
            ErrorKind::Authentication => 401,
            ErrorKind::Authorization { .. } => 403,
            ErrorKind::ResourceNotFound { .. } => 404,
            ErrorKind::ResourceAlreadyExists { .. } => 409,
            ErrorKind::Timeout { .. } => 408,
            ErrorKind::ExternalService { .. } => 502,
        }
    }

    fn owned_details(&self) -> Vec<(&'static str, Value)> {
        match self {
            ErrorKind::Internal | ErrorKind::Validation | ErrorKind::Authentication => Vec::new(),
            ErrorKind::InvalidParameter { parameter, reason } => {
                vec![("parameter", json!(parameter)), ("reason", json!(reason))]
            }
            ErrorKind::MissingParameter { parameter } => vec![("parameter", json!(parameter))],
            ErrorKind::ExpiredParameter { parameter, expired_at } => {
                let mut owned = vec![("parameter", json!(parameter))];
                if let Some(at) = expired_at {
                    owned.push(("expired_at", json!(at)));
                }
                owned
            }
            ErrorKind::Authorization { resource } => {
                resource.iter().map(|r| ("resource", json!(r))).collect()
            }
            ErrorKind::ResourceNotFound { resource_type, resource_id }
            | ErrorKind::ResourceAlreadyExists { resource_type, resource_id } => vec![
                ("resource_type", json!(resource_type)),
                ("resource_id", json!(resource_id)),
            ],
            ErrorKind::Timeout { operation, timeout_seconds } => {
                let mut owned = vec![("operation", json!(operation))];
                if *timeout_seconds > 0 {
                    owned.push(("timeout_seconds", json!(timeout_seconds)));
                }
                owned
            }
            ErrorKind::ExternalService { service } => vec![("service", json!(service))],
        }
    }
}

/// Structured application error with a unique correlation id.
#[derive(thiserror::Error, Debug, Clone)]
#[error("[{}] {} (correlation_id: {})", .kind.code(), .message, .correlation_id)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    status: u16,
    details: Map<String, Value>,
    correlation_id: String,
    #[source]
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    logged: bool,
}

impl AppError {
    fn from_kind(kind: ErrorKind, message: String) -> Self {
        let status = kind.default_status();
        let mut error = Self {
            kind,
            message,
            status,
            details: Map::new(),
            correlation_id: Uuid::new_v4().to_string(),
            source: None,
            logged: false,
        };
        error.apply_owned_details();
        error
    }

    fn apply_owned_details(&mut self) {
        for (key, value) in self.kind.owned_details() {
            self.details.insert(key.to_string(), value);
        }
    }

    /// Generic application error (`APP_ERROR`, status 500)
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::from_kind(ErrorKind::Internal, message.into())
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::from_kind(ErrorKind::Validation, message.into())
    }

    pub fn invalid_parameter<P: Into<String>, R: Into<String>>(parameter: P, reason: R) -> Self {
        let parameter = parameter.into();
        let reason = reason.into();
        let message = format!("Invalid parameter '{}': {}", parameter, reason);
        Self::from_kind(ErrorKind::InvalidParameter { parameter, reason }, message)
    }

    pub fn missing_parameter<P: Into<String>>(parameter: P) -> Self {
        let parameter = parameter.into();
        let message = format!("Missing required parameter: '{}'", parameter);
        Self::from_kind(ErrorKind::MissingParameter { parameter }, message)
    }

    pub fn expired_parameter<P: Into<String>>(parameter: P, expired_at: Option<String>) -> Self {
        let parameter = parameter.into();
        let message = format!("Parameter '{}' has expired", parameter);
        Self::from_kind(ErrorKind::ExpiredParameter { parameter, expired_at }, message)
    }

    pub fn authentication<S: Into<String>>(message: S) -> Self {
        Self::from_kind(ErrorKind::Authentication, message.into())
    }

    pub fn authorization<S: Into<String>>(message: S, resource: Option<String>) -> Self {
        Self::from_kind(ErrorKind::Authorization { resource }, message.into())
    }

    pub fn not_found<T: Into<String>, I: Into<String>>(resource_type: T, resource_id: I) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        let message = format!("{} not found: {}", capitalize(&resource_type), resource_id);
        Self::from_kind(ErrorKind::ResourceNotFound { resource_type, resource_id }, message)
    }

    pub fn already_exists<T: Into<String>, I: Into<String>>(
        resource_type: T,
        resource_id: I,
    ) -> Self {
        let resource_type = resource_type.into();
        let resource_id = resource_id.into();
        let message = format!("{} already exists: {}", capitalize(&resource_type), resource_id);
        Self::from_kind(ErrorKind::ResourceAlreadyExists { resource_type, resource_id }, message)
    }

    /// Timeout of `operation`; a zero `timeout_seconds` is omitted from details.
    pub fn timeout<S: Into<String>>(operation: S, timeout_seconds: u64) -> Self {
        let operation = operation.into();
        let message = format!("Operation timed out: {}", operation);
        Self::from_kind(ErrorKind::Timeout { operation, timeout_seconds }, message)
    }

    /// Failure of a dependency, reported as `"{service}: {message}"` with status 502.
    pub fn external_service<S: Into<String>, M: Into<String>>(service: S, message: M) -> Self {
        let service = service.into();
        let message = format!("{}: {}", service, message.into());
        Self::from_kind(ErrorKind::ExternalService { service }, message)
    }

    /// Override the HTTP-style status at the construction site.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_detail<K: Into<String>>(mut self, key: K, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self.apply_owned_details();
        self
    }

    /// Merge caller details; keys owned by the error kind keep their values.
    pub fn with_details(mut self, details: Map<String, Value>) -> Self {
        self.details.extend(details);
        self.apply_owned_details();
        self
    }

    pub fn with_correlation_id<S: Into<String>>(mut self, correlation_id: S) -> Self {
        self.correlation_id = correlation_id.into();
        self
    }

    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        self.source = Some(Arc::new(source));
        self
    }

    /// Record that this failure has already been written to the log.
    pub fn mark_logged(mut self) -> Self {
        self.logged = true;
        self
    }

    /// Whether the failure was logged where it was classified.
    pub fn is_logged(&self) -> bool {
        self.logged
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn correlation_id(&self) -> &str {
        &self.correlation_id
    }

    /// Inner object of the error envelope
    pub fn to_value(&self) -> Value {
        json!({
            "code": self.code(),
            "message": self.message,
            "status": self.status,
            "details": Value::Object(self.details.clone()),
            "correlation_id": self.correlation_id,
        })
    }

    /// `{"error": {code, message, status, details, correlation_id}}`
    pub fn to_response(&self) -> Value {
        json!({ "error": self.to_value() })
    }

    pub fn is_client_error(&self) -> bool {
        self.status < 500
    }

    pub fn is_circuit_open(&self) -> bool {
        self.details.get("error_type").and_then(Value::as_str) == Some(CIRCUIT_BREAKER_ERROR_TYPE)
    }

    /// Whether an external retry policy may re-issue the failed call.
    ///
    /// Timeouts and upstream 5xx qualify; rate limiting, open circuits,
    /// authentication and validation failures never do. When the upstream
    /// status is recorded in `details.status` it decides, so a 4xx reported
    /// as 502 is not retried.
    pub fn is_retryable(&self) -> bool {
        match self.kind {
            ErrorKind::Timeout { .. } => true,
            ErrorKind::ExternalService { .. } => {
                let status = self
                    .details
                    .get("status")
                    .and_then(Value::as_u64)
                    .unwrap_or(u64::from(self.status));
                self.status >= 500 && status >= 500 && !self.is_circuit_open()
            }
            _ => false,
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Map::new();
        for (field, field_errors) in errors.field_errors() {
            let messages: Vec<Value> = field_errors
                .iter()
                .map(|e| {
                    let text = e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| {
                        e.code.to_string()
                    });
                    Value::String(text)
                })
                .collect();
            fields.insert(field.to_string(), Value::Array(messages));
        }

        AppError::validation("Request validation failed").with_detail("fields", Value::Object(fields))
    }
}

/// Upper-case the first character and lower-case the rest.
fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
