//! Resilient request pipeline against the Apigee management API.
//!
//! Every call passes, in order: the session check, the rate limiter, the
//! credential provider, then the circuit breaker wrapping a timed transport
//! call. Responses are classified into [`AppError`] kinds; nothing is retried
//! here.

use reqwest::Method;
use serde_json::{json, Value};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::auth::CredentialProvider;
use crate::client::request::{build_headers, build_url, GatewayRequest};
use crate::client::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
use crate::config::Settings;
use crate::errors::{AppError, Result, CIRCUIT_BREAKER_ERROR_TYPE};
use crate::observability::redaction::{redact_pairs, redact_sensitive_fields};
use crate::resilience::{CircuitBreaker, CircuitError, RateLimiter};

/// Response bodies are cut to this many characters in logs.
pub const MAX_RESPONSE_LOG_LENGTH: usize = 500;
/// Response bodies are cut to this many characters in error details.
pub const MAX_RESPONSE_DETAIL_LENGTH: usize = 200;

const API_SERVICE: &str = "apigee_api";
const CLIENT_SERVICE: &str = "apigee_client";

/// Gateway client configuration
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub organization: String,
    pub request_timeout: Duration,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
    pub breaker_failure_threshold: u32,
    pub breaker_recovery_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_BASE_URL.to_string(),
            organization: String::new(),
            request_timeout: Duration::from_secs(30),
            rate_limit_requests: 100,
            rate_limit_window: Duration::from_secs(60),
            breaker_failure_threshold: 5,
            breaker_recovery_timeout: Duration::from_secs(60),
        }
    }
}

impl GatewayConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.apigee_api_base_url.clone(),
            organization: settings.apigee_organization.trim().to_string(),
            request_timeout: settings.request_timeout_duration(),
            rate_limit_requests: settings.rate_limit_requests,
            rate_limit_window: settings.rate_limit_window_duration(),
            breaker_failure_threshold: settings.circuit_breaker_failure_threshold,
            breaker_recovery_timeout: settings.circuit_breaker_timeout_duration(),
        }
    }
}

/// Client for the gateway. One per process; safe to share behind an `Arc`.
pub struct GatewayClient {
    config: GatewayConfig,
    credentials: CredentialProvider,
    rate_limiter: RateLimiter,
    breaker: CircuitBreaker,
    session: RwLock<Option<Arc<dyn Transport>>>,
}

impl GatewayClient {
    /// Create a client with a closed session; call [`connect`](Self::connect) before use.
    pub fn new(config: GatewayConfig, credentials: CredentialProvider) -> Self {
        let rate_limiter = RateLimiter::new(config.rate_limit_requests, config.rate_limit_window);
        let breaker = CircuitBreaker::new(
            API_SERVICE,
            config.breaker_failure_threshold,
            config.breaker_recovery_timeout,
        );
        Self { config, credentials, rate_limiter, breaker, session: RwLock::new(None) }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(GatewayConfig::from_settings(settings), CredentialProvider::from_settings(settings))
    }

    /// Open the HTTP session backed by a pooled reqwest client.
    pub fn connect(&self) -> Result<()> {
        let transport = ReqwestTransport::new(self.config.request_timeout).map_err(|e| {
            AppError::external_service(CLIENT_SERVICE, format!("Failed to create HTTP client: {}", e))
        })?;
        self.attach(Arc::new(transport));
        Ok(())
    }

    /// Open the session on a caller-supplied transport.
    pub fn attach(&self, transport: Arc<dyn Transport>) {
        *self.session.write().unwrap_or_else(PoisonError::into_inner) = Some(transport);
        debug!(base_url = %self.config.base_url, "Gateway session opened");
    }

    /// Release the session; later requests fail until reconnected.
    pub fn close(&self) {
        if self.session.write().unwrap_or_else(PoisonError::into_inner).take().is_some() {
            debug!("Gateway session closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session.read().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn organization(&self) -> &str {
        &self.config.organization
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<Value> {
        let mut request = GatewayRequest::get(path);
        for (key, value) in query {
            request = request.with_query(*key, *value);
        }
        self.request(request).await
    }

    pub async fn post(&self, path: &str, body: Value) -> Result<Value> {
        self.request(GatewayRequest::post(path, body)).await
    }

    pub async fn put(&self, path: &str, body: Value) -> Result<Value> {
        self.request(GatewayRequest::new(Method::PUT, path).with_body(body)).await
    }

    pub async fn patch(&self, path: &str, body: Value) -> Result<Value> {
        self.request(GatewayRequest::new(Method::PATCH, path).with_body(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<Value> {
        self.request(GatewayRequest::delete(path)).await
    }

    /// Issue one request through the full pipeline.
    pub async fn request(&self, request: GatewayRequest) -> Result<Value> {
        let transport = self.session()?;

        if !self.rate_limiter.acquire() {
            return Err(report(
                AppError::external_service(API_SERVICE, "Rate limit exceeded. Please try again later.")
                    .with_status(429),
                None,
            ));
        }

        let token = self.credentials.get_token().await.map_err(|e| report(e, None))?;
        let url = build_url(&self.config.base_url, &self.config.organization, &request.path);
        let headers = build_headers(&token, &request.headers).map_err(|e| report(e, None))?;

        info!(
            method = %request.method,
            url = %url,
            query = ?redact_pairs(&request.query),
            "Gateway request"
        );

        let transport_request = TransportRequest {
            method: request.method.clone(),
            url: url.clone(),
            headers,
            query: request.query.clone(),
            body: request.body.clone(),
        };
        let timeout = self.config.request_timeout;

        let outcome = self
            .breaker
            .call(|| async move {
                match tokio::time::timeout(timeout, transport.send(transport_request)).await {
                    Ok(result) => result,
                    Err(_) => Err(TransportError::Timeout),
                }
            })
            .await;

        match outcome {
            Ok(response) => self.classify(response, &request, &url).await,
            Err(CircuitError::Open { name, retry_after }) => Err(report(
                AppError::external_service(
                    API_SERVICE,
                    "Service temporarily unavailable (circuit breaker open)",
                )
                .with_status(503)
                .with_detail("error_type", CIRCUIT_BREAKER_ERROR_TYPE)
                .with_detail("circuit", name)
                .with_detail("retry_after_seconds", retry_after.as_secs()),
                None,
            )),
            Err(CircuitError::Inner(TransportError::Timeout)) => Err(report(
                AppError::timeout(request.operation(), timeout.as_secs()),
                None,
            )),
            Err(CircuitError::Inner(e)) => {
                let error_type = e.error_type();
                Err(report(
                    AppError::external_service(API_SERVICE, format!("Request failed: {}", e))
                        .with_detail("error_type", error_type)
                        .with_source(e),
                    None,
                ))
            }
        }
    }

    fn session(&self) -> Result<Arc<dyn Transport>> {
        self.session.read().unwrap_or_else(PoisonError::into_inner).clone().ok_or_else(|| {
            report(
                AppError::external_service(
                    CLIENT_SERVICE,
                    "Client session not initialized. Use connect() before issuing requests.",
                ),
                None,
            )
        })
    }

    async fn classify(
        &self,
        response: TransportResponse,
        request: &GatewayRequest,
        url: &str,
    ) -> Result<Value> {
        let TransportResponse { status, body } = response;

        if status < 400 {
            if body.trim().is_empty() {
                return Ok(json!({}));
            }
            return serde_json::from_str(&body).map_err(|e| {
                report(
                    AppError::external_service(API_SERVICE, "Invalid JSON in response")
                        .with_status(502)
                        .with_detail("status", status)
                        .with_detail("url", url)
                        .with_detail("error", e.to_string()),
                    Some(&body),
                )
            });
        }

        let error = match status {
            401 => {
                self.credentials.invalidate().await;
                AppError::authentication("API authentication failed")
                    .with_detail("status", status)
                    .with_detail("url", url)
            }
            404 => AppError::not_found("api_resource", request.path.as_str())
                .with_detail("status", status)
                .with_detail("response", truncate(&body, MAX_RESPONSE_DETAIL_LENGTH)),
            _ => AppError::external_service(
                API_SERVICE,
                format!("API request failed with status {}", status),
            )
            .with_status(if status >= 500 { status } else { 502 })
            .with_detail("status", status)
            .with_detail("url", url)
            .with_detail("response", truncate(&body, MAX_RESPONSE_DETAIL_LENGTH)),
        };

        Err(report(error, Some(&body)))
    }
}

/// Log a classified failure once and hand it back marked as logged.
///
/// Client-side rejections (status < 500, such as rate limiting or an expired
/// credential) log at `warn`; everything else at `error`.
fn report(error: AppError, response: Option<&str>) -> AppError {
    let details = Value::Object(redact_sensitive_fields(error.details()));
    let response = response.map(|body| truncate(body, MAX_RESPONSE_LOG_LENGTH));

    if error.is_client_error() {
        warn!(
            error_code = error.code(),
            status = error.status(),
            correlation_id = error.correlation_id(),
            details = %details,
            response = ?response,
            "{}",
            error.message()
        );
    } else {
        error!(
            error_code = error.code(),
            status = error.status(),
            correlation_id = error.correlation_id(),
            details = %details,
            response = ?response,
            "{}",
            error.message()
        );
    }
    error.mark_logged()
}

/// First `max_chars` characters of `text`.
pub fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SecretString, StaticTokenSource};
    use crate::errors::ErrorKind;
    use crate::resilience::CircuitState;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing_test::traced_test;

    /// Replays canned outcomes and records what was sent.
    #[derive(Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<std::result::Result<TransportResponse, TransportError>>>,
        sent: Mutex<Vec<TransportRequest>>,
    }

    impl ScriptedTransport {
        fn with(outcomes: Vec<std::result::Result<TransportResponse, TransportError>>) -> Arc<Self> {
            Arc::new(Self { outcomes: Mutex::new(outcomes.into()), sent: Mutex::default() })
        }

        fn respond(status: u16, body: &str) -> std::result::Result<TransportResponse, TransportError> {
            Ok(TransportResponse { status, body: body.to_string() })
        }

        fn sent(&self) -> Vec<TransportRequest> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(
            &self,
            request: TransportRequest,
        ) -> std::result::Result<TransportResponse, TransportError> {
            self.sent.lock().expect("lock").push(request);
            self.outcomes
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| Self::respond(200, "{}"))
        }
    }

    struct HangingTransport;

    #[async_trait]
    impl Transport for HangingTransport {
        async fn send(
            &self,
            _request: TransportRequest,
        ) -> std::result::Result<TransportResponse, TransportError> {
            std::future::pending().await
        }
    }

    fn config() -> GatewayConfig {
        GatewayConfig {
            base_url: "https://apigee.test/v1".to_string(),
            organization: "acme".to_string(),
            breaker_failure_threshold: 3,
            ..Default::default()
        }
    }

    fn client_with(config: GatewayConfig, transport: Arc<dyn Transport>) -> GatewayClient {
        let credentials = CredentialProvider::new(Some(Arc::new(StaticTokenSource::new(
            SecretString::new("test-token"),
        ))));
        let client = GatewayClient::new(config, credentials);
        client.attach(transport);
        client
    }

    #[tokio::test]
    async fn test_success_parses_json_and_scopes_url() {
        let transport = ScriptedTransport::with(vec![ScriptedTransport::respond(
            200,
            r#"{"environments":["test","prod"]}"#,
        )]);
        let client = client_with(config(), transport.clone());

        let value = client.get("environments", &[("expand", "true")]).await.expect("success");
        assert_eq!(value["environments"][1], "prod");

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].url, "https://apigee.test/v1/organizations/acme/environments");
        assert_eq!(sent[0].query, vec![("expand".to_string(), "true".to_string())]);
        assert_eq!(
            sent[0].headers.get("authorization").and_then(|v| v.to_str().ok()),
            Some("Bearer test-token")
        );
    }

    #[tokio::test]
    async fn test_empty_success_body_is_empty_object() {
        let transport = ScriptedTransport::with(vec![ScriptedTransport::respond(204, "  ")]);
        let client = client_with(config(), transport);
        assert_eq!(client.delete("apis/p").await.expect("success"), json!({}));
    }

    #[tokio::test]
    async fn test_invalid_json_success_body() {
        let transport = ScriptedTransport::with(vec![ScriptedTransport::respond(200, "<html>")]);
        let client = client_with(config(), transport);
        let error = client.get("apis", &[]).await.expect_err("not json");
        assert_eq!(error.code(), "EXTERNAL_SERVICE_ERROR");
        assert_eq!(error.details()["status"], 200);
    }

    #[tokio::test]
    async fn test_status_classification() {
        let long_body = "x".repeat(1000);
        let transport = ScriptedTransport::with(vec![
            ScriptedTransport::respond(401, "denied"),
            ScriptedTransport::respond(404, &long_body),
            ScriptedTransport::respond(500, "boom"),
            ScriptedTransport::respond(418, "teapot"),
        ]);
        let client = client_with(config(), transport);

        let unauthorized = client.get("apis", &[]).await.expect_err("401");
        assert_eq!(unauthorized.kind(), &ErrorKind::Authentication);
        assert_eq!(unauthorized.message(), "API authentication failed");
        assert_eq!(unauthorized.details()["status"], 401);
        assert_eq!(
            unauthorized.details()["url"],
            "https://apigee.test/v1/organizations/acme/apis"
        );

        let missing = client.get("/apis/missing", &[]).await.expect_err("404");
        assert_eq!(missing.code(), "RESOURCE_NOT_FOUND");
        assert_eq!(missing.details()["resource_type"], "api_resource");
        assert_eq!(missing.details()["resource_id"], "/apis/missing");
        assert_eq!(missing.details()["response"].as_str().map(str::len), Some(200));

        let server = client.get("apis", &[]).await.expect_err("500");
        assert_eq!(server.status(), 500);
        assert_eq!(server.message(), "apigee_api: API request failed with status 500");

        let teapot = client.get("apis", &[]).await.expect_err("418");
        assert_eq!(teapot.status(), 502);
        assert_eq!(teapot.details()["status"], 418);
        assert_eq!(teapot.details()["response"], "teapot");
    }

    #[tokio::test]
    async fn test_http_errors_do_not_trip_breaker() {
        let transport = ScriptedTransport::with(
            (0..5).map(|_| ScriptedTransport::respond(500, "boom")).collect(),
        );
        let client = client_with(config(), transport);

        for _ in 0..5 {
            assert_eq!(client.get("apis", &[]).await.expect_err("500").status(), 500);
        }
        assert_eq!(client.breaker().state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_transport_failures_open_breaker() {
        let transport = ScriptedTransport::with(
            (0..3).map(|_| Err(TransportError::Connect("refused".into()))).collect(),
        );
        let client = client_with(config(), transport.clone());

        for _ in 0..3 {
            let error = client.get("apis", &[]).await.expect_err("connect error");
            assert_eq!(error.details()["error_type"], "ConnectError");
            assert!(error.message().contains("Request failed"));
        }

        let open = client.get("apis", &[]).await.expect_err("open circuit");
        assert_eq!(open.status(), 503);
        assert!(open.is_circuit_open());
        assert_eq!(open.details()["circuit"], "apigee_api");
        assert!(!open.is_retryable());
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_classified() {
        let config = GatewayConfig { request_timeout: Duration::from_secs(30), ..config() };
        let client = client_with(config, Arc::new(HangingTransport));

        let error = client.get("apis", &[]).await.expect_err("timeout");
        assert_eq!(error.code(), "TIMEOUT_ERROR");
        assert_eq!(error.details()["operation"], "GET apis");
        assert_eq!(error.details()["timeout_seconds"], 30);
        assert_eq!(client.breaker().failure_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_session_fails_before_other_guards() {
        let client = GatewayClient::new(config(), CredentialProvider::new(None));
        let error = client.get("apis", &[]).await.expect_err("no session");
        assert_eq!(error.details()["service"], "apigee_client");
        assert!(error.message().contains("Client session not initialized"));
        assert_eq!(client.rate_limiter().available_tokens(), 100.0);
    }

    #[tokio::test]
    async fn test_close_releases_session() {
        let client = client_with(config(), ScriptedTransport::with(Vec::new()));
        assert!(client.is_connected());
        client.close();
        assert!(!client.is_connected());
        assert!(client.get("apis", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_rate_limit_precedes_credentials() {
        let config = GatewayConfig { rate_limit_requests: 1, ..config() };
        let client = GatewayClient::new(config, CredentialProvider::new(None));
        client.attach(ScriptedTransport::with(Vec::new()));

        let first = client.get("apis", &[]).await.expect_err("no credentials");
        assert_eq!(first.kind(), &ErrorKind::Authentication);

        let second = client.get("apis", &[]).await.expect_err("rate limited");
        assert_eq!(second.status(), 429);
        assert_eq!(second.message(), "apigee_api: Rate limit exceeded. Please try again later.");
    }

    #[tokio::test]
    async fn test_caller_headers_and_body_are_forwarded() {
        let transport = ScriptedTransport::with(Vec::new());
        let client = client_with(config(), transport.clone());

        let request = GatewayRequest::post("organizations/other/environments", json!({"name": "qa"}))
            .with_header("X-Request-Source", "mcp");
        client.request(request).await.expect("success");

        let sent = transport.sent();
        assert_eq!(sent[0].url, "https://apigee.test/v1/organizations/other/environments");
        assert_eq!(sent[0].body, Some(json!({"name": "qa"})));
        assert_eq!(
            sent[0].headers.get("x-request-source").and_then(|v| v.to_str().ok()),
            Some("mcp")
        );
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_request_log_redacts_sensitive_query() {
        let transport = ScriptedTransport::with(vec![]);
        let client = client_with(config(), transport.clone());

        client
            .get("apis", &[("access_token", "leaky-value"), ("expand", "true")])
            .await
            .expect("request succeeds");

        assert_eq!(transport.sent()[0].query.len(), 2);
        assert!(logs_contain("Gateway request"));
        assert!(!logs_contain("leaky-value"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failures_are_logged_once_with_level_by_status() {
        let limited_config = GatewayConfig { rate_limit_requests: 1, ..config() };
        let limited = client_with(limited_config, ScriptedTransport::with(vec![]));
        limited.get("apis", &[]).await.expect("first call is granted");
        let rejected = limited.get("apis", &[]).await.expect_err("second call is limited");

        let failing = client_with(
            config(),
            ScriptedTransport::with(vec![ScriptedTransport::respond(500, "boom")]),
        );
        let failed = failing.get("apis", &[]).await.expect_err("500 fails");

        assert!(rejected.is_logged());
        assert!(failed.is_logged());

        let rejected_id = rejected.correlation_id().to_string();
        let failed_id = failed.correlation_id().to_string();
        logs_assert(|lines: &[&str]| {
            let rejected_lines: Vec<&&str> =
                lines.iter().filter(|l| l.contains(&rejected_id)).collect();
            let failed_lines: Vec<&&str> =
                lines.iter().filter(|l| l.contains(&failed_id)).collect();
            if rejected_lines.len() != 1 || failed_lines.len() != 1 {
                return Err(format!(
                    "expected one line per failure, got {} and {}",
                    rejected_lines.len(),
                    failed_lines.len()
                ));
            }
            if !rejected_lines[0].contains("WARN") {
                return Err(format!("rate limit not logged at warn: {}", rejected_lines[0]));
            }
            if !failed_lines[0].contains("ERROR") {
                return Err(format!("server error not logged at error: {}", failed_lines[0]));
            }
            Ok(())
        });
    }
}
