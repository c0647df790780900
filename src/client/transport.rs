//! HTTP transport seam.
//!
//! The pipeline talks to the network only through [`Transport`], so tests can
//! substitute scripted responses while production uses [`ReqwestTransport`].

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use serde_json::Value;
use std::time::Duration;
use tracing::trace;

#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Failure to obtain a response at all. HTTP error statuses are not transport errors.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request timed out")]
    Timeout,

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("{message}")]
    Request { kind: &'static str, message: String },
}

impl TransportError {
    /// Category recorded in error details
    pub fn error_type(&self) -> &'static str {
        match self {
            TransportError::Timeout => "TimeoutError",
            TransportError::Connect(_) => "ConnectError",
            TransportError::Request { kind, .. } => *kind,
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout
        } else if e.is_connect() {
            TransportError::Connect(e.to_string())
        } else if e.is_builder() {
            TransportError::Request { kind: "BuilderError", message: e.to_string() }
        } else if e.is_body() || e.is_decode() {
            TransportError::Request { kind: "BodyError", message: e.to_string() }
        } else {
            TransportError::Request { kind: "RequestError", message: e.to_string() }
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request and read the full response body.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Pooled reqwest client; one per open gateway session.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let mut builder = self.client.request(request.method, &request.url).headers(request.headers);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        trace!(status, body_len = body.len(), "Received gateway response");
        Ok(TransportResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_types() {
        assert_eq!(TransportError::Timeout.error_type(), "TimeoutError");
        assert_eq!(TransportError::Connect("refused".into()).error_type(), "ConnectError");
        let e = TransportError::Request { kind: "BodyError", message: "eof".into() };
        assert_eq!(e.error_type(), "BodyError");
        assert_eq!(e.to_string(), "eof");
    }

    #[tokio::test]
    async fn test_connection_refused_is_connect_error() {
        let transport = ReqwestTransport::new(Duration::from_secs(2)).expect("client builds");
        let request = TransportRequest {
            method: Method::GET,
            url: "http://127.0.0.1:9/unreachable".to_string(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        };

        let error = transport.send(request).await.expect_err("nothing listens on port 9");
        assert!(matches!(error, TransportError::Connect(_) | TransportError::Timeout));
    }
}
