//! Common test utilities for all integration tests.
//!
//! Builds settings and contexts pointed at a local mock gateway.

#![allow(dead_code)]

use std::sync::Arc;

use apigee_hybrid_mcp::auth::SecretString;
use apigee_hybrid_mcp::{AppContext, Settings};
use serde_json::Value;

pub const TEST_ORG: &str = "acme";
pub const TEST_TOKEN: &str = "test-token";

fn install_rustls_provider() {
    use rustls::crypto::{ring, CryptoProvider};

    if CryptoProvider::get_default().is_none() {
        let _ = ring::default_provider().install_default();
    }
}

/// Settings for a gateway at `base_url` with a static token, no retries and
/// a short timeout.
pub fn test_settings(base_url: &str) -> Settings {
    Settings {
        apigee_organization: TEST_ORG.to_string(),
        apigee_api_base_url: base_url.to_string(),
        access_token: Some(SecretString::new(TEST_TOKEN)),
        max_retries: 1,
        request_timeout: 1,
        circuit_breaker_failure_threshold: 3,
        circuit_breaker_timeout: 60,
        ..Default::default()
    }
}

/// Context with an open gateway session.
pub fn connected_context(settings: Settings) -> Arc<AppContext> {
    install_rustls_provider();
    let ctx = Arc::new(AppContext::from_settings(settings));
    ctx.client.connect().expect("Failed to open gateway session");
    ctx
}

/// Context for tests that never reach the gateway.
pub fn offline_context() -> Arc<AppContext> {
    Arc::new(AppContext::from_settings(test_settings("http://127.0.0.1:9")))
}

/// Pull the JSON payload out of a formatted success text.
pub fn payload(text: &str) -> Value {
    let (_, body) = text.split_once("\n\n").expect("formatted response has a body");
    serde_json::from_str(body).expect("formatted body is JSON")
}
