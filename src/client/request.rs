//! Gateway request description and URL/header construction.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;

use crate::auth::SecretString;
use crate::errors::{AppError, Result};

/// One call against the gateway, relative to the configured organization.
#[derive(Debug, Clone)]
pub struct GatewayRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl GatewayRequest {
    pub fn new<P: Into<String>>(method: Method, path: P) -> Self {
        Self { method, path: path.into(), query: Vec::new(), body: None, headers: Vec::new() }
    }

    pub fn get<P: Into<String>>(path: P) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post<P: Into<String>>(path: P, body: Value) -> Self {
        Self::new(Method::POST, path).with_body(body)
    }

    pub fn delete<P: Into<String>>(path: P) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn with_query<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header<K: Into<String>, V: Into<String>>(mut self, name: K, value: V) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// `"{METHOD} {path}"`, used to name the operation in timeouts and logs.
    pub fn operation(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

/// Join `path` onto `base_url`, scoping it to `organization` unless it already
/// addresses `organizations` explicitly.
pub fn build_url(base_url: &str, organization: &str, path: &str) -> String {
    let path = path.trim_start_matches('/');
    let base_url = base_url.trim_end_matches('/');

    if path == "organizations" || path.starts_with("organizations/") {
        format!("{}/{}", base_url, path)
    } else {
        format!("{}/organizations/{}/{}", base_url, organization, path)
    }
}

/// Bearer and content-type headers first, then caller headers (last write wins).
pub fn build_headers(token: &SecretString, extra: &[(String, String)]) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();

    let mut bearer = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
        .map_err(|_| AppError::authentication("Access token is not a valid header value"))?;
    bearer.set_sensitive(true);
    headers.insert(AUTHORIZATION, bearer);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    for (name, value) in extra {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| {
            AppError::invalid_parameter("headers", format!("invalid header name: {}", name))
        })?;
        let header_value = HeaderValue::from_str(value).map_err(|_| {
            AppError::invalid_parameter("headers", format!("invalid value for header {}", name))
        })?;
        headers.insert(header_name, header_value);
    }

    Ok(headers)
}
