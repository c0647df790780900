//! # Configuration Settings
//!
//! Runtime settings for the MCP server, layered from defaults, an optional TOML
//! file and `APIGEE_MCP_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use validator::{Validate, ValidationError};

use crate::auth::SecretString;

/// Environment variable prefix; `APIGEE_MCP_REQUEST_TIMEOUT` maps to `request_timeout`.
pub const ENV_PREFIX: &str = "APIGEE_MCP";

pub const DEFAULT_BASE_URL: &str = "https://apigee.googleapis.com/v1";

const LOG_LEVELS: [&str; 6] = ["trace", "debug", "info", "warn", "error", "critical"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),

    #[error("Missing required setting: {0}")]
    Missing(String),
}

/// Server settings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Settings {
    /// GCP project hosting the Apigee organization
    pub google_project_id: String,

    /// Path to a service-account JSON key
    pub google_credentials_path: Option<String>,

    /// Pre-minted bearer token, used when no key file is configured
    pub access_token: Option<SecretString>,

    /// Organization that unqualified gateway paths are scoped to
    pub apigee_organization: String,

    #[validate(url(message = "Base URL must be a valid URL"))]
    pub apigee_api_base_url: String,

    #[validate(custom(function = "validate_log_level"))]
    pub log_level: String,

    /// Emit JSON log lines instead of the compact human format
    pub json_logging: bool,

    #[validate(range(min = 1, max = 10, message = "Max retries must be between 1 and 10"))]
    pub max_retries: u32,

    #[validate(range(min = 1.0, message = "Retry backoff factor must be at least 1.0"))]
    pub retry_backoff_factor: f64,

    /// Wall-clock timeout for one gateway call, in seconds
    #[validate(range(
        min = 1,
        max = 300,
        message = "Request timeout must be between 1 and 300 seconds"
    ))]
    pub request_timeout: u64,

    #[validate(range(min = 1, message = "Failure threshold must be at least 1"))]
    pub circuit_breaker_failure_threshold: u32,

    /// Seconds an open circuit waits before admitting a trial call
    #[validate(range(min = 1, message = "Circuit breaker timeout must be at least 1 second"))]
    pub circuit_breaker_timeout: u64,

    #[validate(range(min = 1, message = "Rate limit must allow at least 1 request"))]
    pub rate_limit_requests: u32,

    #[validate(range(min = 1, message = "Rate limit window must be at least 1 second"))]
    pub rate_limit_window: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            google_project_id: String::new(),
            google_credentials_path: None,
            access_token: None,
            apigee_organization: String::new(),
            apigee_api_base_url: DEFAULT_BASE_URL.to_string(),
            log_level: "info".to_string(),
            json_logging: true,
            max_retries: 3,
            retry_backoff_factor: 2.0,
            request_timeout: 30,
            circuit_breaker_failure_threshold: 5,
            circuit_breaker_timeout: 60,
            rate_limit_requests: 100,
            rate_limit_window: 60,
        }
    }
}

impl Settings {
    /// Load settings from the environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load settings from an optional TOML file, then the environment.
    ///
    /// Environment variables win over the file.
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        Self::build(config_file, None)
    }

    fn build(
        config_file: Option<&Path>,
        env_source: Option<::config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ::config::Config::builder();
        if let Some(path) = config_file {
            builder = builder.add_source(::config::File::from(path).required(true));
        }

        let settings: Settings = builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .try_parsing(true)
                    .source(env_source),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Fails unless an organization is configured; required to serve tools.
    pub fn require_organization(&self) -> Result<&str, ConfigError> {
        let org = self.apigee_organization.trim();
        if org.is_empty() {
            return Err(ConfigError::Missing(format!(
                "apigee_organization (set {}_APIGEE_ORGANIZATION)",
                ENV_PREFIX
            )));
        }
        Ok(org)
    }

    pub fn request_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn circuit_breaker_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_timeout)
    }

    pub fn rate_limit_window_duration(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window)
    }

    /// `tracing` directive for the configured level; `critical` maps to `error`.
    pub fn tracing_level(&self) -> &'static str {
        match self.log_level.to_lowercase().as_str() {
            "trace" => "trace",
            "debug" => "debug",
            "warn" | "warning" => "warn",
            "error" | "critical" => "error",
            _ => "info",
        }
    }
}

fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let level = level.to_lowercase();
    if LOG_LEVELS.contains(&level.as_str()) || level == "warning" {
        Ok(())
    } else {
        let mut error = ValidationError::new("invalid_log_level");
        error.message = Some(format!("Log level must be one of: {}", LOG_LEVELS.join(", ")).into());
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<::config::Map<String, String>> {
        let mut map = ::config::Map::new();
        for (k, v) in pairs {
            map.insert(k.to_string(), v.to_string());
        }
        Some(map)
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::build(None, env(&[])).expect("defaults load");
        assert_eq!(settings.apigee_api_base_url, DEFAULT_BASE_URL);
        assert_eq!(settings.request_timeout, 30);
        assert_eq!(settings.circuit_breaker_failure_threshold, 5);
        assert_eq!(settings.circuit_breaker_timeout, 60);
        assert_eq!(settings.rate_limit_requests, 100);
        assert_eq!(settings.rate_limit_window, 60);
        assert_eq!(settings.max_retries, 3);
        assert!(settings.access_token.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let settings = Settings::build(
            None,
            env(&[
                ("APIGEE_MCP_APIGEE_ORGANIZATION", "acme"),
                ("APIGEE_MCP_REQUEST_TIMEOUT", "5"),
                ("APIGEE_MCP_ACCESS_TOKEN", "ya29.token"),
                ("APIGEE_MCP_LOG_LEVEL", "DEBUG"),
            ]),
        )
        .expect("env load");

        assert_eq!(settings.apigee_organization, "acme");
        assert_eq!(settings.request_timeout_duration(), Duration::from_secs(5));
        assert_eq!(
            settings.access_token.as_ref().map(|t| t.expose_secret()),
            Some("ya29.token")
        );
        assert_eq!(settings.tracing_level(), "debug");
    }

    #[test]
    fn test_file_then_environment() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().expect("tempfile");
        writeln!(file, "apigee_organization = \"from-file\"\nrate_limit_requests = 7")
            .expect("write");

        let settings = Settings::build(
            Some(file.path()),
            env(&[("APIGEE_MCP_APIGEE_ORGANIZATION", "from-env")]),
        )
        .expect("file load");

        assert_eq!(settings.apigee_organization, "from-env");
        assert_eq!(settings.rate_limit_requests, 7);
    }

    #[test]
    fn test_rejects_invalid_values() {
        let result = Settings::build(None, env(&[("APIGEE_MCP_REQUEST_TIMEOUT", "0")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = Settings::build(None, env(&[("APIGEE_MCP_LOG_LEVEL", "loud")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = Settings::build(None, env(&[("APIGEE_MCP_APIGEE_API_BASE_URL", "nope")]));
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_require_organization() {
        let settings = Settings::default();
        assert!(matches!(settings.require_organization(), Err(ConfigError::Missing(_))));

        let settings = Settings { apigee_organization: "acme".into(), ..Default::default() };
        assert_eq!(settings.require_organization().ok(), Some("acme"));
    }

    #[test]
    fn test_debug_redacts_token() {
        let settings =
            Settings { access_token: Some(SecretString::new("ya29.x")), ..Default::default() };
        assert!(!format!("{:?}", settings).contains("ya29"));
    }
}
