//! # Structured Logging
//!
//! Log output always goes to stderr: stdout carries the MCP message stream.

use tracing_subscriber::EnvFilter;

use crate::config::Settings;

/// Create a tracing span for one tool invocation.
///
/// ```rust,ignore
/// let span = tool_span!("list-environments");
/// let span = tool_span!("get-team", team_id = %id);
/// ```
#[macro_export]
macro_rules! tool_span {
    ($tool:expr) => {
        tracing::info_span!(
            "tool_call",
            tool = %$tool,
            request_id = %uuid::Uuid::new_v4()
        )
    };
    ($tool:expr, $($field:tt)*) => {
        tracing::info_span!(
            "tool_call",
            tool = %$tool,
            request_id = %uuid::Uuid::new_v4(),
            $($field)*
        )
    };
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over the configured level when set.
pub fn init_logging(settings: &Settings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(settings.tracing_level()))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if settings.json_logging {
        builder.json().with_current_span(true).try_init()
    } else {
        builder.compact().with_ansi(false).try_init()
    };

    installed.map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))
}

/// Log the effective configuration at startup. Secrets are never printed.
pub fn log_settings_summary(settings: &Settings) {
    tracing::info!(
        organization = %settings.apigee_organization,
        base_url = %settings.apigee_api_base_url,
        credentials = credentials_mode(settings),
        request_timeout_secs = settings.request_timeout,
        breaker_threshold = settings.circuit_breaker_failure_threshold,
        breaker_timeout_secs = settings.circuit_breaker_timeout,
        rate_limit_requests = settings.rate_limit_requests,
        rate_limit_window_secs = settings.rate_limit_window,
        "Apigee MCP server configuration"
    );
}

fn credentials_mode(settings: &Settings) -> &'static str {
    if settings.google_credentials_path.is_some() {
        "service_account"
    } else if settings.access_token.is_some() {
        "static_token"
    } else {
        "none"
    }
}
