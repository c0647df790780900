//! Debug session (trace) tools

use reqwest::Method;
use serde_json::json;

use super::{gateway_schema, read, scoped, write, ToolOutput};
use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::Result;
use crate::mcp::protocol::Tool;
use crate::validation::{in_range, path_segment, positive_integer, Arguments};

/// Longest debug session the gateway accepts, in seconds
pub const MAX_SESSION_TIMEOUT_SECS: i64 = 600;

fn session_properties() -> serde_json::Value {
    json!({
        "environment": {"type": "string", "description": "Environment name"},
        "proxy": {"type": "string", "description": "API proxy name"},
        "revision": {"type": "string", "description": "Revision number"},
        "session": {"type": "string", "description": "Session ID (UUID recommended)"}
    })
}

const SESSION_REQUIRED: &[&str] = &["environment", "proxy", "revision", "session"];

pub fn create_debug_session_tool() -> Tool {
    let mut properties = session_properties();
    properties["timeout"] = json!({
        "type": "integer",
        "minimum": 1,
        "maximum": MAX_SESSION_TIMEOUT_SECS,
        "description": "Session timeout in seconds (max 600)"
    });
    Tool::new(
        "create-debug-session",
        "Create a debug session (trace) for an API proxy",
        gateway_schema(properties, SESSION_REQUIRED),
    )
}

pub fn get_debug_session_data_tool() -> Tool {
    Tool::new(
        "get-debug-session-data",
        "Get captured transaction data from a debug session",
        gateway_schema(session_properties(), SESSION_REQUIRED),
    )
}

struct Session<'a> {
    environment: &'a str,
    proxy: &'a str,
    revision: u64,
    session: &'a str,
}

impl<'a> Session<'a> {
    fn parse(args: &'a Arguments) -> Result<Self> {
        Ok(Self {
            environment: path_segment(args, "environment")?,
            proxy: path_segment(args, "proxy")?,
            revision: positive_integer(args, "revision")?,
            session: path_segment(args, "session")?,
        })
    }

    fn sessions_path(&self) -> String {
        format!(
            "environments/{}/apis/{}/revisions/{}/debugsessions",
            self.environment, self.proxy, self.revision
        )
    }
}

pub async fn execute_create_debug_session(
    ctx: &AppContext,
    args: &Arguments,
) -> Result<ToolOutput> {
    let session = Session::parse(args)?;
    let mut request = GatewayRequest::new(Method::POST, scoped(args, session.sessions_path())?)
        .with_query("session", session.session);

    if args.get("timeout").is_some_and(|v| !v.is_null()) {
        let timeout = positive_integer(args, "timeout")?;
        let timeout = in_range(timeout as i64, "timeout", 1, MAX_SESSION_TIMEOUT_SECS)?;
        request = request.with_query("timeout", timeout.to_string());
    }

    let data = write(ctx, request).await?;
    Ok(ToolOutput::new(format!("Create Debug Session: {}", session.session), data))
}

pub async fn execute_get_debug_session_data(
    ctx: &AppContext,
    args: &Arguments,
) -> Result<ToolOutput> {
    let session = Session::parse(args)?;
    let path = scoped(
        args,
        format!("{}/{}/data", session.sessions_path(), session.session),
    )?;
    let data = read(ctx, &path, &[]).await?;
    Ok(ToolOutput::new(format!("Get Debug Session Data: {}", session.session), data))
}
