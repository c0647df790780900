//! Environment tools

use serde_json::json;

use super::{gateway_schema, read, scoped, write, ToolOutput};
use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::Result;
use crate::mcp::protocol::Tool;
use crate::validation::{one_of, optional_string, path_segment, Arguments};

const ENVIRONMENT_TYPES: &[&str] = &["PRODUCTION", "NON_PRODUCTION"];

pub fn list_environments_tool() -> Tool {
    Tool::new(
        "list-environments",
        "List all environments in an Apigee organization",
        gateway_schema(json!({}), &[]),
    )
}

pub fn get_environment_tool() -> Tool {
    Tool::new(
        "get-environment",
        "Get details of a specific environment",
        gateway_schema(
            json!({
                "environment": {"type": "string", "description": "Environment name"}
            }),
            &["environment"],
        ),
    )
}

pub fn create_environment_tool() -> Tool {
    Tool::new(
        "create-environment",
        "Create a new environment in an organization",
        gateway_schema(
            json!({
                "name": {"type": "string", "description": "Environment name"},
                "displayName": {"type": "string", "description": "Display name for the environment"},
                "description": {"type": "string", "description": "Environment description"},
                "type": {
                    "type": "string",
                    "enum": ENVIRONMENT_TYPES,
                    "description": "Environment type (default NON_PRODUCTION)"
                }
            }),
            &["name"],
        ),
    )
}

pub async fn execute_list_environments(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let data = read(ctx, &scoped(args, "environments".into())?, &[]).await?;
    Ok(ToolOutput::new("List Environments", data))
}

pub async fn execute_get_environment(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let environment = path_segment(args, "environment")?;
    let path = scoped(args, format!("environments/{}", environment))?;
    let data = read(ctx, &path, &[]).await?;
    Ok(ToolOutput::new(format!("Get Environment: {}", environment), data))
}

pub async fn execute_create_environment(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let name = path_segment(args, "name")?;
    let display_name = optional_string(args, "displayName")?.unwrap_or(name);
    let description = optional_string(args, "description")?.unwrap_or("");
    let env_type = match optional_string(args, "type")? {
        Some(t) => one_of(t, "type", ENVIRONMENT_TYPES)?,
        None => "NON_PRODUCTION",
    };

    let body = json!({
        "name": name,
        "displayName": display_name,
        "description": description,
        "type": env_type,
    });
    let data = write(ctx, GatewayRequest::post(scoped(args, "environments".into())?, body)).await?;
    Ok(ToolOutput::new("Create Environment", data))
}
