//! Organization tools

use serde_json::json;

use super::{gateway_schema, optional_segment, read, ToolOutput};
use crate::context::AppContext;
use crate::errors::{AppError, Result};
use crate::mcp::protocol::Tool;
use crate::validation::Arguments;

pub fn list_organizations_tool() -> Tool {
    Tool::new(
        "list-organizations",
        "List all Apigee organizations accessible by the authenticated user",
        json!({"type": "object", "properties": {}, "required": []}),
    )
}

pub fn get_organization_tool() -> Tool {
    Tool::new(
        "get-organization",
        "Get details of a specific Apigee organization",
        gateway_schema(json!({}), &[]),
    )
}

pub async fn execute_list_organizations(ctx: &AppContext, _args: &Arguments) -> Result<ToolOutput> {
    let data = read(ctx, "organizations", &[]).await?;
    Ok(ToolOutput::new("List Organizations", data))
}

pub async fn execute_get_organization(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let organization = match optional_segment(args, "organization")? {
        Some(org) => org,
        None if !ctx.client.organization().is_empty() => ctx.client.organization(),
        None => return Err(AppError::missing_parameter("organization")),
    };
    let data = read(ctx, &format!("organizations/{}", organization), &[]).await?;
    Ok(ToolOutput::new("Get Organization", data))
}
