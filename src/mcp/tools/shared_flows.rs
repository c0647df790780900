//! Shared flow tools

use reqwest::Method;
use serde_json::json;

use super::{flag_query, gateway_schema, read, scoped, write, ToolOutput};
use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::Result;
use crate::mcp::protocol::Tool;
use crate::validation::{path_segment, positive_integer, Arguments};

pub fn list_shared_flows_tool() -> Tool {
    Tool::new(
        "list-shared-flows",
        "List all shared flows in an organization",
        gateway_schema(
            json!({
                "includeRevisions": {"type": "boolean", "description": "Include revision numbers"}
            }),
            &[],
        ),
    )
}

pub fn get_shared_flow_tool() -> Tool {
    Tool::new(
        "get-shared-flow",
        "Get details of a specific shared flow",
        gateway_schema(
            json!({
                "sharedFlow": {"type": "string", "description": "Shared flow name"}
            }),
            &["sharedFlow"],
        ),
    )
}

pub fn deploy_shared_flow_tool() -> Tool {
    Tool::new(
        "deploy-shared-flow",
        "Deploy a shared flow revision to an environment",
        gateway_schema(
            json!({
                "environment": {"type": "string", "description": "Environment name"},
                "sharedFlow": {"type": "string", "description": "Shared flow name"},
                "revision": {"type": "string", "description": "Revision number"}
            }),
            &["environment", "sharedFlow", "revision"],
        ),
    )
}

pub async fn execute_list_shared_flows(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let query = flag_query(args, "includeRevisions")?;
    let data = read(ctx, &scoped(args, "sharedflows".into())?, &query).await?;
    Ok(ToolOutput::new("List Shared Flows", data))
}

pub async fn execute_get_shared_flow(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let shared_flow = path_segment(args, "sharedFlow")?;
    let data = read(ctx, &scoped(args, format!("sharedflows/{}", shared_flow))?, &[]).await?;
    Ok(ToolOutput::new(format!("Get Shared Flow: {}", shared_flow), data))
}

pub async fn execute_deploy_shared_flow(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let environment = path_segment(args, "environment")?;
    let shared_flow = path_segment(args, "sharedFlow")?;
    let revision = positive_integer(args, "revision")?;
    let path = scoped(
        args,
        format!(
            "environments/{}/sharedflows/{}/revisions/{}/deployments",
            environment, shared_flow, revision
        ),
    )?;

    let data = write(ctx, GatewayRequest::new(Method::POST, path)).await?;
    Ok(ToolOutput::new(
        format!("Deploy Shared Flow: {} rev {} to {}", shared_flow, revision, environment),
        data,
    ))
}
