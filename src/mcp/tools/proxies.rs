//! API proxy tools

use reqwest::Method;
use serde_json::json;

use super::{flag_query, gateway_schema, read, scoped, write, ToolOutput};
use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::Result;
use crate::mcp::protocol::Tool;
use crate::validation::{bool_flag, path_segment, positive_integer, Arguments};

pub fn list_api_proxies_tool() -> Tool {
    Tool::new(
        "list-api-proxies",
        "List all API proxies in an organization",
        gateway_schema(
            json!({
                "includeRevisions": {"type": "boolean", "description": "Include revision numbers"}
            }),
            &[],
        ),
    )
}

pub fn get_api_proxy_tool() -> Tool {
    Tool::new(
        "get-api-proxy",
        "Get details of a specific API proxy including all revisions",
        gateway_schema(
            json!({
                "proxy": {"type": "string", "description": "API proxy name"}
            }),
            &["proxy"],
        ),
    )
}

pub fn get_api_proxy_revision_tool() -> Tool {
    Tool::new(
        "get-api-proxy-revision",
        "Get details of a specific API proxy revision",
        gateway_schema(
            json!({
                "proxy": {"type": "string", "description": "API proxy name"},
                "revision": {"type": "string", "description": "Revision number"}
            }),
            &["proxy", "revision"],
        ),
    )
}

fn deployment_properties() -> serde_json::Value {
    json!({
        "environment": {"type": "string", "description": "Environment name"},
        "proxy": {"type": "string", "description": "API proxy name"},
        "revision": {"type": "string", "description": "Revision number"}
    })
}

pub fn deploy_api_proxy_tool() -> Tool {
    let mut properties = deployment_properties();
    properties["override"] = json!({
        "type": "boolean",
        "description": "Replace revisions already deployed to the environment"
    });
    Tool::new(
        "deploy-api-proxy",
        "Deploy an API proxy revision to an environment",
        gateway_schema(properties, &["environment", "proxy", "revision"]),
    )
}

pub fn undeploy_api_proxy_tool() -> Tool {
    Tool::new(
        "undeploy-api-proxy",
        "Undeploy an API proxy revision from an environment",
        gateway_schema(deployment_properties(), &["environment", "proxy", "revision"]),
    )
}

pub async fn execute_list_api_proxies(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let query = flag_query(args, "includeRevisions")?;
    let data = read(ctx, &scoped(args, "apis".into())?, &query).await?;
    Ok(ToolOutput::new("List API Proxies", data))
}

pub async fn execute_get_api_proxy(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let proxy = path_segment(args, "proxy")?;
    let data = read(ctx, &scoped(args, format!("apis/{}", proxy))?, &[]).await?;
    Ok(ToolOutput::new(format!("Get API Proxy: {}", proxy), data))
}

pub async fn execute_get_api_proxy_revision(
    ctx: &AppContext,
    args: &Arguments,
) -> Result<ToolOutput> {
    let proxy = path_segment(args, "proxy")?;
    let revision = positive_integer(args, "revision")?;
    let path = scoped(args, format!("apis/{}/revisions/{}", proxy, revision))?;
    let data = read(ctx, &path, &[]).await?;
    Ok(ToolOutput::new(format!("Get API Proxy Revision: {} (rev {})", proxy, revision), data))
}

struct Deployment<'a> {
    environment: &'a str,
    proxy: &'a str,
    revision: u64,
}

impl<'a> Deployment<'a> {
    fn parse(args: &'a Arguments) -> Result<Self> {
        Ok(Self {
            environment: path_segment(args, "environment")?,
            proxy: path_segment(args, "proxy")?,
            revision: positive_integer(args, "revision")?,
        })
    }

    fn path(&self, args: &Arguments) -> Result<String> {
        scoped(
            args,
            format!(
                "environments/{}/apis/{}/revisions/{}/deployments",
                self.environment, self.proxy, self.revision
            ),
        )
    }
}

pub async fn execute_deploy_api_proxy(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let deployment = Deployment::parse(args)?;
    let mut request = GatewayRequest::new(Method::POST, deployment.path(args)?);
    if bool_flag(args, "override", false)? {
        request = request.with_query("override", "true");
    }

    let data = write(ctx, request).await?;
    Ok(ToolOutput::new(
        format!(
            "Deploy API Proxy: {} rev {} to {}",
            deployment.proxy, deployment.revision, deployment.environment
        ),
        data,
    ))
}

pub async fn execute_undeploy_api_proxy(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let deployment = Deployment::parse(args)?;
    let data = write(ctx, GatewayRequest::delete(deployment.path(args)?)).await?;
    Ok(ToolOutput::new(
        format!(
            "Undeploy API Proxy: {} rev {} from {}",
            deployment.proxy, deployment.revision, deployment.environment
        ),
        data,
    ))
}
