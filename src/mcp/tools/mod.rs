//! MCP Tools Module
//!
//! Each tool maps one call to a single gateway request or a single team
//! store operation. Gateway paths are relative to the configured organization
//! unless the caller passes an explicit `organization` argument.

use serde_json::{json, Map, Value};
use tracing::Instrument;

use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::{AppError, Result};
use crate::mcp::format::{format_api_response, format_error_response};
use crate::mcp::protocol::{Tool, ToolCallResult};
use crate::tool_span;
use crate::validation::{bool_flag, optional_string, path_segment, Arguments};

pub mod debug;
pub mod developers;
pub mod environments;
pub mod keystores;
pub mod organizations;
pub mod products;
pub mod proxies;
pub mod shared_flows;
pub mod teams;

/// Successful tool output before formatting
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub title: String,
    pub data: Value,
}

impl ToolOutput {
    pub fn new(title: impl Into<String>, data: Value) -> Self {
        Self { title: title.into(), data }
    }
}

/// Every tool served by `tools/list`, in catalog order.
pub fn all_tools() -> Vec<Tool> {
    vec![
        organizations::list_organizations_tool(),
        organizations::get_organization_tool(),
        environments::list_environments_tool(),
        environments::get_environment_tool(),
        environments::create_environment_tool(),
        proxies::list_api_proxies_tool(),
        proxies::get_api_proxy_tool(),
        proxies::get_api_proxy_revision_tool(),
        proxies::deploy_api_proxy_tool(),
        proxies::undeploy_api_proxy_tool(),
        developers::list_developers_tool(),
        developers::get_developer_tool(),
        developers::create_developer_tool(),
        developers::list_developer_apps_tool(),
        developers::get_developer_app_tool(),
        developers::create_developer_app_tool(),
        products::list_api_products_tool(),
        products::get_api_product_tool(),
        products::create_api_product_tool(),
        shared_flows::list_shared_flows_tool(),
        shared_flows::get_shared_flow_tool(),
        shared_flows::deploy_shared_flow_tool(),
        keystores::list_keystores_tool(),
        keystores::get_keystore_tool(),
        keystores::list_keystore_aliases_tool(),
        keystores::get_keystore_alias_tool(),
        teams::list_teams_tool(),
        teams::get_team_tool(),
        teams::create_team_tool(),
        teams::update_team_tool(),
        teams::delete_team_tool(),
        debug::create_debug_session_tool(),
        debug::get_debug_session_data_tool(),
    ]
}

/// Run one tool and render its result. Tool failures become `isError` results.
pub async fn call_tool(ctx: &AppContext, name: &str, arguments: Option<Value>) -> ToolCallResult {
    let span = tool_span!(name);
    async move {
        let outcome = match into_arguments(arguments) {
            Ok(args) => dispatch(ctx, name, &args).await,
            Err(e) => Err(e),
        };
        match outcome {
            Ok(output) => format_api_response(&output.data, &output.title),
            Err(e) => format_error_response(name, &e),
        }
    }
    .instrument(span)
    .await
}

pub async fn dispatch(ctx: &AppContext, name: &str, args: &Arguments) -> Result<ToolOutput> {
    match name {
        "list-organizations" => organizations::execute_list_organizations(ctx, args).await,
        "get-organization" => organizations::execute_get_organization(ctx, args).await,
        "list-environments" => environments::execute_list_environments(ctx, args).await,
        "get-environment" => environments::execute_get_environment(ctx, args).await,
        "create-environment" => environments::execute_create_environment(ctx, args).await,
        "list-api-proxies" => proxies::execute_list_api_proxies(ctx, args).await,
        "get-api-proxy" => proxies::execute_get_api_proxy(ctx, args).await,
        "get-api-proxy-revision" => proxies::execute_get_api_proxy_revision(ctx, args).await,
        "deploy-api-proxy" => proxies::execute_deploy_api_proxy(ctx, args).await,
        "undeploy-api-proxy" => proxies::execute_undeploy_api_proxy(ctx, args).await,
        "list-developers" => developers::execute_list_developers(ctx, args).await,
        "get-developer" => developers::execute_get_developer(ctx, args).await,
        "create-developer" => developers::execute_create_developer(ctx, args).await,
        "list-developer-apps" => developers::execute_list_developer_apps(ctx, args).await,
        "get-developer-app" => developers::execute_get_developer_app(ctx, args).await,
        "create-developer-app" => developers::execute_create_developer_app(ctx, args).await,
        "list-api-products" => products::execute_list_api_products(ctx, args).await,
        "get-api-product" => products::execute_get_api_product(ctx, args).await,
        "create-api-product" => products::execute_create_api_product(ctx, args).await,
        "list-shared-flows" => shared_flows::execute_list_shared_flows(ctx, args).await,
        "get-shared-flow" => shared_flows::execute_get_shared_flow(ctx, args).await,
        "deploy-shared-flow" => shared_flows::execute_deploy_shared_flow(ctx, args).await,
        "list-keystores" => keystores::execute_list_keystores(ctx, args).await,
        "get-keystore" => keystores::execute_get_keystore(ctx, args).await,
        "list-keystore-aliases" => keystores::execute_list_keystore_aliases(ctx, args).await,
        "get-keystore-alias" => keystores::execute_get_keystore_alias(ctx, args).await,
        "list-teams" => teams::execute_list_teams(ctx, args).await,
        "get-team" => teams::execute_get_team(ctx, args).await,
        "create-team" => teams::execute_create_team(ctx, args).await,
        "update-team" => teams::execute_update_team(ctx, args).await,
        "delete-team" => teams::execute_delete_team(ctx, args).await,
        "create-debug-session" => debug::execute_create_debug_session(ctx, args).await,
        "get-debug-session-data" => debug::execute_get_debug_session_data(ctx, args).await,
        _ => Err(AppError::invalid_parameter("name", format!("unknown tool: {}", name))),
    }
}

fn into_arguments(arguments: Option<Value>) -> Result<Arguments> {
    match arguments {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(AppError::invalid_parameter("arguments", "must be an object")),
    }
}

/// Input schema for a gateway tool; adds the optional `organization` override.
pub(crate) fn gateway_schema(properties: Value, required: &[&str]) -> Value {
    let mut properties = match properties {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    properties.insert(
        "organization".to_string(),
        json!({
            "type": "string",
            "description": "Organization ID (defaults to the configured organization)"
        }),
    );
    json!({
        "type": "object",
        "properties": properties,
        "required": required,
    })
}

/// Optional argument spliced into a path.
pub(crate) fn optional_segment<'a>(args: &'a Arguments, name: &str) -> Result<Option<&'a str>> {
    match optional_string(args, name)? {
        Some(_) => path_segment(args, name).map(Some),
        None => Ok(None),
    }
}

/// Prefix `path` with an explicit `organization` argument when one is given.
pub(crate) fn scoped(args: &Arguments, path: String) -> Result<String> {
    Ok(match optional_segment(args, "organization")? {
        Some(org) => format!("organizations/{}/{}", org, path),
        None => path,
    })
}

/// `(name, "true")` when the boolean argument `name` is set.
pub(crate) fn flag_query(
    args: &Arguments,
    name: &'static str,
) -> Result<Vec<(&'static str, &'static str)>> {
    Ok(if bool_flag(args, name, false)? { vec![(name, "true")] } else { Vec::new() })
}

/// Idempotent read; timeouts and upstream 5xx are retried by the context's policy
/// while the session stays open.
pub(crate) async fn read(ctx: &AppContext, path: &str, query: &[(&str, &str)]) -> Result<Value> {
    ctx.retry
        .run(|e: &AppError| e.is_retryable() && ctx.client.is_connected(), || {
            ctx.client.get(path, query)
        })
        .await
}

/// Non-idempotent call; never retried.
pub(crate) async fn write(ctx: &AppContext, request: GatewayRequest) -> Result<Value> {
    ctx.client.request(request).await
}
