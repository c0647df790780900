//! Developer and developer app tools

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{json, Value};

use super::{flag_query, gateway_schema, read, scoped, write, ToolOutput};
use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::Result;
use crate::mcp::protocol::Tool;
use crate::validation::{
    email, matches_pattern, non_empty_string, optional_string, path_segment, string_list,
    unique_items, Arguments,
};

lazy_static! {
    static ref CALLBACK_URL_REGEX: Regex = Regex::new(r"^https?://[^\s/?#]+[^\s]*$")
        .expect("CALLBACK_URL_REGEX should be a valid regex pattern");
}

pub fn list_developers_tool() -> Tool {
    Tool::new(
        "list-developers",
        "List all developers in an organization",
        gateway_schema(
            json!({
                "expand": {"type": "boolean", "description": "Return full developer details"}
            }),
            &[],
        ),
    )
}

pub fn get_developer_tool() -> Tool {
    Tool::new(
        "get-developer",
        "Get details of a specific developer",
        gateway_schema(
            json!({
                "developer": {"type": "string", "description": "Developer email or ID"}
            }),
            &["developer"],
        ),
    )
}

pub fn create_developer_tool() -> Tool {
    Tool::new(
        "create-developer",
        "Create a new developer in an organization",
        gateway_schema(
            json!({
                "email": {"type": "string", "description": "Developer email (required, unique)"},
                "firstName": {"type": "string", "description": "First name"},
                "lastName": {"type": "string", "description": "Last name"},
                "userName": {"type": "string", "description": "Username (defaults to the email local part)"}
            }),
            &["email", "firstName", "lastName"],
        ),
    )
}

pub fn list_developer_apps_tool() -> Tool {
    Tool::new(
        "list-developer-apps",
        "List all apps for a specific developer",
        gateway_schema(
            json!({
                "developer": {"type": "string", "description": "Developer email or ID"},
                "expand": {"type": "boolean", "description": "Return full app details"}
            }),
            &["developer"],
        ),
    )
}

pub fn get_developer_app_tool() -> Tool {
    Tool::new(
        "get-developer-app",
        "Get details of a developer app including credentials",
        gateway_schema(
            json!({
                "developer": {"type": "string", "description": "Developer email or ID"},
                "app": {"type": "string", "description": "App name"}
            }),
            &["developer", "app"],
        ),
    )
}

pub fn create_developer_app_tool() -> Tool {
    Tool::new(
        "create-developer-app",
        "Create a new developer app with API product associations",
        gateway_schema(
            json!({
                "developer": {"type": "string", "description": "Developer email or ID"},
                "name": {"type": "string", "description": "App name"},
                "apiProducts": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "API products the app may use"
                },
                "callbackUrl": {"type": "string", "description": "OAuth callback URL (http or https)"}
            }),
            &["developer", "name"],
        ),
    )
}

pub async fn execute_list_developers(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let query = flag_query(args, "expand")?;
    let data = read(ctx, &scoped(args, "developers".into())?, &query).await?;
    Ok(ToolOutput::new("List Developers", data))
}

pub async fn execute_get_developer(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let developer = path_segment(args, "developer")?;
    let data = read(ctx, &scoped(args, format!("developers/{}", developer))?, &[]).await?;
    Ok(ToolOutput::new(format!("Get Developer: {}", developer), data))
}

pub async fn execute_create_developer(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let address = email(non_empty_string(args, "email")?, "email")?;
    let first_name = non_empty_string(args, "firstName")?;
    let last_name = non_empty_string(args, "lastName")?;
    let user_name = match optional_string(args, "userName")? {
        Some(user_name) => user_name,
        None => address.split('@').next().unwrap_or(address),
    };

    let body = json!({
        "email": address,
        "firstName": first_name,
        "lastName": last_name,
        "userName": user_name,
    });
    let data = write(ctx, GatewayRequest::post(scoped(args, "developers".into())?, body)).await?;
    Ok(ToolOutput::new("Create Developer", data))
}

pub async fn execute_list_developer_apps(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let developer = path_segment(args, "developer")?;
    let query = flag_query(args, "expand")?;
    let path = scoped(args, format!("developers/{}/apps", developer))?;
    let data = read(ctx, &path, &query).await?;
    Ok(ToolOutput::new(format!("List Developer Apps: {}", developer), data))
}

pub async fn execute_get_developer_app(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let developer = path_segment(args, "developer")?;
    let app = path_segment(args, "app")?;
    let path = scoped(args, format!("developers/{}/apps/{}", developer, app))?;
    let data = read(ctx, &path, &[]).await?;
    Ok(ToolOutput::new(format!("Get Developer App: {}", app), data))
}

/// Request body for a new developer app.
fn app_body(args: &Arguments) -> Result<Value> {
    let name = non_empty_string(args, "name")?;
    let api_products = string_list(args, "apiProducts")?;
    unique_items(&api_products, "apiProducts")?;

    let mut body = json!({
        "name": name,
        "apiProducts": api_products,
    });
    if let Some(callback_url) = optional_string(args, "callbackUrl")? {
        let callback_url =
            matches_pattern(callback_url, "callbackUrl", &CALLBACK_URL_REGEX, "an http(s) URL")?;
        body["callbackUrl"] = json!(callback_url);
    }
    Ok(body)
}

pub async fn execute_create_developer_app(
    ctx: &AppContext,
    args: &Arguments,
) -> Result<ToolOutput> {
    let developer = path_segment(args, "developer")?;
    let body = app_body(args)?;

    let path = scoped(args, format!("developers/{}/apps", developer))?;
    let data = write(ctx, GatewayRequest::post(path, body)).await?;
    Ok(ToolOutput::new("Create Developer App", data))
}
