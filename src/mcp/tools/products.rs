//! API product tools

use serde_json::{json, Value};

use super::{flag_query, gateway_schema, read, scoped, write, ToolOutput};
use crate::client::GatewayRequest;
use crate::context::AppContext;
use crate::errors::{AppError, Result};
use crate::mcp::protocol::Tool;
use crate::validation::{
    non_empty_string, one_of, optional_string, path_segment, string_list, unique_items, Arguments,
};

const APPROVAL_TYPES: &[&str] = &["auto", "manual"];
const QUOTA_TIME_UNITS: &[&str] = &["minute", "hour", "day", "month"];

pub fn list_api_products_tool() -> Tool {
    Tool::new(
        "list-api-products",
        "List all API products in an organization",
        gateway_schema(
            json!({
                "expand": {"type": "boolean", "description": "Return full product details"}
            }),
            &[],
        ),
    )
}

pub fn get_api_product_tool() -> Tool {
    Tool::new(
        "get-api-product",
        "Get details of a specific API product",
        gateway_schema(
            json!({
                "product": {"type": "string", "description": "API product name"}
            }),
            &["product"],
        ),
    )
}

pub fn create_api_product_tool() -> Tool {
    Tool::new(
        "create-api-product",
        "Create a new API product with quotas and rate limits",
        gateway_schema(
            json!({
                "name": {"type": "string", "description": "Product name (required, immutable)"},
                "displayName": {"type": "string", "description": "Display name"},
                "description": {"type": "string", "description": "Product description"},
                "approvalType": {
                    "type": "string",
                    "enum": APPROVAL_TYPES,
                    "description": "Approval type for apps"
                },
                "proxies": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of API proxy names"
                },
                "environments": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "List of environment names"
                },
                "quota": {"type": "string", "description": "Quota limit"},
                "quotaInterval": {"type": "string", "description": "Quota interval"},
                "quotaTimeUnit": {
                    "type": "string",
                    "enum": QUOTA_TIME_UNITS,
                    "description": "Quota time unit"
                }
            }),
            &["name"],
        ),
    )
}

pub async fn execute_list_api_products(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let query = flag_query(args, "expand")?;
    let data = read(ctx, &scoped(args, "apiproducts".into())?, &query).await?;
    Ok(ToolOutput::new("List API Products", data))
}

pub async fn execute_get_api_product(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let product = path_segment(args, "product")?;
    let data = read(ctx, &scoped(args, format!("apiproducts/{}", product))?, &[]).await?;
    Ok(ToolOutput::new(format!("Get API Product: {}", product), data))
}

pub async fn execute_create_api_product(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let body = product_body(args)?;
    let data = write(ctx, GatewayRequest::post(scoped(args, "apiproducts".into())?, body)).await?;
    Ok(ToolOutput::new("Create API Product", data))
}

fn product_body(args: &Arguments) -> Result<Value> {
    let name = non_empty_string(args, "name")?;
    let display_name = optional_string(args, "displayName")?.unwrap_or(name);
    let description = optional_string(args, "description")?.unwrap_or("");
    let approval_type = match optional_string(args, "approvalType")? {
        Some(value) => one_of(value, "approvalType", APPROVAL_TYPES)?,
        None => "auto",
    };
    let proxies = string_list(args, "proxies")?;
    unique_items(&proxies, "proxies")?;
    let environments = string_list(args, "environments")?;
    unique_items(&environments, "environments")?;

    let mut body = json!({
        "name": name,
        "displayName": display_name,
        "description": description,
        "approvalType": approval_type,
        "proxies": proxies,
        "environments": environments,
        "apiResources": ["/**"],
    });

    if let Some(quota) = quota_value(args, "quota")? {
        let interval = quota_value(args, "quotaInterval")?.unwrap_or_else(|| "1".to_string());
        let time_unit = match optional_string(args, "quotaTimeUnit")? {
            Some(value) => one_of(value, "quotaTimeUnit", QUOTA_TIME_UNITS)?,
            None => "day",
        };
        body["quota"] = json!(quota);
        body["quotaInterval"] = json!(interval);
        body["quotaTimeUnit"] = json!(time_unit);
    }

    Ok(body)
}

/// Quota fields are strings on the wire; whole numbers are accepted too.
fn quota_value(args: &Arguments, name: &str) -> Result<Option<String>> {
    match args.get(name) {
        Some(Value::Number(n)) if n.is_u64() => Ok(Some(n.to_string())),
        Some(Value::Number(_)) => Err(AppError::invalid_parameter(name, "must be a whole number")),
        _ => Ok(optional_string(args, name)?.map(str::to_string)),
    }
}
