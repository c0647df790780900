//! Keystore and alias tools

use serde_json::json;

use super::{gateway_schema, read, scoped, ToolOutput};
use crate::context::AppContext;
use crate::errors::Result;
use crate::mcp::protocol::Tool;
use crate::validation::{path_segment, Arguments};

pub fn list_keystores_tool() -> Tool {
    Tool::new(
        "list-keystores",
        "List all keystores in an environment",
        gateway_schema(
            json!({
                "environment": {"type": "string", "description": "Environment name"}
            }),
            &["environment"],
        ),
    )
}

pub fn get_keystore_tool() -> Tool {
    Tool::new(
        "get-keystore",
        "Get details of a specific keystore including aliases",
        gateway_schema(
            json!({
                "environment": {"type": "string", "description": "Environment name"},
                "keystore": {"type": "string", "description": "Keystore name"}
            }),
            &["environment", "keystore"],
        ),
    )
}

pub fn list_keystore_aliases_tool() -> Tool {
    Tool::new(
        "list-keystore-aliases",
        "List all aliases (certificates) in a keystore",
        gateway_schema(
            json!({
                "environment": {"type": "string", "description": "Environment name"},
                "keystore": {"type": "string", "description": "Keystore name"}
            }),
            &["environment", "keystore"],
        ),
    )
}

pub fn get_keystore_alias_tool() -> Tool {
    Tool::new(
        "get-keystore-alias",
        "Get details of a specific keystore alias (certificate)",
        gateway_schema(
            json!({
                "environment": {"type": "string", "description": "Environment name"},
                "keystore": {"type": "string", "description": "Keystore name"},
                "alias": {"type": "string", "description": "Alias name"}
            }),
            &["environment", "keystore", "alias"],
        ),
    )
}

fn keystores_path(args: &Arguments) -> Result<(String, &str)> {
    let environment = path_segment(args, "environment")?;
    Ok((format!("environments/{}/keystores", environment), environment))
}

pub async fn execute_list_keystores(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let (path, environment) = keystores_path(args)?;
    let data = read(ctx, &scoped(args, path)?, &[]).await?;
    Ok(ToolOutput::new(format!("List Keystores in {}", environment), data))
}

pub async fn execute_get_keystore(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let (path, _) = keystores_path(args)?;
    let keystore = path_segment(args, "keystore")?;
    let data = read(ctx, &scoped(args, format!("{}/{}", path, keystore))?, &[]).await?;
    Ok(ToolOutput::new(format!("Get Keystore: {}", keystore), data))
}

pub async fn execute_list_keystore_aliases(
    ctx: &AppContext,
    args: &Arguments,
) -> Result<ToolOutput> {
    let (path, _) = keystores_path(args)?;
    let keystore = path_segment(args, "keystore")?;
    let data = read(ctx, &scoped(args, format!("{}/{}/aliases", path, keystore))?, &[]).await?;
    Ok(ToolOutput::new(format!("List Keystore Aliases: {}", keystore), data))
}

pub async fn execute_get_keystore_alias(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let (path, _) = keystores_path(args)?;
    let keystore = path_segment(args, "keystore")?;
    let alias = path_segment(args, "alias")?;
    let path = scoped(args, format!("{}/{}/aliases/{}", path, keystore, alias))?;
    let data = read(ctx, &path, &[]).await?;
    Ok(ToolOutput::new(format!("Get Keystore Alias: {}", alias), data))
}
