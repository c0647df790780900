//! Team tools
//!
//! Teams live in the server's own store; these tools never call the gateway.

use serde_json::{json, Value};
use tracing::info;

use super::ToolOutput;
use crate::context::AppContext;
use crate::errors::{AppError, Result};
use crate::mcp::protocol::Tool;
use crate::teams::{CreateTeamRequest, Team, UpdateTeamRequest};
use crate::validation::{non_empty_string, optional_string, string_list, Arguments};

pub fn list_teams_tool() -> Tool {
    Tool::new(
        "list-teams",
        "List all teams",
        json!({"type": "object", "properties": {}, "required": []}),
    )
}

pub fn get_team_tool() -> Tool {
    Tool::new(
        "get-team",
        "Get details of a specific team",
        json!({
            "type": "object",
            "properties": {
                "team_id": {"type": "string", "description": "Team ID"}
            },
            "required": ["team_id"]
        }),
    )
}

pub fn create_team_tool() -> Tool {
    Tool::new(
        "create-team",
        "Create a new team",
        json!({
            "type": "object",
            "properties": {
                "name": {
                    "type": "string",
                    "description": "Team name (3-255 characters: letters, digits, hyphens, underscores)"
                },
                "description": {"type": "string", "description": "Team description"},
                "members": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Member email addresses"
                }
            },
            "required": ["name"]
        }),
    )
}

pub fn update_team_tool() -> Tool {
    Tool::new(
        "update-team",
        "Update an existing team",
        json!({
            "type": "object",
            "properties": {
                "team_id": {"type": "string", "description": "Team ID"},
                "description": {"type": "string", "description": "New description"},
                "members": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Replacement member list"
                }
            },
            "required": ["team_id"]
        }),
    )
}

pub fn delete_team_tool() -> Tool {
    Tool::new(
        "delete-team",
        "Delete a team",
        json!({
            "type": "object",
            "properties": {
                "team_id": {"type": "string", "description": "Team ID"}
            },
            "required": ["team_id"]
        }),
    )
}

fn team_value(team: &Team) -> Result<Value> {
    serde_json::to_value(team)
        .map_err(|e| AppError::internal(format!("Failed to serialize team: {}", e)))
}

fn invalid_team_data(errors: validator::ValidationErrors) -> AppError {
    AppError::invalid_parameter("team_data", errors.to_string())
}

pub async fn execute_list_teams(ctx: &AppContext, _args: &Arguments) -> Result<ToolOutput> {
    let teams = ctx.teams.list_all().await?;
    let teams = teams.iter().map(team_value).collect::<Result<Vec<_>>>()?;
    Ok(ToolOutput::new("List Teams", json!({ "teams": teams })))
}

pub async fn execute_get_team(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let team_id = non_empty_string(args, "team_id")?;
    let team = ctx
        .teams
        .get_by_id(team_id)
        .await?
        .ok_or_else(|| AppError::not_found("team", team_id))?;
    Ok(ToolOutput::new(format!("Get Team: {}", team_id), team_value(&team)?))
}

pub async fn execute_create_team(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let request = CreateTeamRequest {
        name: non_empty_string(args, "name")?.to_string(),
        description: optional_string(args, "description")?.map(str::to_string),
        members: string_list(args, "members")?,
    };
    request.check().map_err(invalid_team_data)?;

    let team = ctx.teams.create(request).await?;
    info!(team_id = %team.id, team_name = %team.name, "team_created");
    Ok(ToolOutput::new("Create Team", team_value(&team)?))
}

pub async fn execute_update_team(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let team_id = non_empty_string(args, "team_id")?;
    let members = match args.get("members") {
        None | Some(Value::Null) => None,
        Some(_) => Some(string_list(args, "members")?),
    };
    let request = UpdateTeamRequest {
        description: optional_string(args, "description")?.map(str::to_string),
        members,
    };
    request.check().map_err(invalid_team_data)?;

    let team = ctx.teams.update(team_id, request).await?;
    info!(team_id = %team.id, team_name = %team.name, "team_updated");
    Ok(ToolOutput::new(format!("Update Team: {}", team_id), team_value(&team)?))
}

pub async fn execute_delete_team(ctx: &AppContext, args: &Arguments) -> Result<ToolOutput> {
    let team_id = non_empty_string(args, "team_id")?;
    if !ctx.teams.delete(team_id).await? {
        return Err(AppError::not_found("team", team_id));
    }
    info!(team_id = %team_id, "team_deleted");
    Ok(ToolOutput::new(
        format!("Delete Team: {}", team_id),
        json!({"success": true, "team_id": team_id}),
    ))
}
