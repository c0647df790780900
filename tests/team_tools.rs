//! Team Tool Tests
//!
//! Team CRUD through the tool router, backed by the in-memory store.

mod common;

use apigee_hybrid_mcp::mcp::tools::call_tool;
use apigee_hybrid_mcp::AppContext;
use common::{offline_context, payload};
use serde_json::{json, Value};

async fn call_ok(ctx: &AppContext, name: &str, args: Value) -> Value {
    let result = call_tool(ctx, name, Some(args)).await;
    let text = result.joined_text();
    assert_eq!(result.is_error, None, "{} failed: {}", name, text);
    payload(&text)
}

async fn call_err(ctx: &AppContext, name: &str, args: Value) -> String {
    let result = call_tool(ctx, name, Some(args)).await;
    assert_eq!(result.is_error, Some(true), "{} unexpectedly succeeded", name);
    result.joined_text()
}

#[tokio::test]
async fn test_team_lifecycle() {
    let ctx = offline_context();

    let created = call_ok(
        &ctx,
        "create-team",
        json!({
            "name": "platform-team",
            "description": "Platform engineering",
            "members": ["a@example.com", "b@example.com"]
        }),
    )
    .await;
    let team_id = created["id"].as_str().expect("team id").to_string();
    assert_eq!(created["name"], "platform-team");
    assert_eq!(created["members"], json!(["a@example.com", "b@example.com"]));
    assert!(created["created_at"].is_string());

    let fetched = call_ok(&ctx, "get-team", json!({"team_id": team_id})).await;
    assert_eq!(fetched, created);

    let updated = call_ok(
        &ctx,
        "update-team",
        json!({"team_id": team_id, "members": ["c@example.com"]}),
    )
    .await;
    assert_eq!(updated["members"], json!(["c@example.com"]));
    assert_eq!(updated["description"], "Platform engineering");

    let listed = call_ok(&ctx, "list-teams", json!({})).await;
    assert_eq!(listed["teams"].as_array().map(Vec::len), Some(1));

    let deleted = call_ok(&ctx, "delete-team", json!({"team_id": team_id})).await;
    assert_eq!(deleted, json!({"success": true, "team_id": team_id}));

    let text = call_err(&ctx, "get-team", json!({"team_id": team_id})).await;
    assert!(text.contains("RESOURCE_NOT_FOUND"));
}

#[tokio::test]
async fn test_duplicate_team_name() {
    let ctx = offline_context();
    call_ok(&ctx, "create-team", json!({"name": "payments"})).await;

    let text = call_err(&ctx, "create-team", json!({"name": "payments"})).await;
    assert!(text.contains("Error Code: RESOURCE_ALREADY_EXISTS"));
    assert!(text.contains("Status: 409"));
}

#[tokio::test]
async fn test_invalid_team_data() {
    let ctx = offline_context();

    let text = call_err(&ctx, "create-team", json!({"name": "-bad-"})).await;
    assert!(text.contains("INVALID_PARAMETER"));

    let text = call_err(
        &ctx,
        "create-team",
        json!({"name": "dupes", "members": ["a@example.com", "a@example.com"]}),
    )
    .await;
    assert!(text.contains("Duplicate members not allowed"));

    let listed = call_ok(&ctx, "list-teams", json!({})).await;
    assert_eq!(listed["teams"], json!([]));
}

#[tokio::test]
async fn test_delete_missing_team() {
    let ctx = offline_context();
    let text = call_err(&ctx, "delete-team", json!({"team_id": "no-such-team"})).await;
    assert!(text.contains("RESOURCE_NOT_FOUND"));
}

#[tokio::test]
async fn test_teams_list_in_creation_order() {
    let ctx = offline_context();
    for name in ["zeta", "alpha", "mid"] {
        call_ok(&ctx, "create-team", json!({"name": name})).await;
    }

    let listed = call_ok(&ctx, "list-teams", json!({})).await;
    let names: Vec<&str> = listed["teams"]
        .as_array()
        .expect("teams array")
        .iter()
        .filter_map(|t| t["name"].as_str())
        .collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
}
