//! MCP Request Handler
//!
//! Routes incoming JSON-RPC requests to the appropriate method handlers.

use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, error};

use crate::context::AppContext;
use crate::mcp::error::McpError;
use crate::mcp::protocol::*;
use crate::mcp::tools;

pub const SERVER_NAME: &str = "apigee-hybrid-mcp";

pub struct McpHandler {
    ctx: Arc<AppContext>,
}

impl McpHandler {
    pub fn new(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Handle one JSON-RPC message. Notifications produce no response.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let method = request.method.clone();
        let id = request.id.clone();

        debug!(method = %method, id = ?id, "Handling MCP request");

        if request.is_notification() {
            debug!(method = %method, "Received notification");
            return None;
        }

        if request.jsonrpc != JSONRPC_VERSION {
            return Some(self.error_response(
                id,
                McpError::InvalidRequest(format!("unsupported jsonrpc version '{}'", request.jsonrpc)),
            ));
        }

        let response = match method.as_str() {
            "initialize" => self.handle_initialize(id.clone(), request.params),
            "ping" => JsonRpcResponse::success(id.clone(), json!({})),
            "tools/list" => self.handle_tools_list(id.clone()),
            "tools/call" => self.handle_tools_call(id.clone(), request.params).await,
            _ => self.error_response(id.clone(), McpError::MethodNotFound(method.clone())),
        };

        debug!(
            method = %method,
            id = ?id,
            has_error = response.error.is_some(),
            "Completed MCP request"
        );

        Some(response)
    }

    fn handle_initialize(&self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let params: InitializeRequest = match params {
            Value::Null => InitializeRequest::default(),
            other => match serde_json::from_value(other) {
                Ok(p) => p,
                Err(e) => {
                    error!(error = %e, "Failed to parse initialize params");
                    return self.error_response(
                        id,
                        McpError::InvalidParams(format!("Failed to parse initialize params: {}", e)),
                    );
                }
            },
        };

        let protocol_version = params
            .protocol_version
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_PROTOCOL_VERSION.to_string());

        debug!(
            protocol_version = %protocol_version,
            client_name = ?params.client_info.as_ref().map(|c| c.name.as_str()),
            "Received initialize request"
        );

        let result = InitializeResponse {
            protocol_version,
            capabilities: ServerCapabilities {
                tools: Some(ToolCapabilities { list_changed: false }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: crate::VERSION.to_string(),
            },
            instructions: Some(format!(
                "Manage Apigee Hybrid resources in organization '{}' and local teams.",
                self.ctx.client.organization()
            )),
        };

        self.to_response(id, &result)
    }

    fn handle_tools_list(&self, id: Option<JsonRpcId>) -> JsonRpcResponse {
        let result = ToolsListResult { tools: tools::all_tools(), next_cursor: None };
        debug!(tool_count = result.tools.len(), "Listing available tools");
        self.to_response(id, &result)
    }

    async fn handle_tools_call(&self, id: Option<JsonRpcId>, params: Value) -> JsonRpcResponse {
        let call: ToolCallRequest = match serde_json::from_value(params) {
            Ok(call) => call,
            Err(e) => {
                return self.error_response(
                    id,
                    McpError::InvalidParams(format!("Failed to parse tools/call params: {}", e)),
                );
            }
        };

        let result = tools::call_tool(&self.ctx, &call.name, call.arguments).await;
        self.to_response(id, &result)
    }

    fn to_response<T: serde::Serialize>(&self, id: Option<JsonRpcId>, result: &T) -> JsonRpcResponse {
        match serde_json::to_value(result) {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(e) => self.error_response(id, McpError::SerializationError(e)),
        }
    }

    fn error_response(&self, id: Option<JsonRpcId>, error: McpError) -> JsonRpcResponse {
        JsonRpcResponse::failure(id, error.into())
    }
}
