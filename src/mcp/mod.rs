//! MCP (Model Context Protocol) Server Implementation
//!
//! Provides the stdio MCP server that fronts the gateway tools and the team store.

pub mod error;
pub mod format;
pub mod handler;
pub mod protocol;
pub mod server;
pub mod tools;

pub use error::McpError;
pub use format::{format_api_response, format_error_response, format_unexpected_error};
pub use handler::McpHandler;
pub use protocol::*;
pub use server::McpStdioServer;
