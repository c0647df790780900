//! # Apigee Hybrid MCP
//!
//! A Model Context Protocol server that exposes Apigee Hybrid management
//! operations as tools. Every gateway call runs through a single request
//! pipeline:
//!
//! ```text
//! tools/call → argument validation → rate limiter → circuit breaker
//!            → credentials → HTTP transport → error taxonomy → formatter
//! ```
//!
//! Teams are kept in an in-memory store and served by the same tool router.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use apigee_hybrid_mcp::{AppContext, McpStdioServer, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::from_env()?;
//!     let ctx = Arc::new(AppContext::from_settings(settings));
//!     ctx.client.connect()?;
//!     McpStdioServer::new(ctx).run().await
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod errors;
pub mod mcp;
pub mod observability;
pub mod resilience;
pub mod teams;
pub mod validation;

// Re-export commonly used types
pub use client::GatewayClient;
pub use config::Settings;
pub use context::AppContext;
pub use errors::{AppError, Result};
pub use mcp::McpStdioServer;

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
