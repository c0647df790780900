//! # Command Line Interface
//!
//! `serve` runs the MCP stdio server; `tools` and `config` print the tool
//! catalog and the effective settings.

pub mod output;

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::config::Settings;
use crate::context::AppContext;
use crate::mcp::{tools, McpStdioServer};
use crate::observability::{init_logging, log_settings_summary};
use crate::{APP_NAME, VERSION};

#[derive(Parser, Debug)]
#[command(name = "apigee-hybrid-mcp")]
#[command(about = "MCP server for Apigee Hybrid management")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// TOML configuration file; APIGEE_MCP_* environment variables override it
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level override (trace, debug, info, warn, error, critical)
    #[arg(long, global = true)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Serve MCP over stdio (default)
    Serve,

    /// Print the tool catalog
    Tools {
        /// Output format (json or toml)
        #[arg(short, long, default_value = "json")]
        output: String,
    },

    /// Print the effective configuration with secrets redacted
    Config {
        /// Output format (json or toml)
        #[arg(short, long, default_value = "toml")]
        output: String,
    },
}

impl Cli {
    /// Settings from the config file and environment, with CLI overrides applied.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::load(self.config.as_deref()).with_context(|| match &self.config {
            Some(path) => format!("Failed to load configuration from {}", path.display()),
            None => "Failed to load configuration from the environment".to_string(),
        })?;
        if let Some(level) = &self.log_level {
            settings.log_level = level.clone();
            validator::Validate::validate(&settings).context("Invalid --log-level")?;
        }
        Ok(settings)
    }
}

/// Run CLI commands
pub async fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings()?;

    match cli.command.clone().unwrap_or(Commands::Serve) {
        Commands::Serve => serve(settings).await,
        Commands::Tools { output } => output::print_output(&tools::all_tools(), &output),
        Commands::Config { output } => output::print_output(&settings, &output),
    }
}

async fn serve(settings: Settings) -> anyhow::Result<()> {
    init_logging(&settings)?;
    info!(app_name = APP_NAME, version = VERSION, "Starting Apigee Hybrid MCP server");
    log_settings_summary(&settings);

    settings.require_organization()?;

    let ctx = Arc::new(AppContext::from_settings(settings));
    ctx.client.connect().context("Failed to open gateway session")?;

    McpStdioServer::new(ctx).run().await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_command_is_serve() {
        let cli = Cli::try_parse_from(["apigee-hybrid-mcp"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from([
            "apigee-hybrid-mcp",
            "config",
            "--config",
            "/etc/apigee-mcp.toml",
            "--log-level",
            "debug",
            "-o",
            "json",
        ])
        .expect("parse");
        assert_eq!(cli.command, Some(Commands::Config { output: "json".into() }));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/apigee-mcp.toml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_log_level_override_is_validated() {
        let cli = Cli {
            command: None,
            config: None,
            log_level: Some("loud".into()),
        };
        assert!(cli.settings().is_err());
    }
}
