//! Output formatting for CLI commands

use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Toml,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "toml" => Ok(OutputFormat::Toml),
            _ => anyhow::bail!("Unsupported output format: '{}'. Use 'json' or 'toml'.", s),
        }
    }
}

/// Print data in the named format
pub fn print_output<T: Serialize>(data: &T, format: &str) -> Result<()> {
    println!("{}", render(data, OutputFormat::parse(format)?)?);
    Ok(())
}

pub fn render<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(data).context("Failed to serialize to JSON")
        }
        OutputFormat::Toml => {
            // TOML needs a table at the top level.
            let value = serde_json::to_value(data).context("Failed to serialize")?;
            let value = if value.is_object() { value } else { serde_json::json!({ "items": value }) };
            toml::to_string_pretty(&value).context("Failed to serialize to TOML")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SecretString;
    use crate::config::Settings;

    #[test]
    fn test_parse_format() {
        assert_eq!(OutputFormat::parse("JSON").ok(), Some(OutputFormat::Json));
        assert_eq!(OutputFormat::parse("toml").ok(), Some(OutputFormat::Toml));
        assert!(OutputFormat::parse("yaml").is_err());
    }

    #[test]
    fn test_settings_render_without_secrets() {
        let settings = Settings {
            access_token: Some(SecretString::new("ya29.secret")),
            ..Default::default()
        };
        for format in [OutputFormat::Json, OutputFormat::Toml] {
            let text = render(&settings, format).expect("render");
            assert!(!text.contains("ya29.secret"));
            assert!(text.contains("request_timeout"));
        }
    }

    #[test]
    fn test_toml_wraps_lists() {
        let text = render(&vec!["a", "b"], OutputFormat::Toml).expect("render");
        assert!(text.contains("items"));
    }
}
